//! Review Trends Core Library
//!
//! Turns raw product reviews into a rolling per-day topic trend table:
//! each review gets a short topic label from a text-generation service,
//! labels are deduplicated against a growing topic ontology by embedding
//! similarity, and labeled reviews are pivoted into a topic × date matrix.
//!
//! # Architecture
//!
//! - [`review`] - Review records and ingestion from JSON / JSON Lines
//! - [`label`] - Topic label generation with keyword fallback
//! - [`embed`] - Embedding backends and cosine similarity
//! - [`ontology`] - The persisted, append-only topic ontology
//! - [`dedup`] - Candidate → canonical topic resolution
//! - [`rate_limiter`] - Burst pacing for external services
//! - [`labeler`] - Per-review orchestration
//! - [`trend`] - Windowed trend aggregation and CSV output

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod dedup;
pub mod embed;
pub mod http_client;
pub mod label;
pub mod labeler;
pub mod ontology;
pub mod rate_limiter;
pub mod review;
pub mod trend;

// Re-export commonly used types
pub use dedup::{DEFAULT_SIMILARITY_THRESHOLD, Deduplicator, Resolution};
pub use embed::{EmbedError, Embedder, LexicalEmbedder, OllamaEmbedder, cosine_similarity};
pub use label::{GeminiClient, KeywordClassifier, LabelError, LabelGenerator, TopicLabeler};
pub use labeler::{
    LabeledReview, LabelingReport, NoProgress, ProgressSink, ReviewLabeler, UNKNOWN_ISSUE,
};
pub use ontology::{OntologyError, OntologyStore, SEED_TOPICS, TopicOntology};
pub use rate_limiter::RateLimiter;
pub use review::{IngestError, Review, parse_review_date, parse_reviews_json};
pub use trend::{DEFAULT_WINDOW_DAYS, TrendError, TrendTable, aggregate};
