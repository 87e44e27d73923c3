//! Text embedding capability used for semantic label matching.
//!
//! # Architecture
//!
//! - [`Embedder`] - Async trait: batch of strings in, one vector per string out
//! - [`OllamaEmbedder`] - HTTP embedding service (`/api/embed`)
//! - [`LexicalEmbedder`] - Offline hashed word/trigram vectors
//! - `FastEmbedder` - Local all-MiniLM-L6-v2 model (`local-embeddings` feature)
//!
//! The embedding service is assumed reliable; it is not wrapped in fallback
//! logic. Errors surface as [`EmbedError`] and are isolated per review by the
//! labeler.

mod error;
#[cfg(feature = "local-embeddings")]
mod local_model;
mod lexical;
mod ollama;

pub use error::EmbedError;
#[cfg(feature = "local-embeddings")]
pub use local_model::{FastEmbedder, LOCAL_MODEL, LOCAL_MODEL_DIMENSIONS};
pub use lexical::{DEFAULT_LEXICAL_DIMENSIONS, LexicalEmbedder};
pub use ollama::{DEFAULT_OLLAMA_ENDPOINT, DEFAULT_OLLAMA_MODEL, OllamaEmbedder};

use async_trait::async_trait;

/// Trait for services that turn text into dense vectors.
///
/// # Object Safety
///
/// This trait uses `async_trait` so embedders can be injected as
/// `Box<dyn Embedder>`.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the embedder name used in logs.
    fn name(&self) -> &str;

    /// Embeds every input; the output has exactly one vector per input, in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;
}

/// Cosine similarity of two vectors; 0.0 when either is (near) zero.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a < 1e-8 || norm_b < 1e-8 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Checks the one-vector-per-input contract.
pub(crate) fn ensure_count(
    embedder: &str,
    expected: usize,
    vectors: Vec<Vec<f32>>,
) -> Result<Vec<Vec<f32>>, EmbedError> {
    if vectors.len() == expected {
        Ok(vectors)
    } else {
        Err(EmbedError::CountMismatch {
            embedder: embedder.to_string(),
            expected,
            actual: vectors.len(),
        })
    }
}
