//! Topic label generation for review text.
//!
//! # Architecture
//!
//! - [`LabelGenerator`] - Async trait for text-generation services
//! - [`GeminiClient`] - Gemini `generateContent` implementation
//! - [`KeywordClassifier`] - Deterministic fixed-rule fallback
//! - [`TopicLabeler`] - Composes a primary generator, a per-call timeout and
//!   the fallback into an infallible `generate`
//!
//! The generation service is treated as unreliable: any error or timeout is
//! logged and answered by the keyword classifier, so labeling never blocks
//! on service availability.

mod error;
mod fallback;
mod gemini;
mod prompt;

pub use error::LabelError;
pub use fallback::{GENERAL_COMPLAINT, KeywordClassifier};
pub use gemini::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, GeminiClient};
pub use prompt::{clean_label, topic_prompt};

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

/// Default per-call deadline for the generation service.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(20);

/// Trait for external text-generation services that produce topic labels.
///
/// # Object Safety
///
/// This trait uses `async_trait` so generators can be injected as
/// `Box<dyn LabelGenerator>` (tests supply deterministic stubs).
#[async_trait]
pub trait LabelGenerator: Send + Sync {
    /// Returns the service name used in logs (e.g., "gemini").
    fn name(&self) -> &str;

    /// Produces a short topic label for the review text.
    async fn generate(&self, review_text: &str) -> Result<String, LabelError>;
}

/// Where a generated label came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSource {
    /// The external generation service.
    Service,
    /// The keyword classifier.
    Fallback,
}

/// A candidate topic label plus its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedLabel {
    pub label: String,
    pub source: LabelSource,
}

/// Infallible label generation: service first, keyword rules on any failure.
pub struct TopicLabeler {
    primary: Option<Box<dyn LabelGenerator>>,
    fallback: KeywordClassifier,
    timeout: Duration,
}

impl TopicLabeler {
    /// Creates a labeler backed by a generation service.
    #[must_use]
    pub fn new(primary: Box<dyn LabelGenerator>) -> Self {
        Self {
            primary: Some(primary),
            fallback: KeywordClassifier::new(),
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    /// Creates a labeler that only uses the keyword classifier.
    #[must_use]
    pub fn fallback_only() -> Self {
        Self {
            primary: None,
            fallback: KeywordClassifier::new(),
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    /// Overrides the per-call deadline for the generation service.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the per-call deadline.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns true when a generation service is configured.
    #[must_use]
    pub fn has_service(&self) -> bool {
        self.primary.is_some()
    }

    /// Name of the configured generation service, if any.
    #[must_use]
    pub fn service_name(&self) -> Option<&str> {
        self.primary.as_deref().map(LabelGenerator::name)
    }

    /// Generates a topic label; never fails.
    #[instrument(skip_all, fields(chars = review_text.len()))]
    pub async fn generate(&self, review_text: &str) -> GeneratedLabel {
        let Some(primary) = &self.primary else {
            return self.fallback_label(review_text);
        };

        let outcome = match tokio::time::timeout(self.timeout, primary.generate(review_text)).await
        {
            Ok(result) => result,
            Err(_) => Err(LabelError::timeout(primary.name(), self.timeout)),
        };

        match outcome {
            Ok(label) if !label.trim().is_empty() => GeneratedLabel {
                label: label.trim().to_string(),
                source: LabelSource::Service,
            },
            Ok(_) => {
                warn!(service = primary.name(), "empty label from service; using keyword fallback");
                self.fallback_label(review_text)
            }
            Err(error) => {
                warn!(
                    service = primary.name(),
                    error = %error,
                    "label generation failed; using keyword fallback"
                );
                self.fallback_label(review_text)
            }
        }
    }

    fn fallback_label(&self, review_text: &str) -> GeneratedLabel {
        let label = self.fallback.classify(review_text);
        debug!(label, "keyword fallback label");
        GeneratedLabel {
            label: label.to_string(),
            source: LabelSource::Fallback,
        }
    }
}

impl std::fmt::Debug for TopicLabeler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicLabeler")
            .field("primary", &self.primary.as_ref().map(|p| p.name().to_string()))
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
