//! Error types for embedding operations.

use thiserror::Error;

/// Errors that can occur while embedding text.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// Transport-level failure talking to the embedding service.
    #[error("network error calling {embedder}: {source}")]
    Network {
        embedder: String,
        #[source]
        source: reqwest::Error,
    },

    /// The embedding service answered with a non-success status.
    #[error("{embedder} returned HTTP {status}")]
    Status { embedder: String, status: u16 },

    /// The response body did not have a recognized shape.
    #[error("malformed response from {embedder}: {reason}")]
    MalformedResponse { embedder: String, reason: String },

    /// The embedder returned a different number of vectors than inputs.
    #[error("{embedder} returned {actual} vectors for {expected} inputs")]
    CountMismatch {
        embedder: String,
        expected: usize,
        actual: usize,
    },

    /// Endpoint, client or model initialization failed.
    #[error("{embedder} unavailable: {reason}")]
    Unavailable { embedder: String, reason: String },
}

impl EmbedError {
    /// Creates a network error from a reqwest error.
    pub fn network(embedder: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            embedder: embedder.into(),
            source,
        }
    }

    /// Creates a malformed-response error.
    pub fn malformed(embedder: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            embedder: embedder.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(embedder: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            embedder: embedder.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_error_count_mismatch_display() {
        let err = EmbedError::CountMismatch {
            embedder: "ollama".to_string(),
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.to_string(), "ollama returned 2 vectors for 3 inputs");
    }

    #[test]
    fn test_embed_error_status_display() {
        let err = EmbedError::Status {
            embedder: "ollama".to_string(),
            status: 503,
        };
        assert!(err.to_string().contains("503"));
    }
}
