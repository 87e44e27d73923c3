//! Error types for topic label generation.
//!
//! None of these escape [`super::TopicLabeler`]: every variant is recovered
//! by the keyword fallback. They exist so failures can be logged with
//! context.

use std::time::Duration;

use thiserror::Error;

/// Errors from a text-generation service.
#[derive(Debug, Error)]
pub enum LabelError {
    /// Transport-level failure (DNS, connection refused, TLS, client timeout).
    #[error("network error calling {service}: {source}")]
    Network {
        service: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status (quota, auth, outage).
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: String,
        status: u16,
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("malformed response from {service}: {reason}")]
    MalformedResponse { service: String, reason: String },

    /// The service answered, but with no usable label text.
    #[error("{service} returned an empty label")]
    EmptyResponse { service: String },

    /// The caller-enforced per-call deadline elapsed.
    #[error("{service} did not answer within {timeout:?}")]
    Timeout { service: String, timeout: Duration },

    /// The configured service base URL cannot form a request URL.
    #[error("invalid endpoint for {service}: {reason}")]
    InvalidEndpoint { service: String, reason: String },

    /// The HTTP client could not be constructed.
    #[error("cannot build HTTP client for {service}: {source}")]
    ClientBuild {
        service: String,
        #[source]
        source: reqwest::Error,
    },
}

impl LabelError {
    /// Creates a network error from a reqwest error.
    pub fn network(service: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            service: service.into(),
            source,
        }
    }

    /// Creates a status error, keeping at most 200 chars of the body.
    pub fn status(service: impl Into<String>, status: u16, body: &str) -> Self {
        Self::Status {
            service: service.into(),
            status,
            body: body.chars().take(200).collect(),
        }
    }

    /// Creates a malformed-response error.
    pub fn malformed(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Creates an empty-response error.
    pub fn empty(service: impl Into<String>) -> Self {
        Self::EmptyResponse {
            service: service.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(service: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            service: service.into(),
            timeout,
        }
    }
}
