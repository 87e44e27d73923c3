//! Shared HTTP client construction policy for external services.
//!
//! Text-generation and embedding clients both go through
//! [`build_service_client`] so timeouts, user-agent and compression stay
//! consistent across services.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use tracing::debug;

/// Connect timeout for every external service.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default whole-request timeout for external services.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Returns the user-agent sent to every external service.
#[must_use]
pub fn standard_user_agent() -> String {
    format!("review-trends/{}", env!("CARGO_PKG_VERSION"))
}

/// Builds an HTTP client for the named service.
///
/// `service` is only used for logging, not in the User-Agent header.
///
/// # Errors
///
/// Returns the underlying [`reqwest::Error`] when client construction fails.
pub fn build_service_client(service: &str, request_timeout: Duration) -> Result<Client, reqwest::Error> {
    debug!(
        service,
        timeout_ms = request_timeout.as_millis(),
        "building service HTTP client"
    );
    base_builder(request_timeout).build()
}

fn base_builder(request_timeout: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(request_timeout)
        .user_agent(standard_user_agent())
        .gzip(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_user_agent_names_crate_and_version() {
        let ua = standard_user_agent();
        assert!(ua.starts_with("review-trends/"), "unexpected UA: {ua}");
        assert!(ua.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_build_service_client_succeeds() {
        let client = build_service_client("test", Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));
        assert!(client.is_ok());
    }
}
