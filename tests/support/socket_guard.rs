//! Skips wiremock tests in sandboxes that forbid binding localhost sockets.

use std::net::TcpListener;
use std::panic::Location;

use wiremock::MockServer;

const STRICT_ENV: &str = "REVIEW_TRENDS_REQUIRE_SOCKET_TESTS";

fn strict_mode() -> bool {
    std::env::var(STRICT_ENV).is_ok_and(|value| {
        ["1", "true", "yes"].contains(&value.trim().to_ascii_lowercase().as_str())
    })
}

/// True when localhost is unbindable; panics instead in strict mode.
#[track_caller]
#[must_use]
pub fn localhost_unavailable() -> bool {
    if TcpListener::bind(("127.0.0.1", 0)).is_ok() {
        return false;
    }

    let caller = Location::caller();
    let message = format!(
        "[mock-server] {}:{} needs a localhost socket and none can be bound",
        caller.file(),
        caller.line()
    );
    assert!(!strict_mode(), "{message} ({STRICT_ENV} is set)");
    eprintln!("{message}; skipping. Set {STRICT_ENV}=1 to fail instead.");
    true
}

/// Starts a mock service, or `None` when the test should be skipped.
pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if localhost_unavailable() {
        return None;
    }
    Some(MockServer::start().await)
}
