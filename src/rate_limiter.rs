//! Burst pacing for calls to external services.
//!
//! [`RateLimiter`] lets `burst` calls through back to back, then makes the
//! next call wait until `pause` has elapsed since the previous one. State is
//! kept per key (one key per service), so pacing the text-generation service
//! never slows the embedding service.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use review_trends::RateLimiter;
//!
//! # async fn example() {
//! let limiter = RateLimiter::new(5, Duration::from_millis(500));
//!
//! for _ in 0..10 {
//!     // The sixth call waits 500ms; the rest proceed immediately.
//!     limiter.acquire("gemini").await;
//! }
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Calls allowed between pauses.
pub const DEFAULT_BURST: u32 = 5;

/// Pause applied after each burst.
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(500);

/// Warning threshold for cumulative delay per key.
const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(30);

/// Per-key burst limiter.
///
/// `Send + Sync`; wrap in `Arc` to share between components.
#[derive(Debug)]
pub struct RateLimiter {
    burst: u32,
    pause: Duration,
    disabled: bool,

    /// Arc so the `DashMap` shard lock is released before awaiting on the
    /// inner Mutex.
    keys: DashMap<String, Arc<KeyState>>,
}

#[derive(Debug)]
struct KeyState {
    window: Mutex<Window>,
    cumulative_delay_ms: AtomicU64,
}

#[derive(Debug, Default)]
struct Window {
    /// Calls granted so far on this key.
    granted: u64,
    last_call: Option<Instant>,
}

impl KeyState {
    fn new() -> Self {
        Self {
            window: Mutex::new(Window::default()),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_cumulative_delay(&self, delay: Duration) -> Duration {
        let delay_ms = delay.as_millis() as u64;
        let new_total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        Duration::from_millis(new_total)
    }
}

impl RateLimiter {
    /// Creates a limiter allowing `burst` calls (minimum 1) between pauses.
    #[must_use]
    #[instrument(skip_all, fields(burst, pause_ms = pause.as_millis()))]
    pub fn new(burst: u32, pause: Duration) -> Self {
        let burst = burst.max(1);
        tracing::Span::current().record("burst", burst);
        debug!("creating rate limiter");
        Self {
            burst,
            pause,
            disabled: pause.is_zero(),
            keys: DashMap::new(),
        }
    }

    /// Creates a limiter that never waits.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            burst: u32::MAX,
            pause: Duration::ZERO,
            disabled: true,
            keys: DashMap::new(),
        }
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    #[must_use]
    pub fn burst(&self) -> u32 {
        self.burst
    }

    #[must_use]
    pub fn pause(&self) -> Duration {
        self.pause
    }

    /// Waits until a call on `key` is allowed.
    ///
    /// Calls `1..=burst` are immediate; call `burst + 1` waits until `pause`
    /// has passed since call `burst`, and so on for every burst.
    #[instrument(skip(self))]
    pub async fn acquire(&self, key: &str) {
        if self.disabled {
            return;
        }

        let state = self
            .keys
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(KeyState::new()))
            .clone();

        let mut window = state.window.lock().await;

        let at_boundary = window.granted > 0 && window.granted % u64::from(self.burst) == 0;
        if let (true, Some(last_call)) = (at_boundary, window.last_call) {
            let delay = self.pause.saturating_sub(last_call.elapsed());
            if !delay.is_zero() {
                let cumulative = state.add_cumulative_delay(delay);
                debug!(
                    granted = window.granted,
                    delay_ms = delay.as_millis(),
                    cumulative_ms = cumulative.as_millis(),
                    "pausing after burst"
                );

                if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
                    warn!(
                        key,
                        cumulative_delay_secs = cumulative.as_secs(),
                        "excessive rate limiting - consider a larger burst or shorter pause"
                    );
                }

                tokio::time::sleep(delay).await;
            }
        }

        window.granted += 1;
        window.last_call = Some(Instant::now());
    }

    /// Total delay applied so far on `key`.
    #[must_use]
    pub fn cumulative_delay(&self, key: &str) -> Duration {
        self.keys.get(key).map_or(Duration::ZERO, |state| {
            Duration::from_millis(state.cumulative_delay_ms.load(Ordering::SeqCst))
        })
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_BURST, DEFAULT_PAUSE)
    }
}
