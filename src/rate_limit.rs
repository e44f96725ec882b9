//! Minimum spacing between outbound provider calls.
//!
//! One slot for the whole dispatcher: there is no per-key or per-caller
//! limiting, only the start time of the most recent call.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Default spacing between outbound calls.
pub const DEFAULT_MIN_SPACING: Duration = Duration::from_secs(1);

/// Single-slot rate limiter.
///
/// A call that arrives early waits out the remaining delay; it is never
/// dropped.
#[derive(Debug)]
pub struct RateLimiter {
    min_spacing: Duration,
    last_dispatch_at: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last_dispatch_at: None,
        }
    }

    /// Start time of the most recent dispatch, if any.
    pub fn last_dispatch_at(&self) -> Option<Instant> {
        self.last_dispatch_at
    }

    /// Suspend until `min_spacing` has elapsed since the last dispatch, then
    /// record now as the new dispatch time.
    ///
    /// Returns how long the caller waited.
    pub async fn await_slot(&mut self) -> Duration {
        let mut waited = Duration::ZERO;
        if let Some(last) = self.last_dispatch_at {
            let elapsed = last.elapsed();
            if elapsed < self.min_spacing {
                waited = self.min_spacing - elapsed;
                debug!(wait_ms = waited.as_millis() as u64, "Rate limiter delaying call");
                tokio::time::sleep(waited).await;
            }
        }
        self.last_dispatch_at = Some(Instant::now());
        waited
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SPACING)
    }
}
