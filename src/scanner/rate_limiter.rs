//! Request pacing for provider calls
//!
//! Grants are spaced at least `60 / requests_per_minute` seconds apart.
//! The last-grant timestamp sits behind an async mutex that is held across
//! the wait, so concurrent callers queue up and are granted one at a time.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;

/// Minimum-spacing rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    spacing: Duration,
    last_grant: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_minute` grants per minute
    pub fn new(requests_per_minute: u32) -> Self {
        let rpm = requests_per_minute.max(1);
        Self::with_spacing(Duration::from_secs_f64(60.0 / rpm as f64))
    }

    /// Create a limiter with an explicit minimum spacing between grants
    pub fn with_spacing(spacing: Duration) -> Self {
        Self {
            spacing,
            last_grant: Mutex::new(None),
        }
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Wait until the spacing since the previous grant has elapsed, then grant.
    ///
    /// The first call is granted immediately. Dropping the future while it
    /// waits gives up its place without recording a grant.
    pub async fn acquire(&self) {
        let mut last = self.last_grant.lock().await;

        if let Some(prev) = *last {
            let ready_at = prev + self.spacing;
            if ready_at > Instant::now() {
                debug!("Rate limiter waiting {:?}", ready_at - Instant::now());
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_MINUTE)
    }
}
