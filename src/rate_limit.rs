//! Request pacing shared by every call made through one client.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Non-bursting limiter: at most one permit per `1 / rate` seconds.
///
/// Idle time is never banked. After a long pause the next [`take`](Self::take)
/// returns at once, but the one after it still waits a full interval.
///
/// Waiters are served in arrival order because the tokio mutex is fair and is
/// held across the wait.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_permit: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_second` permits per second
    pub fn new(requests_per_second: u32) -> Self {
        let rate = requests_per_second.max(1);
        Self {
            interval: Duration::from_secs(1) / rate,
            last_permit: Mutex::new(None),
        }
    }

    /// Minimum spacing between two permits
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until a request may be sent.
    ///
    /// Dropping the returned future before it completes leaves the limiter
    /// untouched.
    pub async fn take(&self) {
        let mut last = self.last_permit.lock().await;

        if let Some(previous) = *last {
            let ready_at = previous + self.interval;
            if Instant::now() < ready_at {
                debug!(wait_ms = (ready_at - Instant::now()).as_millis() as u64, "rate limited");
                sleep_until(ready_at).await;
            }
        }

        *last = Some(Instant::now());
    }
}
