// Minimum-interval rate limiter for generative API calls.
//
// Gemini's free tier throttles aggressively, so every request waits for
// its slot: at most `requests_per_second` requests are let through.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

// Roughly 30 years; stands in for intervals past what `Instant` can hold
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Shared limiter; clones hand out slots from the same schedule.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
}

struct RateLimiterInner {
    interval: Duration,
    /// Earliest instant the next request may start
    next_slot: Option<Instant>,
}

impl RateLimiter {
    /// A non-positive rate disables limiting. A rate too small to express
    /// as an interval waits `Duration::MAX`.
    pub fn new(requests_per_second: f64) -> Self {
        let interval = if requests_per_second > 0.0 {
            Duration::try_from_secs_f64(1.0 / requests_per_second).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };
        Self {
            inner: Arc::new(Mutex::new(RateLimiterInner {
                interval,
                next_slot: None,
            })),
        }
    }

    /// Wait for this caller's slot.
    ///
    /// The slot is reserved under the lock and the sleep happens after it is
    /// released, so concurrent callers queue up one interval apart.
    pub async fn acquire(&self) {
        let wait_until = {
            let mut inner = self.inner.lock().await;
            let now = Instant::now();
            let slot = match inner.next_slot {
                Some(next) if next > now => next,
                _ => now,
            };
            inner.next_slot = Some(slot.checked_add(inner.interval).unwrap_or(slot + FAR_FUTURE));
            slot
        };
        tokio::time::sleep_until(wait_until).await;
    }
}
