//! Process-wide spacing limiter for outbound geocoding calls
//!
//! Unlike a token bucket, this limiter never allows bursts: two consecutive
//! permits are always at least `spacing` apart, no matter how many tasks ask
//! at once. Waiters queue on a fair `tokio::sync::Mutex`, so permits are
//! handed out in arrival order.
//!
//! Time is read from `tokio::time`, which lets tests drive it with a paused
//! clock.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

use crate::utils::constants::DEFAULT_GEOCODE_SPACING;

/// Minimum-interval limiter shared by every caller in the process
#[derive(Debug)]
pub struct RateLimiter {
    spacing: Duration,
    /// Instant the last permit was granted
    last_grant: Mutex<Option<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_GEOCODE_SPACING)
    }
}

impl RateLimiter {
    #[must_use]
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            last_grant: Mutex::new(None),
        }
    }

    #[inline]
    #[must_use]
    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Wait until a permit is available, then take it.
    ///
    /// The lock is held across the sleep, which is what serializes
    /// concurrent callers behind each other.
    pub async fn acquire(&self) {
        let mut last = self.last_grant.lock().await;

        if let Some(prev) = *last {
            let ready_at = prev + self.spacing;
            if Instant::now() < ready_at {
                trace!(
                    target: "job_harvest::rate_limiter",
                    "Delaying geocode call by {:?}",
                    ready_at - Instant::now()
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn first_permit_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_millis(1100));
        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_permits_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(1100));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(2200));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_serialized() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(1100)));
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut grants = Vec::new();
        for handle in handles {
            grants.push(handle.await.expect("task panicked"));
        }
        grants.sort();

        for pair in grants.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(1100));
        }
        assert!(start.elapsed() >= Duration::from_millis(3300));
    }

    #[tokio::test(start_paused = true)]
    async fn permit_after_idle_period_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        limiter.acquire().await;

        tokio::time::advance(Duration::from_millis(1500)).await;
        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
