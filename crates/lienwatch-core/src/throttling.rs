use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::ConfigError;

pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60);

/// Rolling-window request limiter owned by one source.
///
/// Accepted request timestamps are kept for one window; a request is accepted
/// only while fewer than `limit` timestamps remain in the window. The check and
/// the record happen under one lock, so concurrent callers sharing a limiter
/// never overshoot the ceiling.
#[derive(Debug)]
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    accepted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn per_minute(requests_per_minute: u32) -> Result<Self, ConfigError> {
        Self::new(requests_per_minute, DEFAULT_RATE_WINDOW)
    }

    pub fn new(limit: u32, window: Duration) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::ZeroRateLimit {
                name: String::from("rate limiter"),
            });
        }
        if window.is_zero() {
            return Err(ConfigError::ZeroInterval {
                field: "rate_window",
            });
        }
        Ok(Self {
            limit: limit as usize,
            window,
            accepted: Mutex::new(VecDeque::with_capacity(limit as usize)),
        })
    }

    /// Try to take one slot. Returns zero when accepted, otherwise how long
    /// until the oldest accepted request leaves the window.
    pub fn allow(&self) -> Duration {
        let now = Instant::now();
        let mut accepted = self
            .accepted
            .lock()
            .expect("rate window lock is not poisoned");

        while accepted
            .front()
            .is_some_and(|oldest| now.duration_since(*oldest) >= self.window)
        {
            accepted.pop_front();
        }

        if accepted.len() < self.limit {
            accepted.push_back(now);
            return Duration::ZERO;
        }

        accepted
            .front()
            .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
            .unwrap_or(Duration::ZERO)
    }

    /// Suspend until a slot is available, then take it.
    pub async fn acquire(&self) {
        loop {
            let wait = self.allow();
            if wait.is_zero() {
                return;
            }
            tracing::debug!(wait_ms = wait.as_millis() as u64, "rate window full, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Number of accepted requests still inside the window.
    pub fn in_window(&self) -> usize {
        let now = Instant::now();
        self.accepted
            .lock()
            .expect("rate window lock is not poisoned")
            .iter()
            .filter(|at| now.duration_since(**at) < self.window)
            .count()
    }

    pub const fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ceiling_is_rejected() {
        assert!(matches!(
            RateLimiter::per_minute(0),
            Err(ConfigError::ZeroRateLimit { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn delays_once_ceiling_is_reached() {
        let limiter = RateLimiter::per_minute(2).expect("valid");

        assert_eq!(limiter.allow(), Duration::ZERO);
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(limiter.allow(), Duration::ZERO);

        assert_eq!(limiter.allow(), Duration::from_secs(50));
        assert_eq!(limiter.in_window(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slot_frees_when_oldest_leaves_window() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60)).expect("valid");
        assert_eq!(limiter.allow(), Duration::ZERO);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(limiter.allow(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_waits_for_window() {
        let limiter = RateLimiter::per_minute(1).expect("valid");
        let started = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;

        assert_eq!(started.elapsed(), Duration::from_secs(60));
    }
}
