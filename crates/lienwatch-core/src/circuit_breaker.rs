use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Runtime circuit status for one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitStatus {
    Closed,
    Open,
    HalfOpen,
}

/// Circuit breaker thresholds and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout: Duration::from_secs(30),
        }
    }
}

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitState {
    pub status: CircuitStatus,
    pub consecutive_failures: u32,
    pub opened_at: Option<Instant>,
}

#[derive(Debug)]
struct CircuitInner {
    status: CircuitStatus,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

impl Default for CircuitInner {
    fn default() -> Self {
        Self {
            status: CircuitStatus::Closed,
            consecutive_failures: 0,
            opened_at: None,
            trial_in_flight: false,
        }
    }
}

/// Thread-safe circuit breaker guarding one source.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<CircuitInner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(CircuitInner::default()),
        }
    }

    /// Whether a call may proceed. Once the cooldown has elapsed the breaker
    /// moves to half-open and admits exactly one trial call; other callers are
    /// rejected until that trial reports back.
    pub fn allow_request(&self) -> bool {
        let mut inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        match inner.status {
            CircuitStatus::Closed => true,
            CircuitStatus::HalfOpen => {
                if inner.trial_in_flight {
                    false
                } else {
                    inner.trial_in_flight = true;
                    true
                }
            }
            CircuitStatus::Open => {
                let can_try = inner
                    .opened_at
                    .map(|opened_at| opened_at.elapsed() >= self.config.open_timeout)
                    .unwrap_or(false);

                if can_try {
                    inner.status = CircuitStatus::HalfOpen;
                    inner.trial_in_flight = true;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        *inner = CircuitInner::default();
    }

    pub fn record_failure(&self) {
        let mut inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.trial_in_flight = false;

        if inner.status == CircuitStatus::HalfOpen
            || inner.consecutive_failures >= self.config.failure_threshold
        {
            inner.status = CircuitStatus::Open;
            inner.opened_at = Some(Instant::now());
        }
    }

    pub fn state(&self) -> CircuitState {
        let inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        CircuitState {
            status: inner.status,
            consecutive_failures: inner.consecutive_failures,
            opened_at: inner.opened_at,
        }
    }

    pub fn status(&self) -> CircuitStatus {
        self.state().status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, cooldown: Duration) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: threshold,
            open_timeout: cooldown,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn opens_after_threshold_failures() {
        let breaker = breaker(2, Duration::from_secs(30));

        assert_eq!(breaker.status(), CircuitStatus::Closed);
        breaker.record_failure();
        assert_eq!(breaker.status(), CircuitStatus::Closed);
        breaker.record_failure();
        assert_eq!(breaker.status(), CircuitStatus::Open);
        assert!(!breaker.allow_request());
        assert!(breaker.state().opened_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn success_in_closed_resets_counter() {
        let breaker = breaker(3, Duration::from_secs(30));
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();

        assert_eq!(breaker.state().consecutive_failures, 1);
        assert_eq!(breaker.status(), CircuitStatus::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_admits_single_trial_then_closes_on_success() {
        let breaker = breaker(1, Duration::from_secs(30));
        breaker.record_failure();

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(!breaker.allow_request());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(breaker.allow_request());
        assert_eq!(breaker.status(), CircuitStatus::HalfOpen);
        assert!(!breaker.allow_request());

        breaker.record_success();
        assert_eq!(breaker.status(), CircuitStatus::Closed);
        assert_eq!(breaker.state().consecutive_failures, 0);
        assert!(breaker.allow_request());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_trial_reopens_with_fresh_timestamp() {
        let breaker = breaker(1, Duration::from_secs(30));
        breaker.record_failure();
        let first_opened = breaker.state().opened_at;

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(breaker.allow_request());
        breaker.record_failure();

        let state = breaker.state();
        assert_eq!(state.status, CircuitStatus::Open);
        assert!(state.opened_at > first_opened);
        assert!(!breaker.allow_request());
    }
}
