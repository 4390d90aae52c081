use std::time::Duration;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::retry::RetryPolicy;
use crate::throttling::DEFAULT_RATE_WINDOW;
use crate::{ConfigError, Jurisdiction};

/// Resilience settings applied to every source an orchestrator drives.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionPolicy {
    pub retry: RetryPolicy,
    pub breaker: CircuitBreakerConfig,
    /// Upper bound on a single adapter attempt.
    pub request_timeout: Duration,
    /// Length of the rolling window the per-source ceiling applies to.
    pub rate_window: Duration,
    /// Jurisdictions queried when a run does not name its own.
    pub default_jurisdictions: Vec<Jurisdiction>,
}

impl Default for IngestionPolicy {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            breaker: CircuitBreakerConfig::default(),
            request_timeout: Duration::from_secs(30),
            rate_window: DEFAULT_RATE_WINDOW,
            default_jurisdictions: Vec::new(),
        }
    }
}

impl IngestionPolicy {
    pub fn with_jurisdictions(mut self, jurisdictions: Vec<Jurisdiction>) -> Self {
        self.default_jurisdictions = jurisdictions;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ZeroRetryAttempts);
        }
        if self.breaker.failure_threshold == 0 {
            return Err(ConfigError::ZeroFailureThreshold);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroInterval {
                field: "request_timeout",
            });
        }
        if self.rate_window.is_zero() {
            return Err(ConfigError::ZeroInterval {
                field: "rate_window",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let policy = IngestionPolicy::default();

        assert_eq!(policy.retry.max_attempts, 3);
        assert_eq!(policy.breaker.failure_threshold, 5);
        assert_eq!(policy.breaker.open_timeout, Duration::from_secs(30));
        assert_eq!(policy.rate_window, Duration::from_secs(60));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn rejects_zero_threshold_and_timeout() {
        let mut policy = IngestionPolicy::default();
        policy.breaker.failure_threshold = 0;
        assert_eq!(policy.validate(), Err(ConfigError::ZeroFailureThreshold));

        let policy = IngestionPolicy::default().with_request_timeout(Duration::ZERO);
        assert_eq!(
            policy.validate(),
            Err(ConfigError::ZeroInterval {
                field: "request_timeout"
            })
        );
    }
}
