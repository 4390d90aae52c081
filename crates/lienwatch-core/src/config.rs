//! # Application Configuration
//!
//! YAML configuration file for lienwatch. Durations are written as whole
//! seconds (`*_secs`) or milliseconds (`*_ms`).
//!
//! ```yaml
//! jurisdictions: [CA, NY, TX]
//! request_timeout_ms: 30000
//! retry:
//!   max_attempts: 3
//!   base_delay_ms: 1000
//! circuit_breaker:
//!   failure_threshold: 5
//!   open_timeout_secs: 30
//! schedule:
//!   ingestion_interval_secs: 21600
//!   auto_start: true
//! sources:
//!   - name: ca-api
//!     kind: api
//!     requests_per_minute: 60
//!     connection:
//!       base_url: https://filings.example.com/v1
//!       api_key: env:CA_FILINGS_KEY
//! ```
//!
//! Connection values of the form `env:NAME` are replaced by the value of the
//! environment variable `NAME` when the file is loaded.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::policy::IngestionPolicy;
use crate::retry::RetryPolicy;
use crate::scheduler::ScheduleConfig;
use crate::{ConfigError, CoreError, Jurisdiction, SourceConfig};

/// Environment variable consulted when no `--config` path is given.
pub const CONFIG_ENV_VAR: &str = "LIENWATCH_CONFIG";
/// File name used when neither `--config` nor the environment names one.
pub const DEFAULT_CONFIG_FILE: &str = "lienwatch.yaml";

const ENV_PREFIX: &str = "env:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    /// `None` leaves the exponential delay uncapped.
    pub max_delay_ms: Option<u64>,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: Some(60_000),
            jitter: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub open_timeout_secs: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    pub ingestion_interval_secs: u64,
    pub enrichment_interval_secs: u64,
    pub refresh_interval_secs: u64,
    pub enrichment_batch_size: usize,
    pub refresh_batch_size: usize,
    pub stale_data_threshold_days: u32,
    pub auto_start: bool,
    pub enabled: bool,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        let defaults = ScheduleConfig::default();
        Self {
            ingestion_interval_secs: defaults.ingestion_interval.as_secs(),
            enrichment_interval_secs: defaults.enrichment_interval.as_secs(),
            refresh_interval_secs: defaults.refresh_interval.as_secs(),
            enrichment_batch_size: defaults.enrichment_batch_size,
            refresh_batch_size: defaults.refresh_batch_size,
            stale_data_threshold_days: defaults.stale_data_threshold_days,
            auto_start: defaults.auto_start,
            enabled: defaults.enabled,
        }
    }
}

/// Contents of a lienwatch configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default jurisdictions queried by scheduled and manual runs.
    pub jurisdictions: Vec<Jurisdiction>,
    pub sources: Vec<SourceConfig>,
    pub retry: RetrySettings,
    pub circuit_breaker: BreakerSettings,
    pub request_timeout_ms: u64,
    pub rate_window_secs: u64,
    pub schedule: ScheduleSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        let policy = IngestionPolicy::default();
        Self {
            jurisdictions: Vec::new(),
            sources: Vec::new(),
            retry: RetrySettings::default(),
            circuit_breaker: BreakerSettings::default(),
            request_timeout_ms: duration_millis(policy.request_timeout),
            rate_window_secs: policy.rate_window.as_secs(),
            schedule: ScheduleSettings::default(),
        }
    }
}

impl AppConfig {
    /// Resolve the configuration path: explicit argument, then
    /// `LIENWATCH_CONFIG`, then `lienwatch.yaml` in the working directory.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }

        if let Some(path) = env::var_os(CONFIG_ENV_VAR) {
            let path = PathBuf::from(path);
            if !path.as_os_str().is_empty() {
                return path;
            }
        }

        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Read, parse, resolve `env:` references and validate.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let display = path.display().to_string();
        let contents = fs::read_to_string(path).map_err(|source| CoreError::ConfigRead {
            path: display.clone(),
            source,
        })?;
        let mut config = Self::from_yaml_str(&contents).map_err(|source| {
            CoreError::ConfigParse {
                path: display,
                source,
            }
        })?;

        config.resolve_env(|var| env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    /// Replace `env:NAME` connection values using `lookup`.
    pub fn resolve_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for source in &mut self.sources {
            for value in source.connection.values_mut() {
                let Some(var) = value.strip_prefix(ENV_PREFIX) else {
                    continue;
                };
                let var = var.trim().to_owned();
                *value = lookup(&var).ok_or_else(|| ConfigError::UnsetEnvVar {
                    name: source.name.clone(),
                    var,
                })?;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            source.validate()?;
            if !seen.insert(source.name.as_str()) {
                return Err(ConfigError::DuplicateSource {
                    name: source.name.clone(),
                });
            }
        }

        self.policy().validate()?;
        self.schedule_config().validate()
    }

    pub fn policy(&self) -> IngestionPolicy {
        let mut retry = RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: None,
            jitter: self.retry.jitter,
        };
        if let Some(max_delay_ms) = self.retry.max_delay_ms {
            retry = retry.with_max_delay(Duration::from_millis(max_delay_ms));
        }

        IngestionPolicy {
            retry,
            breaker: CircuitBreakerConfig {
                failure_threshold: self.circuit_breaker.failure_threshold,
                open_timeout: Duration::from_secs(self.circuit_breaker.open_timeout_secs),
            },
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            rate_window: Duration::from_secs(self.rate_window_secs),
            default_jurisdictions: self.jurisdictions.clone(),
        }
    }

    pub fn schedule_config(&self) -> ScheduleConfig {
        let schedule = &self.schedule;
        ScheduleConfig {
            ingestion_interval: Duration::from_secs(schedule.ingestion_interval_secs),
            enrichment_interval: Duration::from_secs(schedule.enrichment_interval_secs),
            refresh_interval: Duration::from_secs(schedule.refresh_interval_secs),
            enrichment_batch_size: schedule.enrichment_batch_size,
            refresh_batch_size: schedule.refresh_batch_size,
            stale_data_threshold_days: schedule.stale_data_threshold_days,
            auto_start: schedule.auto_start,
            enabled: schedule.enabled,
        }
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
