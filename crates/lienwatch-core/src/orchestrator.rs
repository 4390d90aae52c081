//! Ingestion orchestrator.
//!
//! Fans one run out over every enabled source and every requested
//! jurisdiction. Each source x jurisdiction pair is its own tokio task and
//! goes through the same pipeline:
//!
//! ```text
//! rate limiter ──▶ circuit breaker ──▶ retry policy ──▶ adapter.fetch (timeout)
//!                        │                                     │
//!                        └── open: CircuitOpen, no call        └── raw records ──▶ Filing::from_raw
//! ```
//!
//! Results come back one per source, in configuration order, after every task
//! of the run has been joined. A failing or panicking unit only affects its
//! own jurisdiction's contribution to its source's result.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::circuit_breaker::{CircuitBreaker, CircuitState, CircuitStatus};
use crate::data_source::{SourceAdapter, SourceError};
use crate::dedupe::dedupe;
use crate::ingestion::{statistics, IngestionMetadata, IngestionResult, IngestionStatistics};
use crate::policy::IngestionPolicy;
use crate::retry::RetryPolicy;
use crate::store::{IngestionRunLog, IngestionRunRecord};
use crate::throttling::RateLimiter;
use crate::{
    ConfigError, Filing, FilingDate, FilingStatus, Jurisdiction, RawFiling, SourceConfig,
    SourceKind, UtcDateTime,
};

struct SourceSlot {
    config: SourceConfig,
    adapter: Arc<dyn SourceAdapter>,
    limiter: RateLimiter,
    breaker: CircuitBreaker,
}

/// Runtime view of one configured source, used by the `sources` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSnapshot {
    pub name: String,
    pub kind: SourceKind,
    pub enabled: bool,
    pub requests_per_minute: u32,
    pub requests_in_window: usize,
    pub circuit: CircuitStatus,
    pub consecutive_failures: u32,
}

/// Composes rate limiting, circuit breaking and retries across all sources.
pub struct IngestionOrchestrator {
    slots: Vec<Arc<SourceSlot>>,
    policy: IngestionPolicy,
    run_log: Option<Arc<dyn IngestionRunLog>>,
}

impl IngestionOrchestrator {
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the source list is empty, a source name is
    /// blank or repeated, a rate ceiling is zero, or the policy is unusable.
    pub fn new(
        sources: Vec<(SourceConfig, Arc<dyn SourceAdapter>)>,
        policy: IngestionPolicy,
    ) -> Result<Self, ConfigError> {
        policy.validate()?;
        if sources.is_empty() {
            return Err(ConfigError::NoSources);
        }

        let mut names = HashSet::with_capacity(sources.len());
        let mut slots = Vec::with_capacity(sources.len());
        for (config, adapter) in sources {
            config.validate()?;
            if !names.insert(config.name.clone()) {
                return Err(ConfigError::DuplicateSource { name: config.name });
            }

            let limiter = RateLimiter::new(config.requests_per_minute, policy.rate_window)
                .map_err(|_| ConfigError::ZeroRateLimit {
                    name: config.name.clone(),
                })?;
            slots.push(Arc::new(SourceSlot {
                config,
                adapter,
                limiter,
                breaker: CircuitBreaker::new(policy.breaker),
            }));
        }

        Ok(Self {
            slots,
            policy,
            run_log: None,
        })
    }

    pub fn with_run_log(mut self, run_log: Arc<dyn IngestionRunLog>) -> Self {
        self.run_log = Some(run_log);
        self
    }

    pub fn policy(&self) -> &IngestionPolicy {
        &self.policy
    }

    pub fn sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.slots.iter().map(|slot| &slot.config)
    }

    /// Run one ingestion across every enabled source.
    ///
    /// `None` queries the policy's default jurisdictions.
    pub async fn ingest(&self, jurisdictions: Option<&[Jurisdiction]>) -> Vec<IngestionResult> {
        let jurisdictions: Arc<[Jurisdiction]> = match jurisdictions {
            Some(codes) => codes.into(),
            None => self.policy.default_jurisdictions.as_slice().into(),
        };
        let timestamp = UtcDateTime::now();

        let runs: Vec<(Arc<SourceSlot>, JoinHandle<IngestionResult>)> = self
            .slots
            .iter()
            .filter(|slot| slot.config.enabled)
            .map(|slot| {
                let handle = tokio::spawn(run_source(
                    Arc::clone(slot),
                    Arc::clone(&jurisdictions),
                    self.policy.retry,
                    self.policy.request_timeout,
                    timestamp,
                ));
                (Arc::clone(slot), handle)
            })
            .collect();

        let mut results = Vec::with_capacity(runs.len());
        for (slot, handle) in runs {
            let result = match handle.await {
                Ok(result) => result,
                Err(error) => {
                    tracing::error!(source = %slot.config.name, %error, "source task failed");
                    IngestionResult {
                        success: false,
                        filings: Vec::new(),
                        errors: vec![format!("source task failed: {error}")],
                        metadata: IngestionMetadata {
                            source: slot.config.name.clone(),
                            timestamp,
                            record_count: 0,
                            processing_time_ms: 0,
                        },
                    }
                }
            };
            results.push(result);
        }

        self.record_runs(&results);
        results
    }

    /// See [`statistics`].
    pub fn statistics(results: &[IngestionResult]) -> IngestionStatistics {
        statistics(results)
    }

    /// Run an ingestion and keep lapsed filings at least `min_age_days` old.
    /// Duplicates reported by several sources appear once.
    pub async fn find_lapsed_filings(&self, min_age_days: u32) -> Vec<Filing> {
        let results = self.ingest(None).await;
        let filings = dedupe(results.into_iter().flat_map(|r| r.filings).collect());
        lapsed_filings(filings, min_age_days, FilingDate::today())
    }

    pub fn breaker_state(&self, source: &str) -> Option<CircuitState> {
        self.slot(source).map(|slot| slot.breaker.state())
    }

    pub fn snapshots(&self) -> Vec<SourceSnapshot> {
        self.slots
            .iter()
            .map(|slot| {
                let circuit = slot.breaker.state();
                SourceSnapshot {
                    name: slot.config.name.clone(),
                    kind: slot.config.kind,
                    enabled: slot.config.enabled,
                    requests_per_minute: slot.config.requests_per_minute,
                    requests_in_window: slot.limiter.in_window(),
                    circuit: circuit.status,
                    consecutive_failures: circuit.consecutive_failures,
                }
            })
            .collect()
    }

    fn slot(&self, source: &str) -> Option<&Arc<SourceSlot>> {
        self.slots.iter().find(|slot| slot.config.name == source)
    }

    fn record_runs(&self, results: &[IngestionResult]) {
        let Some(run_log) = &self.run_log else {
            return;
        };
        for result in results {
            if let Err(error) = run_log.record(&IngestionRunRecord::from_result(result)) {
                tracing::warn!(source = %result.source(), %error, "failed to append run log");
            }
        }
    }
}

/// Lapsed filings filed at least `min_age_days` before `today`.
pub fn lapsed_filings(
    filings: impl IntoIterator<Item = Filing>,
    min_age_days: u32,
    today: FilingDate,
) -> Vec<Filing> {
    filings
        .into_iter()
        .filter(|filing| {
            filing.status == FilingStatus::Lapsed
                && filing.age_days(today) >= i64::from(min_age_days)
        })
        .collect()
}

async fn run_source(
    slot: Arc<SourceSlot>,
    jurisdictions: Arc<[Jurisdiction]>,
    retry: RetryPolicy,
    request_timeout: Duration,
    timestamp: UtcDateTime,
) -> IngestionResult {
    let started = Instant::now();

    let units: Vec<(Jurisdiction, JoinHandle<Result<Vec<RawFiling>, SourceError>>)> =
        jurisdictions
            .iter()
            .map(|jurisdiction| {
                let slot = Arc::clone(&slot);
                let code = jurisdiction.clone();
                let handle = tokio::spawn(async move {
                    fetch_unit(&slot, &code, retry, request_timeout).await
                });
                (jurisdiction.clone(), handle)
            })
            .collect();

    let mut filings = Vec::new();
    let mut errors = Vec::new();
    let mut succeeded = 0_usize;
    for (jurisdiction, handle) in units {
        match handle.await {
            Ok(Ok(raw_filings)) => {
                succeeded += 1;
                for raw in raw_filings {
                    match Filing::from_raw(raw, &slot.config.name, &jurisdiction) {
                        Ok(filing) => filings.push(filing),
                        Err(error) => {
                            errors.push(format!("{jurisdiction}: dropped invalid record: {error}"))
                        }
                    }
                }
            }
            Ok(Err(error)) => {
                tracing::warn!(
                    source = %slot.config.name,
                    jurisdiction = %jurisdiction,
                    code = error.code(),
                    error = %error.message(),
                    "jurisdiction fetch failed"
                );
                errors.push(format!("{jurisdiction}: {error}"));
            }
            Err(join_error) => {
                slot.breaker.record_failure();
                tracing::error!(
                    source = %slot.config.name,
                    jurisdiction = %jurisdiction,
                    error = %join_error,
                    "jurisdiction task failed"
                );
                errors.push(format!("{jurisdiction}: task failed: {join_error}"));
            }
        }
    }

    let filings = dedupe(filings);
    let processing_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    tracing::info!(
        source = %slot.config.name,
        records = filings.len(),
        errors = errors.len(),
        elapsed_ms = processing_time_ms,
        "source ingestion finished"
    );

    IngestionResult {
        success: succeeded > 0,
        metadata: IngestionMetadata {
            source: slot.config.name.clone(),
            timestamp,
            record_count: filings.len(),
            processing_time_ms,
        },
        filings,
        errors,
    }
}

async fn fetch_unit(
    slot: &SourceSlot,
    jurisdiction: &Jurisdiction,
    retry: RetryPolicy,
    request_timeout: Duration,
) -> Result<Vec<RawFiling>, SourceError> {
    slot.limiter.acquire().await;
    if !slot.breaker.allow_request() {
        tracing::debug!(
            source = %slot.config.name,
            jurisdiction = %jurisdiction,
            "circuit open, skipping adapter call"
        );
        return Err(SourceError::circuit_open(&slot.config.name));
    }

    let outcome = retry
        .execute(move |attempt| async move {
            if attempt > 1 {
                slot.limiter.acquire().await;
            }
            match tokio::time::timeout(request_timeout, slot.adapter.fetch(jurisdiction)).await {
                Ok(result) => result,
                Err(_) => Err(SourceError::timeout(format!(
                    "{} did not answer within {} ms",
                    slot.config.name,
                    request_timeout.as_millis()
                ))),
            }
        })
        .await;

    match &outcome {
        Ok(_) => slot.breaker.record_success(),
        Err(_) => slot.breaker.record_failure(),
    }
    outcome
}
