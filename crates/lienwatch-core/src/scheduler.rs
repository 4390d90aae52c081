//! Recurring ingestion, enrichment and refresh.
//!
//! A [`Scheduler`] is either stopped or running. While running, three
//! independent timers drive the cycles below; each timer first fires one full
//! interval after [`Scheduler::start`].
//!
//! | Cycle | Work | Events |
//! |-------|------|--------|
//! | ingestion | orchestrator run, dedupe across sources, enrich, upsert | `ingestion_started` / `ingestion_completed` |
//! | enrichment | re-score prospects older than the stale threshold | `enrichment_started` / `enrichment_completed` |
//! | refresh | re-score a smaller batch of stale prospects | `refresh_started` / `refresh_completed` |
//!
//! A cycle that fails emits `error` instead of its completion event and bumps
//! `total_errors`; the scheduler keeps running.
//!
//! [`Scheduler::stop`] waits for in-flight timer cycles and guarantees that no
//! timer-driven cycle starts after it returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::dedupe::dedupe;
use crate::enrichment::{Enricher, EnrichmentError, Prospect};
use crate::events::{EventBus, SchedulerEvent, SchedulerEventKind, SubscriptionId};
use crate::ingestion::{statistics, IngestionResult, IngestionStatistics};
use crate::orchestrator::IngestionOrchestrator;
use crate::store::{ProspectStore, StoreError};
use crate::{ConfigError, Filing, UtcDateTime};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler must be started from within a tokio runtime")]
    NoRuntime,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Enrichment(#[from] EnrichmentError),
    #[error("prospect '{id}' not found")]
    ProspectNotFound { id: String },
}

/// Timer and batch settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub ingestion_interval: Duration,
    pub enrichment_interval: Duration,
    pub refresh_interval: Duration,
    pub enrichment_batch_size: usize,
    pub refresh_batch_size: usize,
    pub stale_data_threshold_days: u32,
    pub auto_start: bool,
    pub enabled: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            ingestion_interval: Duration::from_secs(6 * 60 * 60),
            enrichment_interval: Duration::from_secs(60 * 60),
            refresh_interval: Duration::from_secs(24 * 60 * 60),
            enrichment_batch_size: 100,
            refresh_batch_size: 50,
            stale_data_threshold_days: 30,
            auto_start: false,
            enabled: true,
        }
    }
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, interval) in [
            ("ingestion_interval", self.ingestion_interval),
            ("enrichment_interval", self.enrichment_interval),
            ("refresh_interval", self.refresh_interval),
        ] {
            if interval.is_zero() {
                return Err(ConfigError::ZeroInterval { field });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub last_ingestion_run: Option<UtcDateTime>,
    pub last_enrichment_run: Option<UtcDateTime>,
    pub last_refresh_run: Option<UtcDateTime>,
    pub total_prospects_processed: u64,
    pub total_errors: u64,
}

/// What a manual or timer-driven ingestion produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestionReport {
    pub results: Vec<IngestionResult>,
    pub statistics: IngestionStatistics,
    pub prospects_processed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cycle {
    Ingestion,
    Enrichment,
    Refresh,
}

impl Cycle {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Ingestion => "ingestion",
            Self::Enrichment => "enrichment",
            Self::Refresh => "refresh",
        }
    }

    const fn started(self) -> SchedulerEventKind {
        match self {
            Self::Ingestion => SchedulerEventKind::IngestionStarted,
            Self::Enrichment => SchedulerEventKind::EnrichmentStarted,
            Self::Refresh => SchedulerEventKind::RefreshStarted,
        }
    }

    const fn completed(self) -> SchedulerEventKind {
        match self {
            Self::Ingestion => SchedulerEventKind::IngestionCompleted,
            Self::Enrichment => SchedulerEventKind::EnrichmentCompleted,
            Self::Refresh => SchedulerEventKind::RefreshCompleted,
        }
    }
}

struct SchedulerInner {
    config: ScheduleConfig,
    orchestrator: Arc<IngestionOrchestrator>,
    enricher: Arc<dyn Enricher>,
    store: Arc<dyn ProspectStore>,
    events: EventBus,
    status: Mutex<SchedulerStatus>,
    running: AtomicBool,
    // Timer cycles hold the read side; stop() takes the write side to wait
    // for them.
    gate: RwLock<()>,
    timers: Mutex<Vec<JoinHandle<()>>>,
}

/// Drives the orchestrator and enricher on timers and on demand.
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    /// Build a scheduler; starts it right away when `enabled && auto_start`.
    ///
    /// # Errors
    ///
    /// Invalid intervals, or auto-start outside a tokio runtime.
    pub fn new(
        config: ScheduleConfig,
        orchestrator: Arc<IngestionOrchestrator>,
        enricher: Arc<dyn Enricher>,
        store: Arc<dyn ProspectStore>,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        let auto_start = config.enabled && config.auto_start;
        let scheduler = Self {
            inner: Arc::new(SchedulerInner {
                config,
                orchestrator,
                enricher,
                store,
                events: EventBus::new(),
                status: Mutex::new(SchedulerStatus::default()),
                running: AtomicBool::new(false),
                gate: RwLock::new(()),
                timers: Mutex::new(Vec::new()),
            }),
        };
        if auto_start {
            scheduler.start()?;
        }
        Ok(scheduler)
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.inner.config
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> SchedulerStatus {
        self.inner
            .status
            .lock()
            .expect("scheduler status lock is not poisoned")
            .clone()
    }

    /// Register a handler for every event emitted from now on.
    pub fn on<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&SchedulerEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(handler)
    }

    pub fn off(&self, subscription: SubscriptionId) -> bool {
        self.inner.events.unsubscribe(subscription)
    }

    /// Start the three timers. A no-op when already running or disabled.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let inner = &self.inner;
        if !inner.config.enabled {
            tracing::info!("scheduler is disabled, ignoring start");
            return Ok(());
        }
        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;

        // The running flag, the timer handles and the status change together
        // under the status lock so a concurrent stop() sees all or none.
        let mut already_running = false;
        inner.update_status(|status| {
            already_running = inner.running.swap(true, Ordering::SeqCst);
            if already_running {
                return;
            }
            status.running = true;
            let timers = [
                (Cycle::Ingestion, inner.config.ingestion_interval),
                (Cycle::Enrichment, inner.config.enrichment_interval),
                (Cycle::Refresh, inner.config.refresh_interval),
            ]
            .into_iter()
            .map(|(cycle, period)| runtime.spawn(run_timer(Arc::clone(inner), cycle, period)));
            inner
                .timers
                .lock()
                .expect("scheduler timers lock is not poisoned")
                .extend(timers);
        });
        if already_running {
            return Ok(());
        }

        tracing::info!(
            ingestion_secs = inner.config.ingestion_interval.as_secs(),
            enrichment_secs = inner.config.enrichment_interval.as_secs(),
            refresh_secs = inner.config.refresh_interval.as_secs(),
            "scheduler started"
        );
        inner.emit(
            SchedulerEventKind::SchedulerStarted,
            json!({
                "ingestion_interval_secs": inner.config.ingestion_interval.as_secs(),
                "enrichment_interval_secs": inner.config.enrichment_interval.as_secs(),
                "refresh_interval_secs": inner.config.refresh_interval.as_secs(),
            }),
        );
        Ok(())
    }

    /// Cancel the timers, waiting for any cycle they are running to finish.
    /// A no-op when already stopped.
    pub async fn stop(&self) {
        let inner = &self.inner;
        let mut timers = None;
        inner.update_status(|_| {
            if inner.running.swap(false, Ordering::SeqCst) {
                timers = Some(std::mem::take(
                    &mut *inner
                        .timers
                        .lock()
                        .expect("scheduler timers lock is not poisoned"),
                ));
            }
        });
        let Some(timers) = timers else {
            return;
        };

        drop(inner.gate.write().await);
        for timer in timers {
            timer.abort();
        }

        // A start() that raced this stop owns the new timers and the status.
        let mut restarted = false;
        inner.update_status(|status| {
            restarted = inner.running.load(Ordering::SeqCst);
            if !restarted {
                status.running = false;
            }
        });
        if restarted {
            tracing::debug!("scheduler restarted while stopping");
            return;
        }
        tracing::info!("scheduler stopped");
        inner.emit(SchedulerEventKind::SchedulerStopped, Value::Null);
    }

    /// Run an ingestion cycle now, independent of the timers.
    pub async fn trigger_ingestion(&self) -> Result<IngestionReport, SchedulerError> {
        self.inner.ingestion_cycle().await
    }

    /// Re-enrich one stored prospect now.
    pub async fn refresh_prospect(&self, id: &str) -> Result<Prospect, SchedulerError> {
        let inner = &self.inner;
        inner.emit(Cycle::Refresh.started(), json!({ "id": id }));

        let mut processed = 0;
        let outcome = inner
            .store
            .get(id)
            .map_err(SchedulerError::from)
            .and_then(|found| {
                found.ok_or_else(|| SchedulerError::ProspectNotFound { id: id.to_owned() })
            })
            .and_then(|prospect| inner.enrich_one(&prospect.filing, &mut processed));

        inner.finish(
            Cycle::Refresh,
            processed,
            outcome.as_ref().map(|prospect| {
                json!({ "id": id, "score": prospect.score, "prospects": processed })
            }),
        );
        outcome
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.inner.running.store(false, Ordering::SeqCst);
        if let Ok(mut timers) = self.inner.timers.lock() {
            for timer in timers.drain(..) {
                timer.abort();
            }
        }
    }
}

async fn run_timer(inner: Arc<SchedulerInner>, cycle: Cycle, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let _cycle_guard = inner.gate.read().await;
        if !inner.running.load(Ordering::SeqCst) {
            break;
        }
        tracing::debug!(cycle = cycle.as_str(), "timer fired");
        // Failures were already reported through the event stream.
        let _ = match cycle {
            Cycle::Ingestion => inner.ingestion_cycle().await.map(drop),
            Cycle::Enrichment => inner.enrichment_cycle(),
            Cycle::Refresh => inner.refresh_cycle(),
        };
    }
}

impl SchedulerInner {
    fn emit(&self, kind: SchedulerEventKind, payload: Value) {
        self.events.emit(&SchedulerEvent::new(kind, payload));
    }

    fn update_status(&self, update: impl FnOnce(&mut SchedulerStatus)) {
        let mut status = self
            .status
            .lock()
            .expect("scheduler status lock is not poisoned");
        update(&mut status);
    }

    async fn ingestion_cycle(&self) -> Result<IngestionReport, SchedulerError> {
        let jurisdictions = &self.orchestrator.policy().default_jurisdictions;
        self.emit(
            Cycle::Ingestion.started(),
            json!({ "jurisdictions": jurisdictions }),
        );

        let results = self.orchestrator.ingest(None).await;
        let statistics = statistics(&results);
        let filings = dedupe(
            results
                .iter()
                .flat_map(|result| result.filings.iter().cloned())
                .collect(),
        );

        let mut processed = 0;
        let outcome = self.enrich_batch(&filings, &mut processed);
        self.finish(
            Cycle::Ingestion,
            processed,
            outcome.as_ref().map(|()| {
                json!({
                    "sources": results.len(),
                    "records": statistics.total_records,
                    "unique_filings": filings.len(),
                    "prospects": processed,
                    "success_rate": statistics.success_rate,
                    "error_count": statistics.error_count,
                })
            }),
        );
        outcome?;

        Ok(IngestionReport {
            results,
            statistics,
            prospects_processed: processed,
        })
    }

    fn enrichment_cycle(&self) -> Result<(), SchedulerError> {
        self.emit(
            Cycle::Enrichment.started(),
            json!({ "batch_size": self.config.enrichment_batch_size }),
        );
        let older_than = UtcDateTime::now().days_before(self.config.stale_data_threshold_days);
        self.rescore(Cycle::Enrichment, older_than, self.config.enrichment_batch_size)
    }

    fn refresh_cycle(&self) -> Result<(), SchedulerError> {
        self.emit(
            Cycle::Refresh.started(),
            json!({ "batch_size": self.config.refresh_batch_size }),
        );
        let older_than = UtcDateTime::now().days_before(self.config.stale_data_threshold_days);
        self.rescore(Cycle::Refresh, older_than, self.config.refresh_batch_size)
    }

    fn rescore(
        &self,
        cycle: Cycle,
        older_than: UtcDateTime,
        limit: usize,
    ) -> Result<(), SchedulerError> {
        let mut processed = 0;
        let outcome = self
            .store
            .stale(older_than, limit)
            .map_err(SchedulerError::from)
            .and_then(|stale| {
                let filings: Vec<Filing> = stale.into_iter().map(|p| p.filing).collect();
                self.enrich_batch(&filings, &mut processed)
            });
        self.finish(
            cycle,
            processed,
            outcome.as_ref().map(|()| json!({ "prospects": processed })),
        );
        outcome
    }

    fn enrich_batch(
        &self,
        filings: &[Filing],
        processed: &mut usize,
    ) -> Result<(), SchedulerError> {
        for filing in filings {
            self.enrich_one(filing, processed)?;
        }
        Ok(())
    }

    fn enrich_one(
        &self,
        filing: &Filing,
        processed: &mut usize,
    ) -> Result<Prospect, SchedulerError> {
        let prospect = self.enricher.enrich(filing)?;
        self.store.upsert(&prospect)?;
        *processed += 1;
        Ok(prospect)
    }

    /// Record the cycle in the status, then emit its completion or error.
    fn finish(&self, cycle: Cycle, processed: usize, outcome: Result<Value, &SchedulerError>) {
        let now = UtcDateTime::now();
        self.update_status(|status| {
            match cycle {
                Cycle::Ingestion => status.last_ingestion_run = Some(now),
                Cycle::Enrichment => status.last_enrichment_run = Some(now),
                Cycle::Refresh => status.last_refresh_run = Some(now),
            }
            status.total_prospects_processed += processed as u64;
            if outcome.is_err() {
                status.total_errors += 1;
            }
        });

        match outcome {
            Ok(payload) => {
                tracing::info!(cycle = cycle.as_str(), prospects = processed, "cycle completed");
                self.emit(cycle.completed(), payload);
            }
            Err(error) => {
                tracing::error!(cycle = cycle.as_str(), %error, "cycle failed");
                self.emit(
                    SchedulerEventKind::Error,
                    json!({ "cycle": cycle.as_str(), "message": error.to_string() }),
                );
            }
        }
    }
}
