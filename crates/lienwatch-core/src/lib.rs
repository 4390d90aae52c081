//! # Lienwatch Core
//!
//! Ingestion resilience engine and scheduler for secured-lending (UCC) filings.
//!
//! ## Overview
//!
//! This crate provides the foundational components for lienwatch:
//!
//! - **Filing domain model** with validation at the adapter boundary
//! - **Source adapter contract** plus HTTP API and HTML portal adapters
//! - **Per-source rate limiting** over a rolling window
//! - **Circuit breaker** and **retry policy** for resilient upstream calls
//! - **Ingestion orchestrator** that fans out across sources and jurisdictions
//! - **Scheduler** driving ingestion, enrichment and refresh cycles
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | API and portal source adapters |
//! | [`circuit_breaker`] | Circuit breaker for resilient calls |
//! | [`config`] | YAML application configuration |
//! | [`data_source`] | Source adapter trait and error classification |
//! | [`dedupe`] | Filing deduplication |
//! | [`domain`] | Filing, jurisdiction and time types |
//! | [`enrichment`] | Prospect scoring |
//! | [`error`] | Core error types |
//! | [`events`] | Scheduler lifecycle events |
//! | [`http_client`] | HTTP client abstraction |
//! | [`ingestion`] | Per-source results and statistics |
//! | [`orchestrator`] | Concurrent ingestion across sources |
//! | [`policy`] | Retry, breaker and timeout settings |
//! | [`retry`] | Exponential backoff retry policy |
//! | [`scheduler`] | Periodic ingestion / enrichment / refresh |
//! | [`source`] | Source configuration |
//! | [`store`] | Run log and prospect store contracts |
//! | [`throttling`] | Rolling-window rate limiter |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lienwatch_core::{
//!     build_adapter, IngestionOrchestrator, IngestionPolicy, Jurisdiction, ReqwestHttpClient,
//!     SourceConfig, SourceKind,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SourceConfig::new("ca-api", SourceKind::Api, 60)
//!         .with_param("base_url", "https://filings.example.com/v1");
//!     let adapter = build_adapter(&config, Arc::new(ReqwestHttpClient::default()))?;
//!
//!     let policy = IngestionPolicy::default()
//!         .with_jurisdictions(Jurisdiction::parse_all(["CA", "NV"])?);
//!     let orchestrator = IngestionOrchestrator::new(vec![(config, adapter)], policy)?;
//!
//!     for result in orchestrator.ingest(None).await {
//!         println!("{}: {} filings", result.source(), result.filings.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ Scheduler       │──────────────▶ EventBus ──▶ subscribers
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Orchestrator    │────▶│ Rate Limiter     │
//! │ (per source ×   │     ├──────────────────┤
//! │  jurisdiction)  │────▶│ Circuit Breaker  │
//! └────────┬────────┘     ├──────────────────┤
//!          │              │ Retry Policy     │
//!          ▼              └──────────────────┘
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Source Adapter  │────▶│ HTTP Client      │
//! │ (API / portal / │     │ (reqwest/none)   │
//! │  mirror)        │     └──────────────────┘
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Filing (dedupe) │────▶│ Enricher / Store │
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Adapter failures are classified, and only some of them are retried:
//!
//! ```rust
//! use lienwatch_core::{SourceError, SourceErrorKind};
//!
//! fn describe(error: &SourceError) -> &'static str {
//!     match error.kind() {
//!         SourceErrorKind::RateLimited | SourceErrorKind::Transient => "retried with backoff",
//!         SourceErrorKind::CircuitOpen => "skipped until the breaker cools down",
//!         _ => "reported without retry",
//!     }
//! }
//!
//! assert_eq!(describe(&SourceError::from_status(503, "down")), "retried with backoff");
//! ```
//!
//! ## Security
//!
//! - Credentials come from connection parameters, usually `env:` references
//! - Credentials are never logged
//! - Raw records are validated before they reach the store

pub mod adapters;
pub mod circuit_breaker;
pub mod config;
pub mod data_source;
pub mod dedupe;
pub mod domain;
pub mod enrichment;
pub mod error;
pub mod events;
pub mod http_client;
pub mod ingestion;
pub mod orchestrator;
pub mod policy;
pub mod retry;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod throttling;

// Re-export commonly used types at crate root for convenience

// Adapter implementations
pub use adapters::{build_adapter, parse_filings_table, ApiAdapter, PortalAdapter};

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState, CircuitStatus};

// Configuration
pub use config::{AppConfig, BreakerSettings, RetrySettings, ScheduleSettings};

// Source adapter trait and errors
pub use data_source::{FetchFuture, SourceAdapter, SourceError, SourceErrorKind};

// Deduplication
pub use dedupe::dedupe;

// Domain models
pub use domain::{
    normalize_name, Filing, FilingDate, FilingIdentity, FilingStatus, FilingType, Jurisdiction,
    RawAmount, RawFiling, UtcDateTime,
};

// Enrichment
pub use enrichment::{Enricher, EnrichmentError, Prospect, ScoreCardEnricher};

// Error types
pub use error::{ConfigError, CoreError, ValidationError};

// Events
pub use events::{EventBus, SchedulerEvent, SchedulerEventKind, SubscriptionId};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient,
};

// Ingestion results
pub use ingestion::{statistics, IngestionMetadata, IngestionResult, IngestionStatistics};

// Orchestration
pub use orchestrator::{lapsed_filings, IngestionOrchestrator, SourceSnapshot};

// Policies
pub use policy::IngestionPolicy;
pub use retry::RetryPolicy;

// Scheduling
pub use scheduler::{IngestionReport, ScheduleConfig, Scheduler, SchedulerError, SchedulerStatus};

// Source configuration
pub use source::{SourceConfig, SourceKind};

// Stores
pub use store::{
    IngestionRunLog, IngestionRunRecord, MemoryProspectStore, MemoryRunLog, ProspectStore,
    RunStatus, StoreError,
};

// Throttling
pub use throttling::{RateLimiter, DEFAULT_RATE_WINDOW};
