//! # Lienwatch Warehouse
//!
//! DuckDB-based storage for lienwatch.
//!
//! ## Overview
//!
//! - **Run log**: one row per source per ingestion run ([`IngestionRunLog`])
//! - **Prospect store**: scored prospects keyed by filing id ([`ProspectStore`])
//! - **Mirror source**: [`MirrorAdapter`] reads filings from a local DuckDB mirror
//! - **Connection pooling** over a single database instance
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lienwatch_core::ProspectStore;
//! use lienwatch_warehouse::Warehouse;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open_default()?;
//!     println!("{} prospects stored", warehouse.len()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `ingestion_runs` | Ingestion run log |
//! | `prospects` | Latest prospect per filing id |
//! | `schema_migrations` | Applied schema versions |
//!
//! All values are bound as query parameters.

pub mod duckdb;
pub mod migrations;
pub mod mirror;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ::duckdb::ToSql;
use lienwatch_core::{
    build_adapter, ConfigError, HttpClient, IngestionRunLog, IngestionRunRecord, Prospect,
    ProspectStore, RunStatus, SourceAdapter, SourceConfig, SourceKind, StoreError, UtcDateTime,
};
use thiserror::Error;
use uuid::Uuid;

pub use duckdb::{DuckDbConnectionManager, PooledConnection};
pub use mirror::{MirrorAdapter, DEFAULT_MIRROR_TABLE};

/// Environment variable naming the lienwatch data directory.
pub const HOME_ENV_VAR: &str = "LIENWATCH_HOME";

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("prospect payload error: {0}")]
    Payload(#[from] serde_json::Error),

    /// A stored row no longer decodes into its domain type.
    #[error("corrupt row in '{table}': {message}")]
    CorruptRow { table: &'static str, message: String },
}

impl From<WarehouseError> for StoreError {
    fn from(error: WarehouseError) -> Self {
        match error {
            WarehouseError::Payload(error) => StoreError::Serialization(error),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for lienwatch data.
    pub lienwatch_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept in the pool.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self::in_home(resolve_lienwatch_home())
    }
}

impl WarehouseConfig {
    /// Store the database under `home/warehouse.duckdb`.
    pub fn in_home(home: impl Into<PathBuf>) -> Self {
        let lienwatch_home = home.into();
        let db_path = lienwatch_home.join("warehouse.duckdb");
        Self {
            lienwatch_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

/// DuckDB-backed run log and prospect store.
#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open a warehouse with default configuration.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open a warehouse, creating the database file and schema if needed.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::open(config.db_path.clone(), config.max_pool_size)?;
        let warehouse = Self { config, manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Apply pending schema migrations.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    pub fn home(&self) -> &Path {
        self.config.lienwatch_home.as_path()
    }

    pub fn insert_run(&self, record: &IngestionRunRecord) -> Result<String, WarehouseError> {
        let run_id = Uuid::new_v4().to_string();
        let record_count = i64::try_from(record.record_count).unwrap_or(i64::MAX);
        let started_at = record.started_at.format_rfc3339();
        let finished_at = record.finished_at.format_rfc3339();

        let connection = self.manager.acquire()?;
        let params: [&dyn ToSql; 7] = [
            &run_id,
            &record.source,
            &record.status.as_str(),
            &record_count,
            &started_at,
            &finished_at,
            &record.error,
        ];
        connection.execute(
            "INSERT INTO ingestion_runs \
             (run_id, source, status, record_count, started_at, finished_at, error) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params.as_slice(),
        )?;
        Ok(run_id)
    }

    pub fn recent_runs(&self, limit: usize) -> Result<Vec<IngestionRunRecord>, WarehouseError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT source, status, record_count, started_at, finished_at, error \
             FROM ingestion_runs ORDER BY seq DESC LIMIT ?",
        )?;
        let rows = statement.query_map([limit], |row| {
            Ok(StoredRun {
                source: row.get(0)?,
                status: row.get(1)?,
                record_count: row.get(2)?,
                started_at: row.get(3)?,
                finished_at: row.get(4)?,
                error: row.get(5)?,
            })
        })?;

        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?.decode()?);
        }
        Ok(runs)
    }

    pub fn upsert_prospect(&self, prospect: &Prospect) -> Result<(), WarehouseError> {
        let payload = serde_json::to_string(prospect)?;
        let enriched_at = prospect.enriched_at.format_rfc3339();
        let enriched_at_ms = epoch_millis(prospect.enriched_at);
        let score = i32::from(prospect.score);

        let connection = self.manager.acquire()?;
        let params: [&dyn ToSql; 7] = [
            &prospect.id,
            &prospect.filing.jurisdiction.as_str(),
            &prospect.filing.status.as_str(),
            &score,
            &enriched_at,
            &enriched_at_ms,
            &payload,
        ];
        connection.execute(
            "INSERT OR REPLACE INTO prospects \
             (id, jurisdiction, status, score, enriched_at, enriched_at_ms, payload) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params.as_slice(),
        )?;
        Ok(())
    }

    pub fn prospect(&self, id: &str) -> Result<Option<Prospect>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare("SELECT payload FROM prospects WHERE id = ?")?;
        let mut rows = statement.query([id])?;
        match rows.next()? {
            Some(row) => {
                let payload: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&payload)?))
            }
            None => Ok(None),
        }
    }

    pub fn stale_prospects(
        &self,
        older_than: UtcDateTime,
        limit: usize,
    ) -> Result<Vec<Prospect>, WarehouseError> {
        let cutoff = epoch_millis(older_than);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT payload FROM prospects WHERE enriched_at_ms < ? \
             ORDER BY enriched_at_ms ASC, id ASC LIMIT ?",
        )?;
        let rows = statement.query_map([cutoff, limit], |row| row.get::<_, String>(0))?;

        let mut prospects = Vec::new();
        for payload in rows {
            prospects.push(serde_json::from_str(&payload?)?);
        }
        Ok(prospects)
    }

    pub fn prospect_count(&self) -> Result<usize, WarehouseError> {
        let connection = self.manager.acquire()?;
        let count: i64 = connection.query_row("SELECT COUNT(*) FROM prospects", [], |row| {
            row.get(0)
        })?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

impl IngestionRunLog for Warehouse {
    fn record(&self, record: &IngestionRunRecord) -> Result<(), StoreError> {
        self.insert_run(record)?;
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<IngestionRunRecord>, StoreError> {
        Ok(self.recent_runs(limit)?)
    }
}

impl ProspectStore for Warehouse {
    fn upsert(&self, prospect: &Prospect) -> Result<(), StoreError> {
        Ok(self.upsert_prospect(prospect)?)
    }

    fn get(&self, id: &str) -> Result<Option<Prospect>, StoreError> {
        Ok(self.prospect(id)?)
    }

    fn stale(&self, older_than: UtcDateTime, limit: usize) -> Result<Vec<Prospect>, StoreError> {
        Ok(self.stale_prospects(older_than, limit)?)
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.prospect_count()?)
    }
}

/// Build an adapter for every configured source, including database mirrors.
/// HTTP adapters bound each request by `request_timeout`.
///
/// # Errors
/// Fails on the first source whose connection parameters are unusable.
pub fn build_adapters(
    sources: &[SourceConfig],
    http_client: Arc<dyn HttpClient>,
    request_timeout: Duration,
) -> Result<Vec<(SourceConfig, Arc<dyn SourceAdapter>)>, ConfigError> {
    sources
        .iter()
        .map(|config| {
            let adapter: Arc<dyn SourceAdapter> = match config.kind {
                SourceKind::Database => Arc::new(MirrorAdapter::from_config(config)?),
                SourceKind::Api | SourceKind::Portal => {
                    build_adapter(config, Arc::clone(&http_client), request_timeout)?
                }
            };
            Ok((config.clone(), adapter))
        })
        .collect()
}

struct StoredRun {
    source: String,
    status: String,
    record_count: i64,
    started_at: String,
    finished_at: String,
    error: Option<String>,
}

impl StoredRun {
    fn decode(self) -> Result<IngestionRunRecord, WarehouseError> {
        let corrupt = |message: String| WarehouseError::CorruptRow {
            table: "ingestion_runs",
            message,
        };

        let status = match self.status.as_str() {
            "success" => RunStatus::Success,
            "failure" => RunStatus::Failure,
            other => return Err(corrupt(format!("unknown status '{other}'"))),
        };
        let started_at =
            UtcDateTime::parse(&self.started_at).map_err(|error| corrupt(error.to_string()))?;
        let finished_at =
            UtcDateTime::parse(&self.finished_at).map_err(|error| corrupt(error.to_string()))?;

        Ok(IngestionRunRecord {
            source: self.source,
            status,
            record_count: usize::try_from(self.record_count).unwrap_or(0),
            started_at,
            finished_at,
            error: self.error,
        })
    }
}

fn epoch_millis(at: UtcDateTime) -> i64 {
    i64::try_from(at.into_inner().unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

fn resolve_lienwatch_home() -> PathBuf {
    if let Some(path) = env::var_os(HOME_ENV_VAR) {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".lienwatch");
    }

    PathBuf::from(".lienwatch")
}
