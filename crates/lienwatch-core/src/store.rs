//! Persistence contracts for the run log and the prospect store, plus
//! in-memory implementations used by tests and by `--memory` runs.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{IngestionResult, Prospect, UtcDateTime};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failure,
}

impl RunStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl Display for RunStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the ingestion run log: one source, one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionRunRecord {
    pub source: String,
    pub status: RunStatus,
    pub record_count: usize,
    pub started_at: UtcDateTime,
    pub finished_at: UtcDateTime,
    pub error: Option<String>,
}

impl IngestionRunRecord {
    pub fn from_result(result: &IngestionResult) -> Self {
        let started_at = result.metadata.timestamp;
        Self {
            source: result.metadata.source.clone(),
            status: if result.success {
                RunStatus::Success
            } else {
                RunStatus::Failure
            },
            record_count: result.filings.len(),
            started_at,
            finished_at: started_at.after_millis(result.metadata.processing_time_ms),
            error: (!result.errors.is_empty()).then(|| result.errors.join("; ")),
        }
    }
}

/// Append-only log of ingestion runs.
pub trait IngestionRunLog: Send + Sync {
    fn record(&self, record: &IngestionRunRecord) -> Result<(), StoreError>;

    /// Most recent records first.
    fn recent(&self, limit: usize) -> Result<Vec<IngestionRunRecord>, StoreError>;
}

/// Keyed prospect rows.
pub trait ProspectStore: Send + Sync {
    /// Insert or replace by prospect id.
    fn upsert(&self, prospect: &Prospect) -> Result<(), StoreError>;

    fn get(&self, id: &str) -> Result<Option<Prospect>, StoreError>;

    /// Prospects enriched before `older_than`, stalest first, at most `limit`.
    fn stale(&self, older_than: UtcDateTime, limit: usize) -> Result<Vec<Prospect>, StoreError>;

    fn len(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

#[derive(Debug, Default)]
pub struct MemoryRunLog {
    records: Mutex<Vec<IngestionRunRecord>>,
}

impl MemoryRunLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IngestionRunLog for MemoryRunLog {
    fn record(&self, record: &IngestionRunRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .expect("run log lock is not poisoned")
            .push(record.clone());
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<IngestionRunRecord>, StoreError> {
        let records = self.records.lock().expect("run log lock is not poisoned");
        Ok(records.iter().rev().take(limit).cloned().collect())
    }
}

#[derive(Debug, Default)]
pub struct MemoryProspectStore {
    prospects: Mutex<HashMap<String, Prospect>>,
}

impl MemoryProspectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProspectStore for MemoryProspectStore {
    fn upsert(&self, prospect: &Prospect) -> Result<(), StoreError> {
        self.prospects
            .lock()
            .expect("prospect store lock is not poisoned")
            .insert(prospect.id.clone(), prospect.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Prospect>, StoreError> {
        Ok(self
            .prospects
            .lock()
            .expect("prospect store lock is not poisoned")
            .get(id)
            .cloned())
    }

    fn stale(&self, older_than: UtcDateTime, limit: usize) -> Result<Vec<Prospect>, StoreError> {
        let prospects = self
            .prospects
            .lock()
            .expect("prospect store lock is not poisoned");
        let mut stale: Vec<Prospect> = prospects
            .values()
            .filter(|prospect| prospect.enriched_at < older_than)
            .cloned()
            .collect();
        stale.sort_by(|a, b| a.enriched_at.cmp(&b.enriched_at).then_with(|| a.id.cmp(&b.id)));
        stale.truncate(limit);
        Ok(stale)
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self
            .prospects
            .lock()
            .expect("prospect store lock is not poisoned")
            .len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Filing, FilingDate, FilingStatus, FilingType, IngestionMetadata, Jurisdiction,
    };

    fn prospect(id: &str, enriched_at: &str) -> Prospect {
        Prospect {
            id: id.to_owned(),
            filing: Filing {
                id: id.to_owned(),
                filing_number: None,
                filing_date: FilingDate::from_ymd(2020, 1, 1).expect("valid"),
                debtor_name: String::from("Acme"),
                secured_party_name: String::from("Bank"),
                jurisdiction: Jurisdiction::parse("CA").expect("valid"),
                lien_amount: None,
                status: FilingStatus::Lapsed,
                filing_type: FilingType::Ucc1,
                source: String::from("api"),
            },
            score: 50,
            enriched_at: UtcDateTime::parse(enriched_at).expect("valid"),
        }
    }

    #[test]
    fn run_record_from_failed_result_joins_errors() {
        let result = IngestionResult {
            success: false,
            filings: Vec::new(),
            errors: vec![String::from("CA: timeout"), String::from("NY: 503")],
            metadata: IngestionMetadata {
                source: String::from("ca-portal"),
                timestamp: UtcDateTime::parse("2024-05-01T10:00:00Z").expect("valid"),
                record_count: 0,
                processing_time_ms: 1_500,
            },
        };

        let record = IngestionRunRecord::from_result(&result);
        assert_eq!(record.status, RunStatus::Failure);
        assert_eq!(record.error.as_deref(), Some("CA: timeout; NY: 503"));
        assert_eq!(
            record.finished_at,
            UtcDateTime::parse("2024-05-01T10:00:01.5Z").expect("valid")
        );
    }

    #[test]
    fn memory_run_log_returns_newest_first() {
        let log = MemoryRunLog::new();
        for source in ["a", "b", "c"] {
            let at = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("valid");
            log.record(&IngestionRunRecord {
                source: source.to_owned(),
                status: RunStatus::Success,
                record_count: 1,
                started_at: at,
                finished_at: at,
                error: None,
            })
            .expect("records");
        }

        let recent = log.recent(2).expect("reads");
        let sources: Vec<&str> = recent.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(sources, vec!["c", "b"]);
    }

    #[test]
    fn stale_returns_stalest_first_within_limit() {
        let store = MemoryProspectStore::new();
        store.upsert(&prospect("new", "2024-03-01T00:00:00Z")).expect("upsert");
        store.upsert(&prospect("old", "2024-01-01T00:00:00Z")).expect("upsert");
        store.upsert(&prospect("mid", "2024-02-01T00:00:00Z")).expect("upsert");

        let cutoff = UtcDateTime::parse("2024-02-15T00:00:00Z").expect("valid");
        let stale = store.stale(cutoff, 10).expect("reads");
        let ids: Vec<&str> = stale.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["old", "mid"]);

        let cutoff = UtcDateTime::parse("2025-01-01T00:00:00Z").expect("valid");
        assert_eq!(store.stale(cutoff, 1).expect("reads")[0].id, "old");
    }

    #[test]
    fn upsert_replaces_by_id() {
        let store = MemoryProspectStore::new();
        store.upsert(&prospect("CA-1", "2024-01-01T00:00:00Z")).expect("upsert");
        let mut updated = prospect("CA-1", "2024-06-01T00:00:00Z");
        updated.score = 90;
        store.upsert(&updated).expect("upsert");

        assert_eq!(store.len().expect("len"), 1);
        assert_eq!(store.get("CA-1").expect("get").map(|p| p.score), Some(90));
        assert!(store.get("missing").expect("get").is_none());
    }
}
