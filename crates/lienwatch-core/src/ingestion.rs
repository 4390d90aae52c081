use serde::{Deserialize, Serialize};

use crate::{Filing, UtcDateTime};

/// Run metadata attached to every [`IngestionResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionMetadata {
    pub source: String,
    pub timestamp: UtcDateTime,
    pub record_count: usize,
    pub processing_time_ms: u64,
}

/// Outcome of one source for one ingestion run.
///
/// `success` is true when at least one jurisdiction was fetched without error;
/// partial failures are listed in `errors` either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionResult {
    pub success: bool,
    pub filings: Vec<Filing>,
    pub errors: Vec<String>,
    pub metadata: IngestionMetadata,
}

impl IngestionResult {
    pub fn source(&self) -> &str {
        &self.metadata.source
    }
}

/// Aggregate view over a batch of results.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IngestionStatistics {
    pub total_records: usize,
    /// Percentage of successful results, 0..=100.
    pub success_rate: f64,
    /// Mean processing time in milliseconds.
    pub avg_processing_time: f64,
    pub error_count: usize,
}

/// Summarize results. Records are summed without cross-source dedupe.
pub fn statistics(results: &[IngestionResult]) -> IngestionStatistics {
    if results.is_empty() {
        return IngestionStatistics::default();
    }

    let count = results.len() as f64;
    let successes = results.iter().filter(|result| result.success).count() as f64;
    let total_time: u64 = results
        .iter()
        .map(|result| result.metadata.processing_time_ms)
        .sum();

    IngestionStatistics {
        total_records: results.iter().map(|result| result.filings.len()).sum(),
        success_rate: 100.0 * successes / count,
        avg_processing_time: total_time as f64 / count,
        error_count: results.iter().map(|result| result.errors.len()).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FilingDate, FilingStatus, FilingType, Jurisdiction};

    fn filing(number: &str) -> Filing {
        Filing {
            id: format!("TX-{number}"),
            filing_number: Some(number.to_owned()),
            filing_date: FilingDate::from_ymd(2021, 6, 1).expect("valid date"),
            debtor_name: String::from("Acme"),
            secured_party_name: String::from("Bank"),
            jurisdiction: Jurisdiction::parse("TX").expect("valid"),
            lien_amount: Some(1_000.0),
            status: FilingStatus::Active,
            filing_type: FilingType::Ucc1,
            source: String::from("tx-api"),
        }
    }

    fn result(success: bool, filings: Vec<Filing>, errors: &[&str], ms: u64) -> IngestionResult {
        IngestionResult {
            success,
            metadata: IngestionMetadata {
                source: String::from("tx-api"),
                timestamp: UtcDateTime::parse("2024-01-01T00:00:00Z").expect("valid"),
                record_count: filings.len(),
                processing_time_ms: ms,
            },
            filings,
            errors: errors.iter().map(|e| (*e).to_owned()).collect(),
        }
    }

    #[test]
    fn empty_batch_is_all_zero() {
        assert_eq!(statistics(&[]), IngestionStatistics::default());
    }

    #[test]
    fn aggregates_counts_rates_and_times() {
        let stats = statistics(&[
            result(true, vec![filing("1"), filing("2")], &[], 100),
            result(false, vec![filing("3")], &["TX: timeout", "CA: 503"], 300),
        ]);

        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.success_rate, 50.0);
        assert_eq!(stats.avg_processing_time, 200.0);
        assert_eq!(stats.error_count, 2);
    }

    #[test]
    fn serializes_metadata_timestamp_as_rfc3339() {
        let json = serde_json::to_value(result(true, Vec::new(), &[], 5)).expect("serializes");
        assert_eq!(json["metadata"]["timestamp"], "2024-01-01T00:00:00Z");
        assert_eq!(json["metadata"]["record_count"], 0);
    }
}
