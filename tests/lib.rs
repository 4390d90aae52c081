//! Shared fixtures for the lienwatch behavior tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

pub use std::sync::Arc;

use lienwatch_core::{
    FetchFuture, Filing, FilingDate, FilingStatus, FilingType, Jurisdiction, Prospect, RawAmount,
    RawFiling, SourceAdapter, SourceConfig, SourceError, SourceKind, UtcDateTime,
};
use tokio::time::Instant;

/// What one adapter call answers.
#[derive(Debug, Clone)]
pub enum Step {
    Filings(Vec<RawFiling>),
    Fail(SourceError),
    /// Answers after the delay has elapsed.
    Delayed(Duration, Vec<RawFiling>),
    /// Never answers; only a timeout ends the call.
    Hang,
}

/// Adapter that replays a per-jurisdiction script and records every call.
///
/// Once a jurisdiction's script is exhausted the fallback step answers.
pub struct ScriptedAdapter {
    name: String,
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    fallback: Step,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedAdapter {
    pub fn new(name: &str) -> Self {
        Self::with_fallback(name, Step::Filings(Vec::new()))
    }

    /// Every call fails with `error`.
    pub fn failing(name: &str, error: SourceError) -> Self {
        Self::with_fallback(name, Step::Fail(error))
    }

    pub fn with_fallback(name: &str, fallback: Step) -> Self {
        Self {
            name: name.to_owned(),
            scripts: Mutex::new(HashMap::new()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn script(self, jurisdiction: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .expect("scripts lock")
            .insert(jurisdiction.to_ascii_uppercase(), steps.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn calls_for(&self, jurisdiction: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|(code, _)| code == jurisdiction)
            .count()
    }
}

impl SourceAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Api
    }

    fn fetch<'a>(&'a self, jurisdiction: &'a Jurisdiction) -> FetchFuture<'a> {
        let code = jurisdiction.as_str().to_owned();
        self.calls
            .lock()
            .expect("calls lock")
            .push((code.clone(), Instant::now()));
        let step = self
            .scripts
            .lock()
            .expect("scripts lock")
            .get_mut(&code)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.fallback.clone());

        Box::pin(async move {
            match step {
                Step::Filings(filings) => Ok(filings),
                Step::Fail(error) => Err(error),
                Step::Delayed(delay, filings) => {
                    tokio::time::sleep(delay).await;
                    Ok(filings)
                }
                Step::Hang => std::future::pending().await,
            }
        })
    }
}

pub fn source(name: &str, requests_per_minute: u32) -> SourceConfig {
    SourceConfig::new(name, SourceKind::Api, requests_per_minute)
}

pub fn entry(
    config: SourceConfig,
    adapter: Arc<dyn SourceAdapter>,
) -> (SourceConfig, Arc<dyn SourceAdapter>) {
    (config, adapter)
}

pub fn jurisdictions(codes: &[&str]) -> Vec<Jurisdiction> {
    Jurisdiction::parse_all(codes).expect("valid jurisdiction codes")
}

/// Raw record as an upstream would report it.
pub fn raw(number: &str, date: &str, debtor: &str, status: &str) -> RawFiling {
    RawFiling {
        filing_number: Some(number.to_owned()),
        filing_date: Some(date.to_owned()),
        debtor_name: Some(debtor.to_owned()),
        secured_party_name: Some(String::from("Harbor Capital")),
        jurisdiction: None,
        lien_amount: Some(RawAmount::Number(75_000.0)),
        status: Some(status.to_owned()),
        filing_type: Some(String::from("ucc1")),
    }
}

/// Validated filing with a fixed age relative to today.
pub fn filing(jurisdiction: &str, number: &str, status: FilingStatus, age_days: u32) -> Filing {
    let jurisdiction = Jurisdiction::parse(jurisdiction).expect("valid jurisdiction");
    let filing_date = days_ago(age_days);
    Filing {
        id: format!("{jurisdiction}-{number}"),
        filing_number: Some(number.to_owned()),
        filing_date,
        debtor_name: format!("Debtor {number}"),
        secured_party_name: String::from("Harbor Capital"),
        jurisdiction,
        lien_amount: Some(10_000.0),
        status,
        filing_type: FilingType::Ucc1,
        source: String::from("fixture"),
    }
}

/// Stored prospect with a zero score, last enriched `enriched_days_ago` days ago.
pub fn prospect(number: &str, enriched_days_ago: u32) -> Prospect {
    let filing = filing("CA", number, FilingStatus::Lapsed, 2000);
    Prospect {
        id: filing.id.clone(),
        filing,
        score: 0,
        enriched_at: UtcDateTime::now().days_before(enriched_days_ago),
    }
}

/// ISO date `days` before today.
pub fn iso_days_ago(days: u32) -> String {
    days_ago(days).format_iso()
}

fn days_ago(days: u32) -> FilingDate {
    UtcDateTime::now().days_before(days).date()
}
