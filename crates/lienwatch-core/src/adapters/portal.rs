//! Portal scrape adapter.
//!
//! Fetches a state portal's search results page and extracts each row of the
//! results `<table>` into a [`RawFiling`]. Column headers are matched by
//! normalized name (lowercase alphanumerics only), so `"Filing No."`,
//! `"filing_number"` and `"File Number"` all land in the same field. Unknown
//! columns are ignored.

use std::sync::Arc;
use std::time::Duration;

use scraper::{ElementRef, Html, Selector};

use crate::data_source::{FetchFuture, SourceAdapter, SourceError};
use crate::http_client::{HttpClient, HttpRequest};
use crate::{ConfigError, Jurisdiction, RawAmount, RawFiling, SourceConfig, SourceKind};

const DEFAULT_SEARCH_PATH: &str = "/search";
const DEFAULT_TABLE_SELECTOR: &str = "table";

/// Scrapes filing search results from an HTML portal.
#[derive(Clone)]
pub struct PortalAdapter {
    name: String,
    base_url: String,
    search_path: String,
    table_selector: String,
    timeout: Option<Duration>,
    http_client: Arc<dyn HttpClient>,
}

impl PortalAdapter {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        http_client: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            search_path: DEFAULT_SEARCH_PATH.to_owned(),
            table_selector: DEFAULT_TABLE_SELECTOR.to_owned(),
            timeout: None,
            http_client,
        }
    }

    /// Build from a source config. Requires `base_url`; `search_path` and
    /// `table_selector` are optional overrides.
    pub fn from_config(
        config: &SourceConfig,
        http_client: Arc<dyn HttpClient>,
    ) -> Result<Self, ConfigError> {
        let base_url = config.require_param("base_url")?;
        let mut adapter = Self::new(config.name.clone(), base_url, http_client);
        if let Some(path) = config.param("search_path") {
            adapter = adapter.with_search_path(path);
        }
        if let Some(selector) = config.param("table_selector") {
            adapter = adapter.with_table_selector(selector);
        }
        Ok(adapter)
    }

    pub fn with_search_path(mut self, path: &str) -> Self {
        self.search_path = if path.starts_with('/') {
            path.to_owned()
        } else {
            format!("/{path}")
        };
        self
    }

    pub fn with_table_selector(mut self, selector: &str) -> Self {
        selector.clone_into(&mut self.table_selector);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn search_url(&self, jurisdiction: &Jurisdiction) -> String {
        format!(
            "{}{}?state={}",
            self.base_url,
            self.search_path,
            urlencoding::encode(jurisdiction.as_str())
        )
    }

    async fn scrape(&self, jurisdiction: &Jurisdiction) -> Result<Vec<RawFiling>, SourceError> {
        let mut request =
            HttpRequest::get(self.search_url(jurisdiction)).with_header("accept", "text/html");
        if let Some(timeout) = self.timeout {
            request = request.with_timeout(timeout);
        }

        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            return Err(SourceError::from_status(
                response.status,
                format!(
                    "{} returned status {} for state {jurisdiction}",
                    self.name, response.status
                ),
            ));
        }

        parse_filings_table(&response.body, &self.table_selector)
    }
}

impl SourceAdapter for PortalAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Portal
    }

    fn fetch<'a>(&'a self, jurisdiction: &'a Jurisdiction) -> FetchFuture<'a> {
        Box::pin(self.scrape(jurisdiction))
    }
}

/// Extract filings from the first table matching `table_selector`.
///
/// A page without a results table yields no filings.
pub fn parse_filings_table(
    body: &str,
    table_selector: &str,
) -> Result<Vec<RawFiling>, SourceError> {
    let document = Html::parse_document(body);
    let table_sel = parse_selector(table_selector)?;
    let Some(table) = document.select(&table_sel).next() else {
        return Ok(Vec::new());
    };

    let mut headers: Vec<String> = table
        .select(&parse_selector("thead tr th, thead tr td")?)
        .map(cell_text)
        .collect();
    if headers.is_empty() {
        headers = table
            .select(&parse_selector("tr th")?)
            .map(cell_text)
            .collect();
    }
    if headers.is_empty() {
        return Err(SourceError::validation(
            "results table has no header cells",
        ));
    }

    let columns: Vec<Option<Column>> = headers.iter().map(|h| Column::from_header(h)).collect();
    let cell_sel = parse_selector("td")?;

    let filings = table
        .select(&parse_selector("tr")?)
        .filter_map(|row| {
            let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
            if cells.iter().all(String::is_empty) {
                return None;
            }
            let mut filing = RawFiling::default();
            for (column, value) in columns.iter().zip(cells) {
                if let Some(column) = column {
                    column.assign(&mut filing, value);
                }
            }
            Some(filing)
        })
        .collect();

    Ok(filings)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    FilingNumber,
    FilingDate,
    Debtor,
    SecuredParty,
    Jurisdiction,
    Amount,
    Status,
    FilingType,
}

impl Column {
    fn from_header(header: &str) -> Option<Self> {
        let key: String = header
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|ch| ch.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "filingnumber" | "filingno" | "filenumber" | "fileno" | "number" => {
                Some(Self::FilingNumber)
            }
            "filingdate" | "filedate" | "date" => Some(Self::FilingDate),
            "debtor" | "debtorname" => Some(Self::Debtor),
            "securedparty" | "securedpartyname" | "creditor" => Some(Self::SecuredParty),
            "state" | "jurisdiction" => Some(Self::Jurisdiction),
            "amount" | "lienamount" => Some(Self::Amount),
            "status" => Some(Self::Status),
            "type" | "filingtype" => Some(Self::FilingType),
            _ => None,
        }
    }

    fn assign(self, filing: &mut RawFiling, value: String) {
        if value.is_empty() {
            return;
        }
        match self {
            Self::FilingNumber => filing.filing_number = Some(value),
            Self::FilingDate => filing.filing_date = Some(value),
            Self::Debtor => filing.debtor_name = Some(value),
            Self::SecuredParty => filing.secured_party_name = Some(value),
            Self::Jurisdiction => filing.jurisdiction = Some(value),
            Self::Amount => filing.lien_amount = Some(RawAmount::Text(value)),
            Self::Status => filing.status = Some(value),
            Self::FilingType => filing.filing_type = Some(value),
        }
    }
}

fn cell_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_selector(selector: &str) -> Result<Selector, SourceError> {
    Selector::parse(selector)
        .map_err(|e| SourceError::fatal(format!("invalid CSS selector '{selector}': {e}")))
}
