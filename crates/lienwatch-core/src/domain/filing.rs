use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{FilingDate, Jurisdiction, ValidationError};

/// Lifecycle status of a recorded filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilingStatus {
    Active,
    Terminated,
    Lapsed,
}

impl FilingStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Terminated => "terminated",
            Self::Lapsed => "lapsed",
        }
    }
}

impl Display for FilingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilingStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" | "open" => Ok(Self::Active),
            "terminated" | "released" => Ok(Self::Terminated),
            "lapsed" | "expired" => Ok(Self::Lapsed),
            other => Err(ValidationError::InvalidFilingStatus {
                value: other.to_owned(),
            }),
        }
    }
}

/// Filing category: an initial financing statement or an amendment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilingType {
    Ucc1,
    Ucc3,
}

impl FilingType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ucc1 => "ucc1",
            Self::Ucc3 => "ucc3",
        }
    }
}

impl Display for FilingType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilingType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let compact = value
            .trim()
            .to_ascii_lowercase()
            .replace(['-', ' ', '_'], "");
        match compact.as_str() {
            "ucc1" | "financingstatement" | "initial" => Ok(Self::Ucc1),
            "ucc3" | "amendment" => Ok(Self::Ucc3),
            _ => Err(ValidationError::InvalidFilingType {
                value: value.trim().to_owned(),
            }),
        }
    }
}

/// Lien amount as delivered by a source: JSON number or formatted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
}

impl RawAmount {
    fn parse(&self) -> Result<Option<f64>, ValidationError> {
        let value = match self {
            Self::Number(value) => *value,
            Self::Text(text) => {
                let cleaned: String = text
                    .trim()
                    .chars()
                    .filter(|ch| !matches!(ch, '$' | ',' | ' '))
                    .collect();
                if cleaned.is_empty() {
                    return Ok(None);
                }
                cleaned
                    .parse::<f64>()
                    .map_err(|_| ValidationError::InvalidLienAmount {
                        value: text.clone(),
                    })?
            }
        };

        if !value.is_finite() || value < 0.0 {
            return Err(ValidationError::InvalidLienAmount {
                value: value.to_string(),
            });
        }
        Ok(Some(value))
    }
}

/// Loosely typed filing record returned by a source adapter.
///
/// Every field is optional; [`Filing::from_raw`] decides what is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFiling {
    #[serde(default, alias = "filingNumber", alias = "file_number")]
    pub filing_number: Option<String>,
    #[serde(default, alias = "filingDate", alias = "file_date")]
    pub filing_date: Option<String>,
    #[serde(default, alias = "debtorName", alias = "debtor")]
    pub debtor_name: Option<String>,
    #[serde(default, alias = "securedPartyName", alias = "secured_party")]
    pub secured_party_name: Option<String>,
    #[serde(default, alias = "state")]
    pub jurisdiction: Option<String>,
    #[serde(default, alias = "lienAmount", alias = "amount")]
    pub lien_amount: Option<RawAmount>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "filingType", alias = "type")]
    pub filing_type: Option<String>,
}

/// Canonical secured-lending filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filing {
    pub id: String,
    pub filing_number: Option<String>,
    pub filing_date: FilingDate,
    pub debtor_name: String,
    pub secured_party_name: String,
    pub jurisdiction: Jurisdiction,
    pub lien_amount: Option<f64>,
    pub status: FilingStatus,
    pub filing_type: FilingType,
    pub source: String,
}

/// Dedup identity of a filing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilingIdentity {
    Number {
        jurisdiction: Jurisdiction,
        filing_number: String,
    },
    Derived {
        jurisdiction: Jurisdiction,
        debtor: String,
        filing_date: FilingDate,
    },
}

impl Filing {
    /// Validate a raw adapter record into a canonical filing.
    ///
    /// `fallback_jurisdiction` is the jurisdiction the adapter was queried
    /// with; it is used when the record does not carry its own.
    pub fn from_raw(
        raw: RawFiling,
        source: &str,
        fallback_jurisdiction: &Jurisdiction,
    ) -> Result<Self, ValidationError> {
        let debtor_name = required(raw.debtor_name, "debtor_name")?;
        let secured_party_name = required(raw.secured_party_name, "secured_party_name")?;
        let filing_date = FilingDate::parse(&required(raw.filing_date, "filing_date")?)?;

        let jurisdiction = match non_blank(raw.jurisdiction) {
            Some(code) => Jurisdiction::parse(&code)?,
            None => fallback_jurisdiction.clone(),
        };

        let status = match non_blank(raw.status) {
            Some(status) => status.parse()?,
            None => FilingStatus::Active,
        };
        let filing_type = match non_blank(raw.filing_type) {
            Some(kind) => kind.parse()?,
            None => FilingType::Ucc1,
        };
        let lien_amount = match raw.lien_amount {
            Some(amount) => amount.parse()?,
            None => None,
        };

        let filing_number = non_blank(raw.filing_number);
        let id = match &filing_number {
            Some(number) => format!("{jurisdiction}-{}", number.to_ascii_uppercase()),
            None => derived_id(&jurisdiction, &debtor_name, filing_date),
        };

        Ok(Self {
            id,
            filing_number,
            filing_date,
            debtor_name,
            secured_party_name,
            jurisdiction,
            lien_amount,
            status,
            filing_type,
            source: source.to_owned(),
        })
    }

    pub fn identity(&self) -> FilingIdentity {
        match &self.filing_number {
            Some(number) => FilingIdentity::Number {
                jurisdiction: self.jurisdiction.clone(),
                filing_number: number.trim().to_ascii_uppercase(),
            },
            None => FilingIdentity::Derived {
                jurisdiction: self.jurisdiction.clone(),
                debtor: normalize_name(&self.debtor_name),
                filing_date: self.filing_date,
            },
        }
    }

    /// Whole days between the filing date and `today`.
    pub fn age_days(&self, today: FilingDate) -> i64 {
        self.filing_date.days_until(today)
    }
}

/// Lowercase, collapse every run of non-alphanumerics to one space, trim.
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut pending_space = false;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !normalized.is_empty() {
                normalized.push(' ');
            }
            pending_space = false;
            normalized.extend(ch.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    normalized
}

fn derived_id(jurisdiction: &Jurisdiction, debtor_name: &str, filing_date: FilingDate) -> String {
    format!(
        "{jurisdiction}-{filing_date}-{}",
        normalize_name(debtor_name).replace(' ', "-")
    )
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    non_blank(value).ok_or(ValidationError::MissingField { field })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ca() -> Jurisdiction {
        Jurisdiction::parse("CA").expect("valid")
    }

    fn raw() -> RawFiling {
        RawFiling {
            filing_number: None,
            filing_date: Some(String::from("2020-05-01")),
            debtor_name: Some(String::from("Acme Widgets, Inc.")),
            secured_party_name: Some(String::from("First Lending Bank")),
            jurisdiction: None,
            lien_amount: Some(RawAmount::Text(String::from("$12,500.00"))),
            status: Some(String::from("Lapsed")),
            filing_type: Some(String::from("UCC-1")),
        }
    }

    #[test]
    fn normalizes_raw_record() {
        let filing = Filing::from_raw(raw(), "ca-portal", &ca()).expect("valid record");

        assert_eq!(filing.jurisdiction, ca());
        assert_eq!(filing.status, FilingStatus::Lapsed);
        assert_eq!(filing.filing_type, FilingType::Ucc1);
        assert_eq!(filing.lien_amount, Some(12_500.0));
        assert_eq!(filing.id, "CA-2020-05-01-acme-widgets-inc");
        assert_eq!(filing.source, "ca-portal");
    }

    #[test]
    fn missing_debtor_is_a_validation_error() {
        let mut record = raw();
        record.debtor_name = Some(String::from("   "));

        let error = Filing::from_raw(record, "api", &ca()).expect_err("must fail");
        assert_eq!(error, ValidationError::MissingField { field: "debtor_name" });
    }

    #[test]
    fn unknown_status_is_rejected() {
        let mut record = raw();
        record.status = Some(String::from("pending-review"));

        let error = Filing::from_raw(record, "api", &ca()).expect_err("must fail");
        assert!(matches!(error, ValidationError::InvalidFilingStatus { .. }));
    }

    #[test]
    fn identity_prefers_filing_number() {
        let mut record = raw();
        record.filing_number = Some(String::from("ca-2020-0001"));
        let numbered = Filing::from_raw(record, "api", &ca()).expect("valid");

        assert_eq!(
            numbered.identity(),
            FilingIdentity::Number {
                jurisdiction: ca(),
                filing_number: String::from("CA-2020-0001"),
            }
        );
    }

    #[test]
    fn derived_identity_ignores_punctuation_and_case() {
        let first = Filing::from_raw(raw(), "api", &ca()).expect("valid");
        let mut record = raw();
        record.debtor_name = Some(String::from("ACME  WIDGETS INC"));
        let second = Filing::from_raw(record, "portal", &ca()).expect("valid");

        assert_eq!(first.identity(), second.identity());
    }

    #[test]
    fn raw_filing_accepts_camel_case_and_numeric_amounts() {
        let raw: RawFiling = serde_json::from_str(
            r#"{"filingNumber":"2021-77","filingDate":"2021-01-02","debtorName":"Beta LLC",
                "securedPartyName":"Capital One","state":"ny","lienAmount":1500,"type":"ucc3"}"#,
        )
        .expect("valid json");

        let filing = Filing::from_raw(raw, "api", &ca()).expect("valid");
        assert_eq!(filing.jurisdiction.as_str(), "NY");
        assert_eq!(filing.lien_amount, Some(1500.0));
        assert_eq!(filing.filing_type, FilingType::Ucc3);
        assert_eq!(filing.status, FilingStatus::Active);
    }

    #[test]
    fn normalize_name_collapses_separators() {
        assert_eq!(normalize_name("  O'Brien & Sons, L.L.C. "), "o brien sons l l c");
        assert_eq!(normalize_name(""), "");
    }
}
