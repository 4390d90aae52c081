use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, ValidationError};

/// Adapter family a source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Api,
    Portal,
    Database,
}

impl SourceKind {
    pub const ALL: [Self; 3] = [Self::Api, Self::Portal, Self::Database];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Portal => "portal",
            Self::Database => "database",
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(Self::Api),
            "portal" => Ok(Self::Portal),
            "database" | "db" => Ok(Self::Database),
            other => Err(ValidationError::InvalidSourceKind {
                value: other.to_owned(),
            }),
        }
    }
}

/// Configuration of one external data origin.
///
/// `connection` holds adapter-specific parameters (base URL, API key, mirror
/// path, ...) and is never inspected by the ingestion engine itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    #[serde(default)]
    pub connection: BTreeMap<String, String>,
    pub requests_per_minute: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl SourceConfig {
    pub fn new(name: impl Into<String>, kind: SourceKind, requests_per_minute: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            connection: BTreeMap::new(),
            requests_per_minute,
            enabled: true,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.connection.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.connection
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn require_param(&self, key: &'static str) -> Result<&str, ConfigError> {
        self.param(key).ok_or_else(|| ConfigError::MissingConnectionParam {
            name: self.name.clone(),
            key,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptySourceName.into());
        }
        if self.requests_per_minute == 0 {
            return Err(ConfigError::ZeroRateLimit {
                name: self.name.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kind_case_insensitively() {
        assert_eq!("API".parse::<SourceKind>(), Ok(SourceKind::Api));
        assert_eq!(" db ".parse::<SourceKind>(), Ok(SourceKind::Database));
        assert!("ftp".parse::<SourceKind>().is_err());
    }

    #[test]
    fn blank_params_count_as_missing() {
        let config = SourceConfig::new("tx-api", SourceKind::Api, 30).with_param("base_url", "  ");

        assert_eq!(config.param("base_url"), None);
        assert_eq!(
            config.require_param("base_url"),
            Err(ConfigError::MissingConnectionParam {
                name: String::from("tx-api"),
                key: "base_url",
            })
        );
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let config = SourceConfig::new("tx-api", SourceKind::Api, 0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroRateLimit { .. })
        ));
    }
}
