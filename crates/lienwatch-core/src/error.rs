use thiserror::Error;

/// Validation errors raised while normalizing raw filing records and codes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("jurisdiction cannot be empty")]
    EmptyJurisdiction,
    #[error("jurisdiction length {len} exceeds max {max}")]
    JurisdictionTooLong { len: usize, max: usize },
    #[error("jurisdiction contains invalid character '{ch}' at index {index}")]
    JurisdictionInvalidChar { ch: char, index: usize },

    #[error("source name cannot be empty")]
    EmptySourceName,

    #[error("filing field '{field}' is required")]
    MissingField { field: &'static str },
    #[error("filing date must be YYYY-MM-DD: '{value}'")]
    InvalidFilingDate { value: String },
    #[error("invalid filing status '{value}', expected one of active, terminated, lapsed")]
    InvalidFilingStatus { value: String },
    #[error("invalid filing type '{value}', expected one of ucc1, ucc3")]
    InvalidFilingType { value: String },
    #[error("lien amount must be a finite, non-negative number: '{value}'")]
    InvalidLienAmount { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("invalid source kind '{value}', expected one of api, portal, database")]
    InvalidSourceKind { value: String },
}

/// Configuration errors. These are programmer errors and abort construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one source must be configured")]
    NoSources,
    #[error("source '{name}' is configured more than once")]
    DuplicateSource { name: String },
    #[error("source '{name}' must allow at least one request per minute")]
    ZeroRateLimit { name: String },
    #[error("source '{name}' is missing connection parameter '{key}'")]
    MissingConnectionParam { name: String, key: &'static str },
    #[error("source '{name}' has invalid connection parameter '{key}': '{value}'")]
    InvalidConnectionParam {
        name: String,
        key: &'static str,
        value: String,
    },
    #[error("source '{name}' references environment variable '{var}', which is not set")]
    UnsetEnvVar { name: String, var: String },
    #[error("source '{name}' has kind '{kind}' which this builder cannot construct")]
    UnsupportedSourceKind { name: String, kind: String },
    #[error("retry attempts must be at least 1")]
    ZeroRetryAttempts,
    #[error("circuit breaker failure threshold must be at least 1")]
    ZeroFailureThreshold,
    #[error("interval '{field}' must be greater than zero")]
    ZeroInterval { field: &'static str },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read config file '{path}': {source}")]
    ConfigRead {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
