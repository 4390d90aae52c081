//! Source adapter trait and adapter-level error classification.
//!
//! Every external origin of filings (remote API, portal scraper, mirrored
//! database) is wrapped in a [`SourceAdapter`]. Adapters are black boxes to the
//! ingestion engine: they return raw records or a classified [`SourceError`],
//! and the engine decides from [`SourceError::retryable`] whether another
//! attempt is worth making.
//!
//! # Error classes
//!
//! | Kind | Retryable | Typical cause |
//! |------|-----------|---------------|
//! | [`Transient`](SourceErrorKind::Transient) | yes | network failure, 5xx |
//! | [`Timeout`](SourceErrorKind::Timeout) | yes | request exceeded its deadline |
//! | [`RateLimited`](SourceErrorKind::RateLimited) | yes | 429 from upstream |
//! | [`Fatal`](SourceErrorKind::Fatal) | no | 4xx other than 429 |
//! | [`InvalidCredentials`](SourceErrorKind::InvalidCredentials) | no | 401 / 403 |
//! | [`Validation`](SourceErrorKind::Validation) | no | malformed payload |
//! | [`CircuitOpen`](SourceErrorKind::CircuitOpen) | no | breaker short-circuited the call |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::http_client::HttpError;
use crate::{Jurisdiction, RawFiling, SourceKind};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceErrorKind {
    Validation,
    Transient,
    Timeout,
    RateLimited,
    Fatal,
    InvalidCredentials,
    CircuitOpen,
}

impl SourceErrorKind {
    pub const fn retryable(self) -> bool {
        matches!(self, Self::Transient | Self::Timeout | Self::RateLimited)
    }
}

/// Structured source error captured into ingestion results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    status: Option<u16>,
}

impl SourceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Validation, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Transient, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Timeout, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::RateLimited, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Fatal, message)
    }

    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::InvalidCredentials, message)
    }

    pub fn circuit_open(source: &str) -> Self {
        Self::new(
            SourceErrorKind::CircuitOpen,
            format!("circuit breaker for source '{source}' is open"),
        )
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            401 | 403 => SourceErrorKind::InvalidCredentials,
            429 => SourceErrorKind::RateLimited,
            400..=499 => SourceErrorKind::Fatal,
            _ => SourceErrorKind::Transient,
        };
        Self {
            kind,
            message: message.into(),
            status: Some(status),
        }
    }

    fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    pub const fn retryable(&self) -> bool {
        self.kind.retryable()
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Validation => "source.validation",
            SourceErrorKind::Transient => "source.transient",
            SourceErrorKind::Timeout => "source.timeout",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::Fatal => "source.fatal",
            SourceErrorKind::InvalidCredentials => "source.invalid_credentials",
            SourceErrorKind::CircuitOpen => "source.circuit_open",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<HttpError> for SourceError {
    fn from(error: HttpError) -> Self {
        if error.is_timeout() {
            Self::timeout(error.message())
        } else if error.retryable() {
            Self::transient(error.message())
        } else {
            Self::fatal(error.message())
        }
    }
}

/// Boxed future returned by [`SourceAdapter::fetch`].
pub type FetchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<RawFiling>, SourceError>> + Send + 'a>>;

/// Source adapter contract.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use lienwatch_core::{FetchFuture, Jurisdiction, SourceAdapter, SourceKind};
///
/// struct FixtureAdapter;
///
/// impl SourceAdapter for FixtureAdapter {
///     fn name(&self) -> &str {
///         "fixture"
///     }
///
///     fn kind(&self) -> SourceKind {
///         SourceKind::Api
///     }
///
///     fn fetch<'a>(&'a self, _jurisdiction: &'a Jurisdiction) -> FetchFuture<'a> {
///         Box::pin(async { Ok(Vec::new()) })
///     }
/// }
/// ```
///
/// Implementations must be `Send + Sync`; one adapter instance is shared by
/// every concurrent jurisdiction request against its source.
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> SourceKind;

    /// Fetch raw filing records for one jurisdiction.
    ///
    /// # Errors
    ///
    /// Returns a classified [`SourceError`]; the caller decides whether to
    /// retry based on [`SourceError::retryable`].
    fn fetch<'a>(&'a self, jurisdiction: &'a Jurisdiction) -> FetchFuture<'a>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_http_statuses() {
        assert_eq!(
            SourceError::from_status(401, "denied").kind(),
            SourceErrorKind::InvalidCredentials
        );
        assert_eq!(
            SourceError::from_status(403, "denied").kind(),
            SourceErrorKind::InvalidCredentials
        );
        assert_eq!(
            SourceError::from_status(429, "slow down").kind(),
            SourceErrorKind::RateLimited
        );
        assert_eq!(
            SourceError::from_status(404, "missing").kind(),
            SourceErrorKind::Fatal
        );
        assert_eq!(
            SourceError::from_status(503, "unavailable").kind(),
            SourceErrorKind::Transient
        );
    }

    #[test]
    fn only_transient_classes_are_retryable() {
        assert!(SourceError::from_status(500, "boom").retryable());
        assert!(SourceError::from_status(429, "slow").retryable());
        assert!(SourceError::timeout("late").retryable());
        assert!(!SourceError::from_status(404, "missing").retryable());
        assert!(!SourceError::validation("bad payload").retryable());
        assert!(!SourceError::circuit_open("tx-api").retryable());
    }

    #[test]
    fn http_errors_map_to_source_errors() {
        assert_eq!(
            SourceError::from(HttpError::timeout("deadline")).kind(),
            SourceErrorKind::Timeout
        );
        assert_eq!(
            SourceError::from(HttpError::new("reset")).kind(),
            SourceErrorKind::Transient
        );
        assert_eq!(
            SourceError::from(HttpError::non_retryable("bad url")).kind(),
            SourceErrorKind::Fatal
        );
    }

    #[test]
    fn display_includes_code() {
        let error = SourceError::from_status(404, "no such jurisdiction");
        assert_eq!(error.to_string(), "no such jurisdiction (source.fatal)");
        assert_eq!(error.status(), Some(404));
    }
}
