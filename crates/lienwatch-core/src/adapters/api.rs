use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::data_source::{FetchFuture, SourceAdapter, SourceError};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::{ConfigError, Jurisdiction, RawFiling, SourceConfig, SourceKind};

/// Remote filing API adapter.
///
/// Issues `GET {base_url}/filings?jurisdiction={code}` and accepts either a
/// bare JSON array of filings or an object wrapping it under `filings`.
#[derive(Clone)]
pub struct ApiAdapter {
    name: String,
    base_url: String,
    auth: HttpAuth,
    timeout: Option<Duration>,
    http_client: Arc<dyn HttpClient>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FilingsPayload {
    List(Vec<RawFiling>),
    Wrapped { filings: Vec<RawFiling> },
}

impl ApiAdapter {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        http_client: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            auth: HttpAuth::None,
            timeout: None,
            http_client,
        }
    }

    /// Build from a source config. Requires `base_url`; `api_key` is optional.
    pub fn from_config(
        config: &SourceConfig,
        http_client: Arc<dyn HttpClient>,
    ) -> Result<Self, ConfigError> {
        let base_url = config.require_param("base_url")?;
        let adapter = Self::new(config.name.clone(), base_url, http_client);
        Ok(match config.param("api_key") {
            Some(key) => adapter.with_auth(HttpAuth::BearerToken(key.to_owned())),
            None => adapter,
        })
    }

    pub fn with_auth(mut self, auth: HttpAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn filings_url(&self, jurisdiction: &Jurisdiction) -> String {
        format!(
            "{}/filings?jurisdiction={}",
            self.base_url,
            urlencoding::encode(jurisdiction.as_str())
        )
    }

    async fn fetch_filings(
        &self,
        jurisdiction: &Jurisdiction,
    ) -> Result<Vec<RawFiling>, SourceError> {
        let mut request = HttpRequest::get(self.filings_url(jurisdiction))
            .with_header("accept", "application/json")
            .with_auth(&self.auth);
        if let Some(timeout) = self.timeout {
            request = request.with_timeout(timeout);
        }

        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            return Err(SourceError::from_status(
                response.status,
                format!(
                    "{} returned status {} for jurisdiction {jurisdiction}",
                    self.name, response.status
                ),
            ));
        }

        parse_filings_payload(&response.body)
    }
}

fn parse_filings_payload(body: &str) -> Result<Vec<RawFiling>, SourceError> {
    let payload: FilingsPayload = serde_json::from_str(body)
        .map_err(|error| SourceError::validation(format!("malformed filings payload: {error}")))?;
    Ok(match payload {
        FilingsPayload::List(filings) | FilingsPayload::Wrapped { filings } => filings,
    })
}

impl SourceAdapter for ApiAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Api
    }

    fn fetch<'a>(&'a self, jurisdiction: &'a Jurisdiction) -> FetchFuture<'a> {
        Box::pin(self.fetch_filings(jurisdiction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::ScriptedHttpClient;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::{HttpError, HttpResponse};

    fn adapter(client: Arc<ScriptedHttpClient>) -> ApiAdapter {
        let config = SourceConfig::new("tx-api", SourceKind::Api, 60)
            .with_param("base_url", "https://filings.example.test/v1/")
            .with_param("api_key", "secret");
        ApiAdapter::from_config(&config, client).expect("valid config")
    }

    fn tx() -> Jurisdiction {
        Jurisdiction::parse("TX").expect("valid")
    }

    #[tokio::test]
    async fn sends_authenticated_request_and_parses_array() {
        let client = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::ok(
            r#"[{"filingNumber":"TX-1","filingDate":"2020-01-01","debtorName":"Acme",
                 "securedPartyName":"Bank"}]"#,
        ))]));
        let adapter = adapter(client.clone());

        let filings = adapter.fetch(&tx()).await.expect("fetch succeeds");

        assert_eq!(filings.len(), 1);
        assert_eq!(filings[0].filing_number.as_deref(), Some("TX-1"));
        let request = client.requests().pop().expect("one request");
        assert_eq!(
            request.url,
            "https://filings.example.test/v1/filings?jurisdiction=TX"
        );
        assert_eq!(
            request.headers.get("authorization").map(String::as_str),
            Some("Bearer secret")
        );
    }

    #[tokio::test]
    async fn accepts_wrapped_payload() {
        let client = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::ok(
            r#"{"filings":[{"debtor":"Beta"},{"debtor":"Gamma"}]}"#,
        ))]));

        let filings = adapter(client).fetch(&tx()).await.expect("fetch succeeds");
        assert_eq!(filings.len(), 2);
    }

    #[tokio::test]
    async fn maps_statuses_and_transport_errors() {
        let client = Arc::new(ScriptedHttpClient::new(vec![
            Ok(HttpResponse::new(401, "")),
            Ok(HttpResponse::new(404, "")),
            Ok(HttpResponse::new(429, "")),
            Ok(HttpResponse::new(502, "")),
            Err(HttpError::new("connection reset")),
            Ok(HttpResponse::ok("<html>")),
        ]));
        let adapter = adapter(client);

        let mut kinds = Vec::new();
        for _ in 0..6 {
            kinds.push(adapter.fetch(&tx()).await.expect_err("fails").kind());
        }

        assert_eq!(
            kinds,
            vec![
                SourceErrorKind::InvalidCredentials,
                SourceErrorKind::Fatal,
                SourceErrorKind::RateLimited,
                SourceErrorKind::Transient,
                SourceErrorKind::Transient,
                SourceErrorKind::Validation,
            ]
        );
    }

    #[test]
    fn missing_base_url_is_a_config_error() {
        let config = SourceConfig::new("tx-api", SourceKind::Api, 60);
        let error = ApiAdapter::from_config(&config, Arc::new(ScriptedHttpClient::new(Vec::new())))
            .err()
            .expect("must fail");
        assert!(matches!(
            error,
            ConfigError::MissingConnectionParam { key: "base_url", .. }
        ));
    }
}
