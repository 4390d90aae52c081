//! Built-in source adapters.
//!
//! | Adapter | Kind | Transport |
//! |---------|------|-----------|
//! | [`ApiAdapter`] | `api` | JSON over [`HttpClient`] |
//! | [`PortalAdapter`] | `portal` | HTML table scrape over [`HttpClient`] |
//!
//! Database mirrors are served by the warehouse crate.

mod api;
mod portal;

use std::sync::Arc;
use std::time::Duration;

pub use api::ApiAdapter;
pub use portal::{parse_filings_table, PortalAdapter};

use crate::data_source::SourceAdapter;
use crate::http_client::HttpClient;
use crate::{ConfigError, SourceConfig, SourceKind};

/// Construct the HTTP-backed adapter for `config`. Every request it sends is
/// bounded by `request_timeout` at the transport.
///
/// # Errors
///
/// Fails on missing connection parameters, or with
/// [`ConfigError::UnsupportedSourceKind`] for `database` sources.
pub fn build_adapter(
    config: &SourceConfig,
    http_client: Arc<dyn HttpClient>,
    request_timeout: Duration,
) -> Result<Arc<dyn SourceAdapter>, ConfigError> {
    match config.kind {
        SourceKind::Api => Ok(Arc::new(
            ApiAdapter::from_config(config, http_client)?.with_timeout(request_timeout),
        )),
        SourceKind::Portal => Ok(Arc::new(
            PortalAdapter::from_config(config, http_client)?.with_timeout(request_timeout),
        )),
        SourceKind::Database => Err(ConfigError::UnsupportedSourceKind {
            name: config.name.clone(),
            kind: config.kind.to_string(),
        }),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};

    /// Replays canned responses in order and records every request.
    pub struct ScriptedHttpClient {
        responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        pub fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().expect("requests lock").clone()
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests.lock().expect("requests lock").push(request);
            let next = self
                .responses
                .lock()
                .expect("responses lock")
                .pop_front()
                .unwrap_or_else(|| Err(HttpError::non_retryable("script exhausted")));
            Box::pin(async move { next })
        }
    }
}
