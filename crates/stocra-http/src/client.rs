//! HTTPS transport backed by `reqwest`.
//!
//! Retries, backoff and admission control live above this layer; a request
//! here is one attempt.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::redirect::Policy;

use stocra_core::config::ClientConfig;
use stocra_core::error::{HttpStatusError, StocraError, TransportError};
use stocra_core::transport::HttpClient;

/// Longest body excerpt kept on a non-2xx response.
const MAX_BODY_EXCERPT: usize = 512;

/// `reqwest` implementation of [`HttpClient`].
///
/// [`HttpClient::close`] drops the connection pool; later requests fail
/// with [`TransportError::Other`].
pub struct HttpTransport {
    config: ClientConfig,
    http: RwLock<Option<reqwest::Client>>,
}

impl HttpTransport {
    /// Build a transport for `config`.
    ///
    /// Fails with [`StocraError::Config`] if the API key is not a valid
    /// header value or the TLS backend cannot be initialised.
    pub fn new(config: ClientConfig) -> Result<Self, StocraError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| StocraError::Config(format!("invalid api key: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = reqwest::Client::builder()
            .redirect(Policy::none())
            .default_headers(headers);
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.read_timeout() {
            builder = builder.read_timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| StocraError::Config(format!("failed to build http client: {e}")))?;

        Ok(Self {
            config,
            http: RwLock::new(Some(http)),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.http
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn client(&self) -> Result<reqwest::Client, TransportError> {
        self.http
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| TransportError::Other("transport is closed".into()))
    }
}

#[async_trait]
impl HttpClient for HttpTransport {
    async fn get(&self, blockchain: &str, endpoint: &str) -> Result<Vec<u8>, TransportError> {
        let url = self.config.endpoint_url(blockchain, endpoint);
        tracing::trace!(%url, "sending request");

        let response = self.client()?.get(&url).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await.map_err(map_reqwest_error)?;
            return Ok(body.to_vec());
        }

        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status.as_u16(), &headers, &body).into())
    }

    async fn close(&self) {
        let pool = self.http.write().unwrap_or_else(PoisonError::into_inner).take();
        if pool.is_some() {
            tracing::debug!(host = %self.config.host, "http transport closed");
        }
    }

    fn name(&self) -> &str {
        "reqwest"
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::Connection(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

/// Capture a non-2xx response. Non-UTF-8 header values are dropped.
pub(crate) fn status_error(status: u16, headers: &HeaderMap, body: &str) -> HttpStatusError {
    let mut error = HttpStatusError::new(status);
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            error = error.with_header(name.as_str(), value);
        }
    }
    error.with_body(body.chars().take(MAX_BODY_EXCERPT).collect::<String>())
}
