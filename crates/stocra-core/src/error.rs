//! Error taxonomy for the Stocra client.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::request::RequestError;

/// HTTP status codes the client gives special meaning to.
pub mod status {
    pub const NOT_FOUND: u16 = 404;
    pub const TOO_MANY_REQUESTS: u16 = 429;
    pub const BAD_GATEWAY: u16 = 502;
    pub const SERVICE_UNAVAILABLE: u16 = 503;
}

/// A non-2xx response returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpStatusError {
    pub status: u16,
    /// Response headers, keyed by lower-cased name.
    pub headers: BTreeMap<String, String>,
    /// Leading part of the response body, for diagnostics.
    pub body: String,
}

impl HttpStatusError {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: String::new(),
        }
    }

    /// Attach a header. Names are stored lower-cased.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// `Retry-After` in whole seconds, if present and numeric.
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.header("retry-after")?.trim().parse().ok()
    }
}

impl std::fmt::Display for HttpStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.body.is_empty() {
            write!(f, "HTTP {}", self.status)
        } else {
            write!(f, "HTTP {}: {}", self.status, self.body)
        }
    }
}

/// Failures raised by an [`HttpClient`](crate::transport::HttpClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Could not reach the service (DNS, refused, reset, TLS).
    #[error("connection error: {0}")]
    Connection(String),

    /// Client-side connect or read timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The service answered with a non-success status.
    #[error("{0}")]
    Status(HttpStatusError),

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// HTTP status code, if the failure carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status(e) => Some(e.status),
            _ => None,
        }
    }

    /// Returns `true` for an HTTP 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(status::NOT_FOUND)
    }
}

impl From<HttpStatusError> for TransportError {
    fn from(e: HttpStatusError) -> Self {
        Self::Status(e)
    }
}

/// Top-level error surfaced to callers of the client and its streams.
#[derive(Debug, Error)]
pub enum StocraError {
    /// A transport failure the retry chain did not (or could no longer) absorb.
    #[error("{0}")]
    Request(RequestError),

    /// The response body did not match the expected schema.
    #[error("failed to decode response of '{endpoint}': {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid configuration, detected before any I/O.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The contract address is not in the blockchain's token table.
    #[error("unknown token {contract_address} on {blockchain}")]
    UnknownToken {
        blockchain: String,
        contract_address: String,
    },

    /// The operation was cancelled because its stream was dropped or the
    /// client was closed.
    #[error("operation cancelled")]
    Cancelled,

    /// The client has been closed.
    #[error("client is closed")]
    Closed,

    /// A background fetch task panicked or was aborted.
    #[error("fetch task failed: {0}")]
    Task(String),
}

impl StocraError {
    /// The underlying transport failure, if any.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::Request(e) => Some(&e.error),
            _ => None,
        }
    }

    /// HTTP status code of the underlying transport failure, if any.
    pub fn status(&self) -> Option<u16> {
        self.transport().and_then(TransportError::status)
    }

    /// Returns `true` if the service reported 404 for the request.
    pub fn is_not_found(&self) -> bool {
        self.transport().is_some_and(TransportError::is_not_found)
    }

    /// Returns `true` for errors that are caused by bad input or bad data and
    /// will fail again on retry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. } | Self::Config(_) | Self::UnknownToken { .. }
        )
    }
}
