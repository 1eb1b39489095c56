//! The `HttpClient` trait, the transport seam of the client.

use async_trait::async_trait;

use crate::error::TransportError;

/// Issues GET requests against the indexing service.
///
/// Implementations return the raw response body of a 2xx response and map
/// everything else to a [`TransportError`]. They must not retry: retrying is
/// the fetcher's job.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` for use across Tokio tasks and are
/// stored as `Arc<dyn HttpClient>`.
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    /// GET `{blockchain}`'s `endpoint` (e.g. `blocks/latest`).
    async fn get(&self, blockchain: &str, endpoint: &str) -> Result<Vec<u8>, TransportError>;

    /// Release pooled connections. Default: nothing to release.
    async fn close(&self) {}

    /// Human-readable identifier used in logs.
    fn name(&self) -> &str {
        "http"
    }
}
