//! Bounded fetcher: admission control plus the retry loop.
//!
//! Every request of the client, streaming included, goes through
//! [`Fetcher::fetch`] or [`Fetcher::fetch_optional`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::{Semaphore, SemaphorePermit};

use stocra_core::error::{StocraError, TransportError};
use stocra_core::policy::RetryPolicyChain;
use stocra_core::request::RequestError;
use stocra_core::transport::HttpClient;

/// Wraps an [`HttpClient`] with a concurrency limit and a retry policy chain.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn HttpClient>,
    policies: Arc<RetryPolicyChain>,
    admission: Option<Arc<Semaphore>>,
    max_in_flight: Option<usize>,
    closed: Arc<AtomicBool>,
}

impl Fetcher {
    /// `max_in_flight = None` leaves concurrency unbounded.
    pub fn new(
        transport: Arc<dyn HttpClient>,
        policies: RetryPolicyChain,
        max_in_flight: Option<usize>,
    ) -> Self {
        Self {
            transport,
            policies: Arc::new(policies),
            admission: max_in_flight.map(|n| Arc::new(Semaphore::new(n))),
            max_in_flight,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Configured concurrency limit.
    pub fn max_in_flight(&self) -> Option<usize> {
        self.max_in_flight
    }

    /// Free admission slots, or `None` when unbounded.
    pub fn available_permits(&self) -> Option<usize> {
        self.admission.as_ref().map(|s| s.available_permits())
    }

    pub fn policies(&self) -> &RetryPolicyChain {
        &self.policies
    }

    /// GET and decode `endpoint`, retrying per the policy chain.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        blockchain: &str,
        endpoint: &str,
    ) -> Result<T, StocraError> {
        let body = self.send(blockchain, endpoint, |_| false).await?;
        decode(endpoint, &body)
    }

    /// Like [`fetch`](Self::fetch) but maps HTTP 404 to `Ok(None)`.
    ///
    /// A 404 is returned straight away and never shown to the policy chain.
    pub async fn fetch_optional<T: DeserializeOwned>(
        &self,
        blockchain: &str,
        endpoint: &str,
    ) -> Result<Option<T>, StocraError> {
        match self
            .send(blockchain, endpoint, TransportError::is_not_found)
            .await
        {
            Ok(body) => decode(endpoint, &body).map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Stop admitting requests and release the transport's connections.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(admission) = &self.admission {
            admission.close();
        }
        self.transport.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn acquire(&self) -> Result<Option<SemaphorePermit<'_>>, StocraError> {
        if self.is_closed() {
            return Err(StocraError::Closed);
        }
        match &self.admission {
            Some(admission) => admission
                .acquire()
                .await
                .map(Some)
                .map_err(|_| StocraError::Closed),
            None => Ok(None),
        }
    }

    /// The retry loop. `bypass` selects failures that skip the chain.
    ///
    /// The admission permit is held for the whole loop, backoff sleeps
    /// included, and dropped on every return.
    async fn send(
        &self,
        blockchain: &str,
        endpoint: &str,
        bypass: impl Fn(&TransportError) -> bool,
    ) -> Result<Vec<u8>, StocraError> {
        let _permit = self.acquire().await?;

        let mut iteration = 0u32;
        loop {
            iteration += 1;
            tracing::trace!(blockchain, endpoint, iteration, "GET");

            let error = match self.transport.get(blockchain, endpoint).await {
                Ok(body) => return Ok(body),
                Err(e) => RequestError::new(endpoint, iteration, e),
            };

            if bypass(&error.error) {
                return Err(StocraError::Request(error));
            }

            match self.policies.evaluate(&error) {
                Some((policy, delay)) => {
                    tracing::warn!(
                        blockchain,
                        endpoint,
                        iteration,
                        policy,
                        delay_ms = delay.as_millis() as u64,
                        error = %error.error,
                        "retrying request"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    tracing::debug!(
                        blockchain,
                        endpoint,
                        iteration,
                        error = %error.error,
                        "request failed, no retry policy applies"
                    );
                    return Err(StocraError::Request(error));
                }
            }
        }
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &[u8]) -> Result<T, StocraError> {
    serde_json::from_slice(body).map_err(|source| StocraError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("transport", &self.transport.name())
            .field("policies", &self.policies)
            .field("max_in_flight", &self.max_in_flight)
            .finish()
    }
}
