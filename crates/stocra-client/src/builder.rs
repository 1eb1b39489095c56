//! Fluent builder for [`Stocra`] clients.
//!
//! # Example
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use stocra_core::transport::HttpClient;
//! use stocra_client::Stocra;
//! use stocra_core::RetryPolicyChain;
//!
//! # fn demo(transport: Arc<dyn HttpClient>) -> Result<(), stocra_core::StocraError> {
//! let client = Stocra::builder(transport)
//!     .retry_policies(RetryPolicyChain::default())
//!     .max_concurrent_requests(8)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use stocra_core::config::ClientConfig;
use stocra_core::error::StocraError;
use stocra_core::policy::RetryPolicyChain;
use stocra_core::transport::HttpClient;

use crate::client::Stocra;
use crate::fetcher::Fetcher;
use crate::tokens::{MemoryTokenCache, TokenCache};

pub struct StocraBuilder {
    transport: Arc<dyn HttpClient>,
    policies: RetryPolicyChain,
    max_concurrent_requests: Option<usize>,
    token_cache: Option<Arc<dyn TokenCache>>,
}

impl StocraBuilder {
    pub fn new(transport: Arc<dyn HttpClient>) -> Self {
        Self {
            transport,
            policies: RetryPolicyChain::default(),
            max_concurrent_requests: None,
            token_cache: None,
        }
    }

    /// Replace the retry policy chain. Defaults to [`RetryPolicyChain::default`].
    pub fn retry_policies(mut self, policies: RetryPolicyChain) -> Self {
        self.policies = policies;
        self
    }

    /// Bound the number of requests in flight. Unbounded by default.
    pub fn max_concurrent_requests(mut self, limit: usize) -> Self {
        self.max_concurrent_requests = Some(limit);
        self
    }

    /// Use `cache` instead of the process-wide token cache.
    pub fn token_cache(mut self, cache: Arc<dyn TokenCache>) -> Self {
        self.token_cache = Some(cache);
        self
    }

    /// Apply the client-side settings of `config`.
    pub fn config(mut self, config: &ClientConfig) -> Self {
        self.max_concurrent_requests = config.max_concurrent_requests;
        self
    }

    pub fn build(self) -> Result<Stocra, StocraError> {
        if self.max_concurrent_requests == Some(0) {
            return Err(StocraError::Config(
                "max_concurrent_requests must be at least 1".into(),
            ));
        }
        let tokens = self
            .token_cache
            .unwrap_or_else(|| MemoryTokenCache::shared() as Arc<dyn TokenCache>);
        let fetcher = Fetcher::new(self.transport, self.policies, self.max_concurrent_requests);
        tracing::debug!(?fetcher, "stocra client built");
        Ok(Stocra::from_parts(fetcher, tokens))
    }
}
