//! Retry policy chain.
//!
//! A policy is a closure `Fn(&RequestError) -> Option<Duration>`:
//! `Some(delay)` means "wait `delay`, then retry", `None` means "not mine".
//! The chain asks each policy in declaration order and the first `Some`
//! wins:
//!
//! ```text
//! failure → [429] → [503] → [502] → [connection] → [timeout] → propagate
//! ```

pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use crate::request::RequestError;

pub use retry::{
    exponential_delay, retry_on_bad_gateway, retry_on_connection_error, retry_on_service_unavailable,
    retry_on_status, retry_on_timeout, retry_on_too_many_requests, Backoff, MAX_ITERATIONS,
};

/// A single retry predicate.
pub type RetryPolicy = Arc<dyn Fn(&RequestError) -> Option<Duration> + Send + Sync>;

#[derive(Clone)]
struct NamedPolicy {
    name: String,
    policy: RetryPolicy,
}

/// Ordered list of retry policies.
#[derive(Clone)]
pub struct RetryPolicyChain {
    policies: Vec<NamedPolicy>,
}

impl RetryPolicyChain {
    /// A chain that never retries.
    pub fn empty() -> Self {
        Self {
            policies: Vec::new(),
        }
    }

    /// Append a policy. It is consulted after every policy added before it.
    pub fn with<F>(mut self, name: impl Into<String>, policy: F) -> Self
    where
        F: Fn(&RequestError) -> Option<Duration> + Send + Sync + 'static,
    {
        self.policies.push(NamedPolicy {
            name: name.into(),
            policy: Arc::new(policy),
        });
        self
    }

    /// Ask each policy in order; returns the winning policy's name and delay.
    pub fn evaluate(&self, err: &RequestError) -> Option<(&str, Duration)> {
        self.policies
            .iter()
            .find_map(|p| (p.policy)(err).map(|delay| (p.name.as_str(), delay)))
    }

    /// Policy names in evaluation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.policies.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl Default for RetryPolicyChain {
    /// The stock policies: 429, 503, 502, connection errors, timeouts.
    fn default() -> Self {
        Self::empty()
            .with("too_many_requests", retry_on_too_many_requests)
            .with("service_unavailable", retry_on_service_unavailable)
            .with("bad_gateway", retry_on_bad_gateway)
            .with("connection_error", retry_on_connection_error)
            .with("timeout", retry_on_timeout)
    }
}

impl std::fmt::Debug for RetryPolicyChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::error::{HttpStatusError, TransportError};

    fn http(code: u16, iteration: u32) -> RequestError {
        RequestError::new("blocks/1", iteration, HttpStatusError::new(code).into())
    }

    #[test]
    fn default_chain_order() {
        let chain = RetryPolicyChain::default();
        let names: Vec<_> = chain.names().collect();
        assert_eq!(
            names,
            [
                "too_many_requests",
                "service_unavailable",
                "bad_gateway",
                "connection_error",
                "timeout"
            ]
        );
    }

    #[test]
    fn empty_chain_never_retries() {
        let chain = RetryPolicyChain::empty();
        assert!(chain.is_empty());
        assert!(chain.evaluate(&http(503, 1)).is_none());
    }

    #[test]
    fn first_matching_policy_wins() {
        let chain = RetryPolicyChain::empty()
            .with("slow", |_: &RequestError| Some(Duration::from_secs(60)))
            .with("fast", |_: &RequestError| Some(Duration::from_secs(1)));
        assert_eq!(
            chain.evaluate(&http(503, 1)),
            Some(("slow", Duration::from_secs(60)))
        );
    }

    #[test]
    fn declining_policy_falls_through() {
        let asked = Arc::new(AtomicU32::new(0));
        let counter = asked.clone();
        let chain = RetryPolicyChain::empty()
            .with("never", move |_: &RequestError| {
                counter.fetch_add(1, Ordering::SeqCst);
                None
            })
            .with("service_unavailable", retry_on_service_unavailable);

        assert_eq!(
            chain.evaluate(&http(503, 2)),
            Some(("service_unavailable", Duration::from_secs(2)))
        );
        assert!(chain.evaluate(&http(404, 1)).is_none());
        assert_eq!(asked.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn capped_policy_hands_over_to_next() {
        let chain = RetryPolicyChain::empty()
            .with("service_unavailable", retry_on_service_unavailable)
            .with("patient", retry_on_status(503, Backoff::new(20, Duration::from_secs(1), 1.0)));
        assert_eq!(chain.evaluate(&http(503, 10)).map(|(n, _)| n), Some("service_unavailable"));
        assert_eq!(chain.evaluate(&http(503, 11)).map(|(n, _)| n), Some("patient"));
        assert!(chain.evaluate(&http(503, 21)).is_none());
    }

    #[test]
    fn default_chain_leaves_not_found_alone() {
        let chain = RetryPolicyChain::default();
        assert!(chain.evaluate(&http(404, 1)).is_none());
        let conn = RequestError::new("x", 1, TransportError::Connection("refused".into()));
        assert_eq!(chain.evaluate(&conn).map(|(n, _)| n), Some("connection_error"));
    }
}
