//! Scripted in-memory transport and fixtures shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use stocra_core::error::{HttpStatusError, TransportError};
use stocra_core::transport::HttpClient;
use stocra_core::types::Block;

use crate::tokens::MemoryTokenCache;
use crate::Stocra;

struct Scripted {
    delay: Duration,
    response: Result<Vec<u8>, TransportError>,
}

/// Answers each endpoint from a queue of scripted responses, falling back
/// to a fixed error (404 unless changed) once the queue is empty.
pub(crate) struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<HashMap<String, usize>>,
    fallback: Mutex<TransportError>,
    closed: AtomicBool,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            fallback: Mutex::new(HttpStatusError::new(404).into()),
            closed: AtomicBool::new(false),
        }
    }

    fn push(&self, endpoint: &str, delay: Duration, response: Result<Vec<u8>, TransportError>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default()
            .push_back(Scripted { delay, response });
    }

    pub(crate) fn push_ok(&self, endpoint: &str, body: Vec<u8>) {
        self.push(endpoint, Duration::ZERO, Ok(body));
    }

    /// Respond with `body` after `delay`.
    pub(crate) fn push_delayed_ok(&self, endpoint: &str, delay: Duration, body: Vec<u8>) {
        self.push(endpoint, delay, Ok(body));
    }

    pub(crate) fn push_error(&self, endpoint: &str, error: TransportError) {
        self.push(endpoint, Duration::ZERO, Err(error));
    }

    pub(crate) fn set_fallback_error(&self, error: TransportError) {
        *self.fallback.lock().unwrap() = error;
    }

    /// Number of requests seen for `endpoint`.
    pub(crate) fn calls(&self, endpoint: &str) -> usize {
        self.calls.lock().unwrap().get(endpoint).copied().unwrap_or(0)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for ScriptedTransport {
    async fn get(&self, _blockchain: &str, endpoint: &str) -> Result<Vec<u8>, TransportError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default() += 1;

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(endpoint)
            .and_then(VecDeque::pop_front);

        match next {
            Some(scripted) => {
                if !scripted.delay.is_zero() {
                    tokio::time::sleep(scripted.delay).await;
                }
                scripted.response
            }
            None => Err(self.fallback.lock().unwrap().clone()),
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Client over `transport` with the default retry chain and a private
/// token cache.
pub(crate) fn client(transport: &Arc<ScriptedTransport>) -> Stocra {
    Stocra::builder(transport.clone())
        .token_cache(Arc::new(MemoryTokenCache::new()))
        .build()
        .unwrap()
}

const BASE_TIMESTAMP_MS: u64 = 1_650_000_000_000;

pub(crate) fn block_json(height: u64, transactions: &[&str]) -> Vec<u8> {
    json!({
        "height": height,
        "hash": format!("hash{height}"),
        "timestamp_ms": BASE_TIMESTAMP_MS + height * 1_000,
        "transactions": transactions,
    })
    .to_string()
    .into_bytes()
}

pub(crate) fn block(height: u64, transactions: &[&str]) -> Block {
    serde_json::from_slice(&block_json(height, transactions)).unwrap()
}

pub(crate) fn transaction_json(hash: &str) -> Vec<u8> {
    json!({
        "hash": hash,
        "inputs": [{"address": "in", "amount": {"value": "1", "currency_symbol": "BTC"}}],
        "outputs": [{"address": "out", "amount": {"value": "0.8", "currency_symbol": "BTC"}}],
        "fee": {"value": "0.2", "currency_symbol": "BTC"},
    })
    .to_string()
    .into_bytes()
}

pub(crate) fn tokens_json() -> Vec<u8> {
    json!({
        "0xdac17f958d2ee523a2206206994597c13d831ec7": {
            "currency": {"symbol": "USDT", "name": "Tether"},
            "scaling": "0.000001",
            "type": "ERC20",
        }
    })
    .to_string()
    .into_bytes()
}

/// Paused-clock elapsed time, allowing for millisecond timer rounding.
pub(crate) fn assert_elapsed(start: tokio::time::Instant, expected: Duration) {
    let elapsed = start.elapsed();
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(50),
        "expected ~{expected:?}, got {elapsed:?}"
    );
}
