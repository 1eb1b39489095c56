//! Process-wide token table cache.
//!
//! Tables are fetched once per blockchain and kept forever. Concurrent
//! first accesses may both fetch; the first stored table wins and the
//! other is discarded, which is harmless since both are identical.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use stocra_core::types::TokenTable;

/// Storage for token tables, injected into the client.
pub trait TokenCache: Send + Sync {
    /// The cached table for `blockchain`, if any.
    fn get(&self, blockchain: &str) -> Option<Arc<TokenTable>>;

    /// Store `table` unless one is already cached; returns the cached table.
    fn fill_if_absent(&self, blockchain: &str, table: TokenTable) -> Arc<TokenTable>;
}

/// In-memory [`TokenCache`].
#[derive(Debug, Default)]
pub struct MemoryTokenCache {
    tables: RwLock<HashMap<String, Arc<TokenTable>>>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache shared by every client of this process.
    pub fn shared() -> Arc<MemoryTokenCache> {
        static SHARED: OnceLock<Arc<MemoryTokenCache>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(MemoryTokenCache::new())).clone()
    }

    /// Number of blockchains cached.
    pub fn len(&self) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TokenCache for MemoryTokenCache {
    fn get(&self, blockchain: &str) -> Option<Arc<TokenTable>> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(blockchain)
            .cloned()
    }

    fn fill_if_absent(&self, blockchain: &str, table: TokenTable) -> Arc<TokenTable> {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(blockchain.to_string())
            .or_insert_with(|| Arc::new(table))
            .clone()
    }
}
