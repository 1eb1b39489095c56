//! The Stocra client: block and transaction lookups, token scaling and the
//! entry points of the streaming API.

use std::sync::Arc;

use futures::stream::{BoxStream, FuturesUnordered, StreamExt};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use stocra_core::error::StocraError;
use stocra_core::request::{transaction_endpoint, BlockId, TOKENS_ENDPOINT};
use stocra_core::transport::HttpClient;
use stocra_core::types::{Block, TokenTable, Transaction};
use stocra_core::StreamConfig;

use crate::builder::StocraBuilder;
use crate::fetcher::Fetcher;
use crate::stream::{self, BlockStream, LookAhead, TransactionStream};
use crate::tokens::TokenCache;

/// Client for the Stocra indexing service.
///
/// Cheap to clone; clones share the fetcher, the token cache and the
/// shutdown token.
#[derive(Clone)]
pub struct Stocra {
    fetcher: Fetcher,
    tokens: Arc<dyn TokenCache>,
    shutdown: CancellationToken,
}

impl Stocra {
    pub fn builder(transport: Arc<dyn HttpClient>) -> StocraBuilder {
        StocraBuilder::new(transport)
    }

    pub(crate) fn from_parts(fetcher: Fetcher, tokens: Arc<dyn TokenCache>) -> Self {
        Self {
            fetcher,
            tokens,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub(crate) fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub async fn get_block(
        &self,
        blockchain: &str,
        block: impl Into<BlockId>,
    ) -> Result<Block, StocraError> {
        let endpoint = block.into().endpoint();
        self.fetcher.fetch(blockchain, &endpoint).await
    }

    /// Fetch a block by height; `Ok(None)` if it has not been mined yet.
    pub(crate) async fn poll_block(
        &self,
        blockchain: &str,
        height: u64,
    ) -> Result<Option<Block>, StocraError> {
        let endpoint = BlockId::Height(height).endpoint();
        self.fetcher.fetch_optional(blockchain, &endpoint).await
    }

    pub async fn get_transaction(
        &self,
        blockchain: &str,
        hash: &str,
    ) -> Result<Transaction, StocraError> {
        self.fetcher
            .fetch(blockchain, &transaction_endpoint(hash))
            .await
    }

    /// Fetch every transaction of `block` concurrently.
    ///
    /// Items arrive in completion order, not in the block's order.
    pub fn get_all_transactions_of_block(
        &self,
        blockchain: &str,
        block: &Block,
    ) -> BoxStream<'static, Result<Transaction, StocraError>> {
        block
            .transactions()
            .iter()
            .map(|hash| {
                let client = self.clone();
                let blockchain = blockchain.to_string();
                let hash = hash.clone();
                async move { client.get_transaction(&blockchain, &hash).await }
            })
            .collect::<FuturesUnordered<_>>()
            .boxed()
    }

    /// Token table of `blockchain`, fetched on first use and cached.
    pub async fn get_tokens(&self, blockchain: &str) -> Result<Arc<TokenTable>, StocraError> {
        if let Some(table) = self.tokens.get(blockchain) {
            return Ok(table);
        }
        let table: TokenTable = self.fetcher.fetch(blockchain, TOKENS_ENDPOINT).await?;
        tracing::debug!(blockchain, tokens = table.len(), "token table cached");
        Ok(self.tokens.fill_if_absent(blockchain, table))
    }

    /// Convert a raw on-chain token amount to its human-readable value.
    pub async fn scale_token_value(
        &self,
        blockchain: &str,
        contract_address: &str,
        raw: Decimal,
    ) -> Result<Decimal, StocraError> {
        let tokens = self.get_tokens(blockchain).await?;
        let token = tokens
            .get(contract_address)
            .ok_or_else(|| StocraError::UnknownToken {
                blockchain: blockchain.to_string(),
                contract_address: contract_address.to_string(),
            })?;
        Ok(raw * token.scaling)
    }

    /// The look-ahead state machine behind [`stream_new_blocks`](Self::stream_new_blocks).
    pub fn look_ahead(
        &self,
        blockchain: &str,
        start: impl Into<BlockId>,
        config: StreamConfig,
    ) -> Result<LookAhead, StocraError> {
        LookAhead::new(self.clone(), blockchain, start.into(), config)
    }

    /// Stream `start` and every block mined after it, in height order.
    ///
    /// Fails with [`StocraError::Config`] before any request if `config` is
    /// invalid. The stream ends after yielding its first error.
    pub fn stream_new_blocks(
        &self,
        blockchain: &str,
        start: impl Into<BlockId>,
        config: StreamConfig,
    ) -> Result<BlockStream, StocraError> {
        Ok(self.look_ahead(blockchain, start, config)?.into_stream())
    }

    /// Stream the transactions of `start` and every later block, each paired
    /// with its block.
    pub fn stream_new_transactions(
        &self,
        blockchain: &str,
        start: impl Into<BlockId>,
        config: StreamConfig,
    ) -> Result<TransactionStream, StocraError> {
        let blocks = self.stream_new_blocks(blockchain, start, config)?;
        Ok(stream::transactions_of(self.clone(), blockchain, blocks))
    }

    /// Cancel every stream of this client and reject further requests.
    pub async fn close(&self) {
        self.shutdown.cancel();
        self.fetcher.close().await;
        tracing::info!("stocra client closed");
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl std::fmt::Debug for Stocra {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stocra")
            .field("fetcher", &self.fetcher)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::TryStreamExt;
    use stocra_core::error::HttpStatusError;

    use super::*;
    use crate::testing::{block, block_json, client, tokens_json, transaction_json, ScriptedTransport};

    const USDT: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";

    #[tokio::test]
    async fn get_block_by_selector() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok("blocks/latest", block_json(120, &["a"]));
        transport.push_ok("blocks/hash7", block_json(7, &[]));
        let stocra = client(&transport);

        let latest = stocra.get_block("bitcoin", BlockId::Latest).await.unwrap();
        assert_eq!(latest.height(), 120);
        assert_eq!(latest.transactions(), ["a".to_string()]);

        let by_hash = stocra.get_block("bitcoin", "hash7").await.unwrap();
        assert_eq!(by_hash.height(), 7);
    }

    #[tokio::test]
    async fn get_block_surfaces_not_found() {
        let transport = Arc::new(ScriptedTransport::new());
        let err = client(&transport)
            .get_block("bitcoin", 999_999u64)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn get_transaction_decodes_amounts() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok("transactions/abc", transaction_json("abc"));

        let tx = client(&transport)
            .get_transaction("bitcoin", "abc")
            .await
            .unwrap();
        assert_eq!(tx.hash(), "abc");
        assert_eq!(tx.fee().value, Decimal::new(2, 1));
        assert_eq!(tx.outputs()[0].address, "out");
    }

    #[tokio::test(start_paused = true)]
    async fn block_transactions_arrive_in_completion_order() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_delayed_ok("transactions/a", Duration::from_secs(3), transaction_json("a"));
        transport.push_delayed_ok("transactions/b", Duration::from_secs(1), transaction_json("b"));
        transport.push_ok("transactions/c", transaction_json("c"));

        let txs: Vec<Transaction> = client(&transport)
            .get_all_transactions_of_block("bitcoin", &block(100, &["a", "b", "c"]))
            .try_collect()
            .await
            .unwrap();

        let hashes: Vec<&str> = txs.iter().map(Transaction::hash).collect();
        assert_eq!(hashes, ["c", "b", "a"]);
    }

    #[tokio::test]
    async fn empty_block_has_no_transactions() {
        let transport = Arc::new(ScriptedTransport::new());
        let txs: Vec<_> = client(&transport)
            .get_all_transactions_of_block("bitcoin", &block(100, &[]))
            .collect()
            .await;
        assert!(txs.is_empty());
    }

    #[tokio::test]
    async fn token_table_is_fetched_once() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok("tokens", tokens_json());
        let stocra = client(&transport);

        let first = stocra
            .scale_token_value("ethereum", USDT, Decimal::from(2_500_000))
            .await
            .unwrap();
        let second = stocra
            .scale_token_value("ethereum", USDT, Decimal::from(1))
            .await
            .unwrap();

        assert_eq!(first, Decimal::new(25, 1));
        assert_eq!(second, Decimal::new(1, 6));
        assert_eq!(transport.calls("tokens"), 1);
    }

    #[tokio::test]
    async fn unknown_contract_is_an_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok("tokens", tokens_json());

        let err = client(&transport)
            .scale_token_value("ethereum", "0xnope", Decimal::ONE)
            .await
            .unwrap_err();
        match err {
            StocraError::UnknownToken {
                blockchain,
                contract_address,
            } => {
                assert_eq!(blockchain, "ethereum");
                assert_eq!(contract_address, "0xnope");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_token_fetch_is_not_cached() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_error("tokens", HttpStatusError::new(500).into());
        transport.push_ok("tokens", tokens_json());
        let stocra = client(&transport);

        assert!(stocra.get_tokens("ethereum").await.is_err());
        assert_eq!(stocra.get_tokens("ethereum").await.unwrap().len(), 1);
        assert_eq!(transport.calls("tokens"), 2);
    }

    #[tokio::test]
    async fn close_rejects_new_requests() {
        let transport = Arc::new(ScriptedTransport::new());
        let stocra = client(&transport);
        stocra.close().await;

        assert!(stocra.is_closed());
        assert!(transport.is_closed());
        let err = stocra.get_block("bitcoin", 1u64).await.unwrap_err();
        assert!(matches!(err, StocraError::Closed));
    }
}
