//! Transaction streamer: fans each streamed block out into its transactions.

use std::sync::Arc;

use futures::future;
use futures::stream::{StreamExt, TryStreamExt};

use crate::client::Stocra;
use crate::stream::{BlockStream, TransactionStream};

/// Transactions of every block of `blocks`, block by block.
///
/// Within a block transactions arrive in completion order. The first error,
/// from either the block stream or a transaction fetch, is yielded and ends
/// the stream.
pub(crate) fn transactions_of(
    client: Stocra,
    blockchain: &str,
    blocks: BlockStream,
) -> TransactionStream {
    let blockchain = blockchain.to_string();
    blocks
        .map_ok(move |block| {
            let block = Arc::new(block);
            let txs = client.get_all_transactions_of_block(&blockchain, &block);
            txs.map_ok(move |tx| (block.clone(), tx))
        })
        .try_flatten()
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        })
        .boxed()
}
