//! Streaming API: new blocks in height order and the transactions they carry.

mod lookahead;
mod transactions;

use std::sync::Arc;

use futures::stream::BoxStream;

use stocra_core::error::StocraError;
use stocra_core::types::{Block, Transaction};

pub use lookahead::{LookAhead, StreamState};
pub(crate) use transactions::transactions_of;

/// Blocks in strictly increasing height order. Ends after the first error.
pub type BlockStream = BoxStream<'static, Result<Block, StocraError>>;

/// Transactions paired with their block. Ends after the first error.
pub type TransactionStream = BoxStream<'static, Result<(Arc<Block>, Transaction), StocraError>>;
