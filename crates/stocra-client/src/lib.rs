//! stocra-client: the Stocra client and its streaming engine.
//!
//! # Overview
//!
//! - [`Stocra`]: block, transaction and token lookups
//! - [`Fetcher`]: admission control and the retry loop behind every request
//! - [`LookAhead`] / [`BlockStream`]: new blocks in height order with
//!   speculative fetches of the next heights
//! - [`TransactionStream`]: the transactions of those blocks
//! - [`TokenCache`]: process-wide token tables
//!
//! # Quick Start
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use stocra_core::transport::HttpClient;
//! use futures::StreamExt;
//! use stocra_client::Stocra;
//! use stocra_core::StreamConfig;
//!
//! # async fn demo(transport: Arc<dyn HttpClient>) -> Result<(), stocra_core::StocraError> {
//! let client = Stocra::builder(transport).build()?;
//! let mut blocks = client.stream_new_blocks("bitcoin", "latest", StreamConfig::default())?;
//! while let Some(block) = blocks.next().await {
//!     println!("{}", block?.height());
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod client;
pub mod fetcher;
pub mod stream;
pub mod tokens;

#[cfg(test)]
mod testing;

pub use builder::StocraBuilder;
pub use client::Stocra;
pub use fetcher::Fetcher;
pub use stream::{BlockStream, LookAhead, StreamState, TransactionStream};
pub use tokens::{MemoryTokenCache, TokenCache};
