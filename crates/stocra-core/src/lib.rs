//! stocra-core: foundation types for the Stocra client.
//!
//! # Overview
//!
//! - [`HttpClient`]: the transport trait every HTTP backend implements
//! - [`types`]: `Block`, `Transaction`, `Amount`, `Token` with validation
//! - [`StocraError`] / [`TransportError`]: structured error types
//! - [`policy`] module: the retry policy chain and stock policies
//! - [`config`] module: client and stream settings

pub mod config;
pub mod error;
pub mod policy;
pub mod request;
pub mod transport;
pub mod types;

pub use config::{ClientConfig, StreamConfig};
pub use error::{HttpStatusError, StocraError, TransportError};
pub use policy::{Backoff, RetryPolicy, RetryPolicyChain};
pub use request::{BlockId, RequestError};
pub use transport::HttpClient;
pub use types::{
    Amount, AmountError, Block, Currency, Input, Output, Token, TokenTable, TokenType, Transaction,
    TransactionPointer, ValidationError,
};
