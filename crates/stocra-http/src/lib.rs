//! stocra-http: HTTPS transport for the Stocra client.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stocra_core::ClientConfig;
//! use stocra_http::HttpTransport;
//!
//! # fn demo() -> Result<(), stocra_core::StocraError> {
//! let transport = Arc::new(HttpTransport::new(ClientConfig::from_env()?)?);
//! # Ok(())
//! # }
//! ```

pub mod client;

pub use client::HttpTransport;
