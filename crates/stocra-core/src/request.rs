//! Request-side types: block selectors, endpoint paths and the per-attempt
//! failure context handed to retry policies.

use crate::error::TransportError;

/// Selects a block by height, hash, or the current chain tip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum BlockId {
    Height(u64),
    Hash(String),
    #[default]
    Latest,
}

impl BlockId {
    /// The `blocks/{selector}` endpoint for this id.
    pub fn endpoint(&self) -> String {
        format!("blocks/{self}")
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Height(h) => write!(f, "{h}"),
            Self::Hash(h) => write!(f, "{h}"),
            Self::Latest => write!(f, "latest"),
        }
    }
}

impl From<u64> for BlockId {
    fn from(height: u64) -> Self {
        Self::Height(height)
    }
}

impl From<&str> for BlockId {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case("latest") {
            Self::Latest
        } else {
            Self::Hash(s.to_string())
        }
    }
}

impl From<String> for BlockId {
    fn from(s: String) -> Self {
        if s.eq_ignore_ascii_case("latest") {
            Self::Latest
        } else {
            Self::Hash(s)
        }
    }
}

/// `transactions/{hash}`
pub fn transaction_endpoint(hash: &str) -> String {
    format!("transactions/{hash}")
}

/// Token table endpoint.
pub const TOKENS_ENDPOINT: &str = "tokens";

/// Context of one failed attempt of a logical request.
///
/// `iteration` starts at 1 and grows by one per physical attempt; it is
/// shared across every policy in the chain for the same logical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError {
    pub endpoint: String,
    pub iteration: u32,
    pub error: TransportError,
}

impl RequestError {
    pub fn new(endpoint: impl Into<String>, iteration: u32, error: TransportError) -> Self {
        Self {
            endpoint: endpoint.into(),
            iteration,
            error,
        }
    }

    /// Shortcut for `self.error.status()`.
    pub fn status(&self) -> Option<u16> {
        self.error.status()
    }
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "request '{}' failed on attempt {}: {}",
            self.endpoint, self.iteration, self.error
        )
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_id_endpoints() {
        assert_eq!(BlockId::from(100).endpoint(), "blocks/100");
        assert_eq!(BlockId::from("latest").endpoint(), "blocks/latest");
        assert_eq!(BlockId::from("LATEST"), BlockId::Latest);
        assert_eq!(
            BlockId::from("00000000abc".to_string()).endpoint(),
            "blocks/00000000abc"
        );
        assert_eq!(BlockId::default(), BlockId::Latest);
    }

    #[test]
    fn transaction_endpoint_format() {
        assert_eq!(transaction_endpoint("deadbeef"), "transactions/deadbeef");
    }

    #[test]
    fn request_error_display() {
        let e = RequestError::new(
            "blocks/7",
            2,
            TransportError::Timeout("read".into()),
        );
        assert_eq!(
            e.to_string(),
            "request 'blocks/7' failed on attempt 2: request timed out: read"
        );
    }
}
