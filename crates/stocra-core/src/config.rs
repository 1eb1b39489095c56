//! Client and stream configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StocraError;

/// Connection settings for the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Service domain; requests go to `https://{blockchain}.{host}/…`.
    #[serde(default = "default_host")]
    pub host: String,
    /// API version path segment.
    #[serde(default = "default_version")]
    pub version: String,
    /// Sent as `Authorization: Bearer {api_key}` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// TCP connect timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<u64>,
    /// Read timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout_ms: Option<u64>,
    /// Maximum concurrently in-flight requests. `None` = unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_requests: Option<usize>,
}

fn default_host() -> String {
    "stocra.com".into()
}

fn default_version() -> String {
    "v1.0".into()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            version: default_version(),
            api_key: None,
            connect_timeout_ms: None,
            read_timeout_ms: None,
            max_concurrent_requests: None,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `STOCRA_API_KEY`, `STOCRA_HOST`,
    /// `STOCRA_VERSION` and `STOCRA_MAX_CONCURRENT_REQUESTS`.
    pub fn from_env() -> Result<Self, StocraError> {
        let mut config = Self::default();
        if let Ok(key) = std::env::var("STOCRA_API_KEY") {
            if !key.is_empty() {
                config.api_key = Some(key);
            }
        }
        if let Ok(host) = std::env::var("STOCRA_HOST") {
            config.host = host;
        }
        if let Ok(version) = std::env::var("STOCRA_VERSION") {
            config.version = version;
        }
        if let Ok(limit) = std::env::var("STOCRA_MAX_CONCURRENT_REQUESTS") {
            let limit = limit.parse().map_err(|_| {
                StocraError::Config(format!(
                    "STOCRA_MAX_CONCURRENT_REQUESTS must be a positive integer, got '{limit}'"
                ))
            })?;
            config.max_concurrent_requests = Some(limit);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StocraError> {
        if self.host.is_empty() {
            return Err(StocraError::Config("host must not be empty".into()));
        }
        if self.version.is_empty() {
            return Err(StocraError::Config("version must not be empty".into()));
        }
        if self.max_concurrent_requests == Some(0) {
            return Err(StocraError::Config(
                "max_concurrent_requests must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// `https://{blockchain}.{host}/{version}/{endpoint}`
    pub fn endpoint_url(&self, blockchain: &str, endpoint: &str) -> String {
        format!(
            "https://{blockchain}.{}/{}/{endpoint}",
            self.host, self.version
        )
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}

/// Settings of a block or transaction stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Heights fetched speculatively beyond the next height to emit.
    /// Must be at least 1; 1 polls one height at a time.
    #[serde(default = "default_look_ahead_window")]
    pub look_ahead_window: usize,
    /// Wait between polls of a height that has not been mined yet.
    #[serde(default = "default_sleep_interval_ms")]
    pub sleep_interval_ms: u64,
}

fn default_look_ahead_window() -> usize {
    1
}

fn default_sleep_interval_ms() -> u64 {
    10_000
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            look_ahead_window: default_look_ahead_window(),
            sleep_interval_ms: default_sleep_interval_ms(),
        }
    }
}

impl StreamConfig {
    pub fn new(look_ahead_window: usize, sleep_interval: Duration) -> Self {
        Self {
            look_ahead_window,
            sleep_interval_ms: sleep_interval.as_millis() as u64,
        }
    }

    pub fn sleep_interval(&self) -> Duration {
        Duration::from_millis(self.sleep_interval_ms)
    }

    pub fn validate(&self) -> Result<(), StocraError> {
        if self.look_ahead_window == 0 {
            return Err(StocraError::Config(
                "look_ahead_window must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
