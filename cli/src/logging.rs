//! Tracing initialisation for the CLI.

use std::collections::BTreeMap;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Global level variable; `STOCRA_LOG_<COMPONENT>` overrides one crate,
/// e.g. `STOCRA_LOG_HTTP=debug` targets `stocra_http`.
const LEVEL_VAR: &str = "STOCRA_LOG";

/// Log level per component.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Global default level, or a full filter directive string.
    pub level: String,
    /// Per-crate overrides: crate name → level.
    pub components: BTreeMap<String, String>,
    /// JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            components: BTreeMap::new(),
            json: false,
        }
    }
}

impl LogConfig {
    pub fn from_env(json: bool) -> Self {
        Self::from_vars(std::env::vars(), json)
    }

    fn from_vars(vars: impl IntoIterator<Item = (String, String)>, json: bool) -> Self {
        let mut config = Self {
            json,
            ..Self::default()
        };
        for (name, value) in vars {
            if value.is_empty() {
                continue;
            }
            if name == LEVEL_VAR {
                config.level = value;
            } else if let Some(component) = name.strip_prefix("STOCRA_LOG_") {
                let component = format!("stocra_{}", component.to_ascii_lowercase());
                config.components.insert(component, value);
            }
        }
        config
    }

    /// `level,crate_a=debug,…`
    pub fn directives(&self) -> String {
        let mut directives = self.level.clone();
        for (component, level) in &self.components {
            directives.push_str(&format!(",{}={}", component.replace('-', "_"), level));
        }
        directives
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays
/// machine-readable. Call once at startup.
pub fn init_tracing(config: &LogConfig) {
    let filter = EnvFilter::try_new(config.directives()).unwrap_or_else(|_| EnvFilter::new("warn"));

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
