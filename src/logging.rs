//! Logging configuration and initialization
//!
//! Console logging through `env_logger`. The filter comes from `HUD_LOG`,
//! then `RUST_LOG`, then the configured default level.

use serde::{Deserialize, Serialize};

/// Environment variable holding the log filter
pub const LOG_ENV_VAR: &str = "HUD_LOG";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default log level filter (default: "info")
    pub default_level: String,
    /// Prefix lines with a timestamp (default: true)
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            timestamps: true,
        }
    }
}

/// Resolve the filter string that `init_logging` will apply
pub fn resolve_filter(config: &LogConfig) -> String {
    std::env::var(LOG_ENV_VAR)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| config.default_level.clone())
}

/// Initialize the logger
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(config: &LogConfig) {
    let filter = resolve_filter(config);

    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&filter);
    if !config.timestamps {
        builder.format_timestamp(None);
    }

    if builder.try_init().is_ok() {
        log::info!(
            "Logging initialized (filter: {}, version {})",
            filter,
            env!("CARGO_PKG_VERSION")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.default_level, "info");
        assert!(config.timestamps);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = LogConfig::default();
        init_logging(&config);
        init_logging(&config);
    }
}
