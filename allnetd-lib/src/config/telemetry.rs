use serde::Deserialize;

/// Logging configuration.
/// Controls application-level structured logging (stdout/stderr).
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    /// Default: "info". Can be overridden at runtime via RUST_LOG.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Show module path (target) in log messages.
    /// Default: false.
    #[serde(default)]
    pub show_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), show_target: false }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
