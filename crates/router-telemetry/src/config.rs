//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to log lines
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive
    pub log_level: String,

    /// Whether to enable console output
    pub console_output: bool,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Whether to register Prometheus metrics
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "message-router".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            metrics_enabled: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `MR_SERVICE_NAME`: Service name (default: message-router)
    /// - `MR_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `MR_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `MR_JSON_LOGS`: Enable JSON logs (default: false)
    /// - `MR_METRICS`: Register Prometheus metrics (default: true)
    pub fn from_env() -> Self {
        Self {
            service_name: env::var("MR_SERVICE_NAME")
                .unwrap_or_else(|_| "message-router".to_string()),

            log_level: env::var("MR_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("MR_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v, true))
                .unwrap_or(true),

            json_logs: env::var("MR_JSON_LOGS")
                .map(|v| parse_flag(&v, false))
                .unwrap_or(false),

            metrics_enabled: env::var("MR_METRICS")
                .map(|v| parse_flag(&v, true))
                .unwrap_or(true),
        }
    }

    /// Same configuration with a different service name.
    #[must_use]
    pub fn for_process(mut self, process: &str) -> Self {
        self.service_name = format!("{}-{}", self.service_name, process);
        self
    }
}

/// Interpret an on/off environment value; anything unrecognized keeps
/// `default`.
fn parse_flag(value: &str, default: bool) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
