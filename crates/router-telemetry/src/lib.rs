//! # Router Telemetry
//!
//! Observability for both router processes.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` with an `EnvFilter`, pretty or JSON
//! - **Metrics**: Prometheus counters and gauges for boundary traffic and
//!   query lifecycle
//!
//! ## Usage
//!
//! ```rust,ignore
//! use router_telemetry::{TelemetryConfig, init_telemetry};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // Routers log and count from here on
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MR_SERVICE_NAME` | `message-router` | Service name in log lines |
//! | `MR_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `MR_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `MR_JSON_LOGS` | `false` | JSON formatted logs |
//! | `MR_METRICS` | `true` | Register Prometheus metrics |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, QuerySnapshot, BOUNDARY_MESSAGES_DISCARDED,
    BOUNDARY_MESSAGES_RECEIVED, BOUNDARY_MESSAGES_SENT, QUERIES_CANCELED, QUERIES_ISSUED,
    QUERIES_PENDING, QUERIES_RESOLVED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = if config.metrics_enabled {
        Some(register_metrics()?)
    } else {
        None
    };

    logging::init_logging(&config)?;

    Ok(TelemetryGuard {
        service_name: config.service_name,
        metrics,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
    metrics: Option<MetricsHandle>,
}

impl TelemetryGuard {
    #[must_use]
    pub fn metrics_enabled(&self) -> bool {
        self.metrics.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry...");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "message-router");
    }

    #[test]
    fn test_metric_inc_macro() {
        let before = QUERIES_CANCELED.get();
        metric_inc!(QUERIES_CANCELED);
        metric_inc!(BOUNDARY_MESSAGES_SENT, &["tests", "oneway"]);
        assert!(QUERIES_CANCELED.get() >= before + 1.0);
    }
}
