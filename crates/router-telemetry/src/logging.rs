//! Structured logging.
//!
//! Log lines carry consistent fields so both processes can be read side by
//! side:
//! - `process`: `browser` or `renderer`
//! - `route`: `browser#N/frame#M` the message concerns
//! - `query_id`: correlation id, for router traffic

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(e.to_string()))?;

    if !config.console_output {
        tracing_subscriber::registry()
            .with(env_filter)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
        return Ok(());
    }

    if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    tracing::debug!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Structured logging initialized"
    );
    Ok(())
}

/// Helper to create structured log entries with consistent formatting.
#[macro_export]
macro_rules! log_event {
    (info, $process:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            process = $process,
            $($($field)*,)?
            $msg
        )
    };

    (warn, $process:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            process = $process,
            $($($field)*,)?
            $msg
        )
    };

    (error, $process:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            process = $process,
            $($($field)*,)?
            $msg
        )
    };

    (debug, $process:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            process = $process,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a query-related event with standard fields.
#[macro_export]
macro_rules! log_query_event {
    ($level:ident, $process:expr, $msg:expr, $route:expr, $query_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            process = $process,
            route = %$route,
            query_id = %$query_id,
            $($($field)*,)?
            $msg
        )
    };
}
