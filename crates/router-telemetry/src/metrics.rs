//! Prometheus metrics for the message router.
//!
//! All metrics follow the naming convention: `mr_<area>_<metric>_<unit>`
//!
//! ## Label Values
//!
//! - `process`: `browser` or `renderer`
//! - `kind`: `router` (query, cancel and response names) or `oneway`
//! - `reason`: `malformed` (router name, wrong layout), `unhandled`,
//!   `decode` (envelope would not open) or `send_failed`

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // BOUNDARY METRICS
    // =========================================================================

    /// Messages handed to the boundary transport
    pub static ref BOUNDARY_MESSAGES_SENT: CounterVec = CounterVec::new(
        Opts::new("mr_boundary_messages_sent_total", "Messages sent across the boundary"),
        &["process", "kind"]
    ).expect("metric creation failed");

    /// Messages taken off the boundary
    pub static ref BOUNDARY_MESSAGES_RECEIVED: CounterVec = CounterVec::new(
        Opts::new("mr_boundary_messages_received_total", "Messages received from the boundary"),
        &["process", "kind"]
    ).expect("metric creation failed");

    /// Messages nobody acted on
    pub static ref BOUNDARY_MESSAGES_DISCARDED: CounterVec = CounterVec::new(
        Opts::new("mr_boundary_messages_discarded_total", "Messages discarded on receipt"),
        &["process", "reason"]
    ).expect("metric creation failed");

    // =========================================================================
    // QUERY METRICS
    // =========================================================================

    /// Queries issued by script
    pub static ref QUERIES_ISSUED: Counter = Counter::new(
        "mr_queries_issued_total",
        "Total queries issued by the requesting side"
    ).expect("metric creation failed");

    /// Query resolutions delivered to continuations
    pub static ref QUERIES_RESOLVED: CounterVec = CounterVec::new(
        Opts::new("mr_queries_resolved_total", "Query resolutions by outcome"),
        &["outcome"]  // outcome: success/failure
    ).expect("metric creation failed");

    /// Queries canceled by script
    pub static ref QUERIES_CANCELED: Counter = Counter::new(
        "mr_queries_canceled_total",
        "Total queries canceled by the requesting side"
    ).expect("metric creation failed");

    /// Outstanding queries per process
    pub static ref QUERIES_PENDING: GaugeVec = GaugeVec::new(
        Opts::new("mr_queries_pending", "Queries awaiting a response"),
        &["process"]
    ).expect("metric creation failed");
}

/// Handle proving the metrics are registered.
#[derive(Debug, Clone, Copy)]
pub struct MetricsHandle {
    _registered: (),
}

/// Register all metrics with the global registry.
///
/// Registering twice is not an error.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Boundary
        Box::new(BOUNDARY_MESSAGES_SENT.clone()),
        Box::new(BOUNDARY_MESSAGES_RECEIVED.clone()),
        Box::new(BOUNDARY_MESSAGES_DISCARDED.clone()),
        // Queries
        Box::new(QUERIES_ISSUED.clone()),
        Box::new(QUERIES_RESOLVED.clone()),
        Box::new(QUERIES_CANCELED.clone()),
        Box::new(QUERIES_PENDING.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle { _registered: () })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Count one message sent by `process`.
pub fn record_sent(process: &str, kind: &str) {
    BOUNDARY_MESSAGES_SENT
        .with_label_values(&[process, kind])
        .inc();
}

/// Count one message received by `process`.
pub fn record_received(process: &str, kind: &str) {
    BOUNDARY_MESSAGES_RECEIVED
        .with_label_values(&[process, kind])
        .inc();
}

/// Count one discarded message.
pub fn record_discarded(process: &str, reason: &str) {
    BOUNDARY_MESSAGES_DISCARDED
        .with_label_values(&[process, reason])
        .inc();
}

/// Count one resolution delivered to script.
pub fn record_resolution(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    QUERIES_RESOLVED.with_label_values(&[outcome]).inc();
}

/// Publish the number of outstanding queries of `process`.
pub fn set_pending(process: &str, pending: usize) {
    QUERIES_PENDING
        .with_label_values(&[process])
        .set(pending as f64);
}

/// Point-in-time view of the query counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySnapshot {
    pub issued: f64,
    pub succeeded: f64,
    pub failed: f64,
    pub canceled: f64,
}

impl QuerySnapshot {
    #[must_use]
    pub fn capture() -> Self {
        Self {
            issued: QUERIES_ISSUED.get(),
            succeeded: QUERIES_RESOLVED.with_label_values(&["success"]).get(),
            failed: QUERIES_RESOLVED.with_label_values(&["failure"]).get(),
            canceled: QUERIES_CANCELED.get(),
        }
    }

    /// Render as a JSON object for diagnostics.
    pub fn to_json(&self) -> Result<String, TelemetryError> {
        serde_json::to_string(self).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}
