//! Counters for one answering router.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BrowserStats {
    /// Query-start messages accepted for dispatch
    pub queries_received: u64,
    /// Queries no handler accepted
    pub unhandled: u64,
    /// Response messages sent to the renderer
    pub responses_sent: u64,
    /// Queries the renderer canceled
    pub canceled_by_renderer: u64,
    /// Queries dropped by handler removal or teardown
    pub canceled_locally: u64,
    /// Cancels and answers for queries that were no longer pending
    pub stale: u64,
    /// Messages with a router name but an invalid layout or direction
    pub malformed: u64,
    /// Responses the transport refused
    pub send_failures: u64,
}
