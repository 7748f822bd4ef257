//! Counters for one requesting router.
//!
//! Plain integers: the router is only ever touched from its owner thread.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RendererStats {
    /// Queries sent to the browser
    pub issued: u64,
    /// Continuation invocations with a success
    pub succeeded: u64,
    /// Continuation invocations with a failure
    pub failed: u64,
    /// Queries canceled by script
    pub canceled: u64,
    /// Queries dropped with their script context
    pub disposed: u64,
    /// Responses for ids that were no longer pending
    pub stale_responses: u64,
    /// Messages with a router name but an invalid layout
    pub malformed: u64,
}

impl RendererStats {
    /// Total continuation invocations.
    #[must_use]
    pub fn resolutions(&self) -> u64 {
        self.succeeded + self.failed
    }
}
