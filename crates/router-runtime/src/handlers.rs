//! # Demo Query Handlers
//!
//! Both handlers only answer frames showing the startup URL; anything else
//! is left for the next handler.

use mr_02_browser_router::{IncomingQuery, QueryCallback, QueryHandler};
use tracing::{debug, info};

/// Request prefix understood by [`ReverseHandler`].
pub const REVERSE_PREFIX: &str = "MessageRouterTest";

/// Fixed answer of [`AcknowledgeHandler`].
pub const ACKNOWLEDGEMENT: &str = "result";

fn from_startup_url(query: &IncomingQuery, startup_url: &str) -> bool {
    query.origin_url().starts_with(startup_url)
}

/// Answers `MessageRouterTest:<text>` with `<text>` reversed.
pub struct ReverseHandler {
    startup_url: String,
}

impl ReverseHandler {
    pub fn new(startup_url: impl Into<String>) -> Self {
        Self {
            startup_url: startup_url.into(),
        }
    }

    /// The answer for `request`, or `None` when it is not a reverse request.
    #[must_use]
    pub fn reverse(request: &str) -> Option<String> {
        let rest = request.strip_prefix(REVERSE_PREFIX)?;
        let mut chars = rest.chars();
        // One separator character follows the prefix.
        chars.next();
        Some(chars.rev().collect())
    }
}

impl QueryHandler for ReverseHandler {
    fn on_query(&self, query: &IncomingQuery, callback: QueryCallback) -> bool {
        if !from_startup_url(query, &self.startup_url) {
            debug!(url = query.origin_url(), "Reverse handler ignoring foreign frame");
            return false;
        }
        let Some(result) = Self::reverse(&query.request) else {
            return false;
        };
        info!(query_id = %query.id, result = %result, "Reverse handler answering");
        callback.success(result);
        true
    }
}

/// Accepts every request from the startup URL and answers
/// [`ACKNOWLEDGEMENT`].
///
/// Persistent queries stay open after the acknowledgement until the
/// renderer cancels them.
pub struct AcknowledgeHandler {
    startup_url: String,
}

impl AcknowledgeHandler {
    pub fn new(startup_url: impl Into<String>) -> Self {
        Self {
            startup_url: startup_url.into(),
        }
    }
}

impl QueryHandler for AcknowledgeHandler {
    fn on_query(&self, query: &IncomingQuery, callback: QueryCallback) -> bool {
        if !from_startup_url(query, &self.startup_url) {
            return false;
        }
        info!(
            query_id = %query.id,
            request = %query.request,
            persistent = query.persistent,
            "Acknowledging query"
        );
        callback.success(ACKNOWLEDGEMENT);
        true
    }

    fn on_query_canceled(&self, query: &IncomingQuery) {
        info!(query_id = %query.id, "Acknowledged query canceled");
    }
}
