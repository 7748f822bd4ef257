//! # Inbound Port - QueryHandler
//!
//! Application-supplied handlers that may accept and answer queries.
//!
//! A handler is consulted on the router's owner thread. It may answer
//! immediately, or keep the [`QueryCallback`] and answer later from any
//! thread.

use crate::domain::QueryCallback;
use shared_types::{FrameRoute, QueryId};

/// A query as seen by handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingQuery {
    /// Browser and frame the query came from, including the frame URL.
    pub route: FrameRoute,
    pub id: QueryId,
    pub request: String,
    pub persistent: bool,
}

impl IncomingQuery {
    /// URL of the originating frame.
    #[must_use]
    pub fn origin_url(&self) -> &str {
        &self.route.frame.url
    }
}

/// Capability to answer queries.
///
/// Handlers are registered as `Arc<dyn QueryHandler>`; the same `Arc` is the
/// handler's identity for removal and cancellation.
pub trait QueryHandler: Send + Sync {
    /// Decide whether to take `query`.
    ///
    /// Return `true` to accept it; the query is then answered through
    /// `callback`, now or later. Return `false` to let the next handler
    /// try; `callback` is then inert.
    fn on_query(&self, query: &IncomingQuery, callback: QueryCallback) -> bool;

    /// An accepted query was canceled before it completed. Any retained
    /// callback is already inert.
    fn on_query_canceled(&self, _query: &IncomingQuery) {}
}
