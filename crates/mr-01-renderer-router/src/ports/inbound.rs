//! # Inbound Port - RendererRouterApi
//!
//! Driving port used by script entry points and by the boundary pump.
//!
//! | Method | Caller |
//! |--------|--------|
//! | `query` | Script, via the bound query function |
//! | `cancel` | Script, via the bound cancel function |
//! | `on_message_received` | Boundary, for every message from the browser |

use crate::domain::{Continuation, RendererError};
use shared_types::{ContextId, FrameRoute, NamedMessage, QueryId, QueryOutcome};

/// What script passes to the query function.
pub struct QueryRequest {
    pub request: String,
    pub persistent: bool,
    pub on_result: Continuation,
}

impl QueryRequest {
    /// A one-shot query.
    pub fn new(
        request: impl Into<String>,
        on_result: impl FnMut(QueryOutcome) + Send + 'static,
    ) -> Self {
        Self {
            request: request.into(),
            persistent: false,
            on_result: Box::new(on_result),
        }
    }

    /// Keep the query open after each success.
    #[must_use]
    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }
}

/// Primary API of the requesting-side router.
pub trait RendererRouterApi {
    /// Issue a query from `context`. Returns immediately with its id.
    ///
    /// # Errors
    /// - `UnknownContext`: `context` was never attached or is released
    /// - `Transport`: the browser process is unreachable; nothing is pending
    fn query(&mut self, context: ContextId, request: QueryRequest)
        -> Result<QueryId, RendererError>;

    /// Cancel a pending query owned by `context`.
    ///
    /// Returns `false`, and sends nothing, when the id is not pending.
    fn cancel(&mut self, context: ContextId, id: QueryId) -> bool;

    /// Offer a message from the browser. Returns `true` when it carried one
    /// of this router's names.
    fn on_message_received(&mut self, route: &FrameRoute, message: &NamedMessage) -> bool;

    /// Outstanding queries, optionally restricted to one context.
    fn pending_count(&self, context: Option<ContextId>) -> usize;
}
