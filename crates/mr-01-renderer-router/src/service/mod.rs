//! # Renderer Router Service
//!
//! The requesting side of one router pair.
//!
//! ## Architecture
//!
//! This service:
//! 1. Binds the query and cancel entry points into every attached script
//!    context
//! 2. Turns script calls into query-start and cancel messages
//! 3. Resolves pending continuations when responses arrive
//! 4. Drops a context's queries, silently, when the context is released


use crate::domain::{CorrelationTable, PendingQuery, RendererError, RendererStats};
use crate::ports::inbound::{QueryRequest, RendererRouterApi};
use crate::ports::outbound::{BindingError, ScriptContext};
use shared_bus::Transport;
use shared_types::{
    ConfigError, ContextId, FrameRoute, MessageNames, NamedMessage, QueryId, QueryOutcome,
    RouterConfig, RouterMessage,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Requesting-side router. Owned by one thread; see `shared_bus::executor`.
pub struct RendererRouter {
    config: RouterConfig,
    names: MessageNames,
    transport: Arc<dyn Transport>,
    /// Attached script contexts and the frame each belongs to.
    contexts: HashMap<ContextId, FrameRoute>,
    table: CorrelationTable,
    stats: RendererStats,
}

impl RendererRouter {
    /// Create a router. Fails when `config` is invalid.
    pub fn new(config: RouterConfig, transport: Arc<dyn Transport>) -> Result<Self, RendererError> {
        config.validate()?;
        let names = config.message_names();
        Ok(Self {
            config,
            names,
            transport,
            contexts: HashMap::new(),
            table: CorrelationTable::new(),
            stats: RendererStats::default(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    #[must_use]
    pub fn names(&self) -> &MessageNames {
        &self.names
    }

    #[must_use]
    pub fn stats(&self) -> RendererStats {
        self.stats
    }

    /// Frame a context belongs to, while it is attached.
    #[must_use]
    pub fn context_route(&self, context: ContextId) -> Option<&FrameRoute> {
        self.contexts.get(&context)
    }

    #[must_use]
    pub fn attached_contexts(&self) -> usize {
        self.contexts.len()
    }

    /// Attach a new script context: bind both entry points into it.
    ///
    /// Either both names are bound or neither is. A name already bound by
    /// another router is reported as [`ConfigError::NameCollision`].
    pub fn on_context_created(
        &mut self,
        route: FrameRoute,
        context: &mut dyn ScriptContext,
    ) -> Result<(), RendererError> {
        let id = context.id();
        if self.contexts.contains_key(&id) {
            return Err(RendererError::ContextAlreadyAttached(id));
        }

        context
            .bind_function(&self.names.query)
            .map_err(binding_error)?;
        if let Err(e) = context.bind_function(&self.names.cancel) {
            context.unbind_function(&self.names.query);
            return Err(binding_error(e));
        }

        debug!(
            context = %id,
            route = %route,
            query_function = %self.names.query,
            "Script context attached"
        );
        self.contexts.insert(id, route);
        Ok(())
    }

    /// Detach a released script context and drop its pending queries.
    ///
    /// No continuation runs and nothing is sent; the browser side cleans up
    /// on its own teardown notifications. Returns how many were dropped.
    pub fn on_context_released(&mut self, context: ContextId) -> usize {
        if self.contexts.remove(&context).is_none() {
            return 0;
        }
        let disposed = self.table.dispose_context(context);
        self.stats.disposed += disposed as u64;
        debug!(context = %context, disposed, "Script context released");
        disposed
    }

    fn deliver(&mut self, route: &FrameRoute, id: QueryId, outcome: QueryOutcome) {
        let owned_by_route = self
            .table
            .get(id)
            .and_then(|query| self.contexts.get(&query.context()))
            .is_some_and(|origin| origin.browser_id == route.browser_id);
        if !owned_by_route {
            self.stats.stale_responses += 1;
            debug!(route = %route, query_id = %id, "Discarding response for unknown query");
            return;
        }

        let success = outcome.is_success();
        if self.table.resolve(id, outcome) {
            if success {
                self.stats.succeeded += 1;
            } else {
                self.stats.failed += 1;
            }
            debug!(route = %route, query_id = %id, success, "Query resolved");
        }
    }
}

impl RendererRouterApi for RendererRouter {
    fn query(
        &mut self,
        context: ContextId,
        request: QueryRequest,
    ) -> Result<QueryId, RendererError> {
        let route = self
            .contexts
            .get(&context)
            .cloned()
            .ok_or(RendererError::UnknownContext(context))?;

        let QueryRequest {
            request,
            persistent,
            on_result,
        } = request;
        let id = self.table.allocate()?;
        self.table
            .register(id, PendingQuery::boxed(context, persistent, on_result))?;

        let message = RouterMessage::QueryStart {
            id,
            request,
            persistent,
        }
        .to_named(&self.names);
        if let Err(e) = self.transport.send(&route, &message) {
            self.table.cancel(id);
            return Err(e.into());
        }

        self.stats.issued += 1;
        debug!(
            route = %route,
            context = %context,
            query_id = %id,
            persistent,
            "Query issued"
        );
        Ok(id)
    }

    fn cancel(&mut self, context: ContextId, id: QueryId) -> bool {
        let owned = self
            .table
            .get(id)
            .is_some_and(|query| query.context() == context);
        if !owned {
            debug!(context = %context, query_id = %id, "Cancel for unknown query ignored");
            return false;
        }

        self.table.cancel(id);
        self.stats.canceled += 1;

        if let Some(route) = self.contexts.get(&context) {
            let message = RouterMessage::Cancel { id }.to_named(&self.names);
            if let Err(e) = self.transport.send(route, &message) {
                warn!(route = %route, query_id = %id, error = %e, "Cancel not delivered");
            }
            debug!(route = %route, query_id = %id, "Query canceled");
        }
        true
    }

    fn on_message_received(&mut self, route: &FrameRoute, message: &NamedMessage) -> bool {
        let parsed = match RouterMessage::parse(&self.names, message) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => return false,
            Err(e) => {
                self.stats.malformed += 1;
                warn!(route = %route, error = %e, "Discarding malformed router message");
                return true;
            }
        };

        match parsed {
            RouterMessage::Response { id, outcome } => self.deliver(route, id, outcome),
            RouterMessage::QueryStart { .. } | RouterMessage::Cancel { .. } => {
                self.stats.malformed += 1;
                warn!(
                    route = %route,
                    name = message.name(),
                    "Discarding query traffic addressed to the requesting side"
                );
            }
        }
        true
    }

    fn pending_count(&self, context: Option<ContextId>) -> usize {
        self.table.pending_count(context)
    }
}

fn binding_error(error: BindingError) -> RendererError {
    match error {
        BindingError::AlreadyBound(name) => RendererError::Config(ConfigError::NameCollision {
            name,
            owner: "another router in this script context".to_string(),
        }),
        other => RendererError::Binding(other),
    }
}
