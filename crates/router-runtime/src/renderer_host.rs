//! # Renderer Host
//!
//! Everything the renderer process does with the boundary: one requesting
//! router per router pair, the script contexts they bind into, and native
//! functions that send one-way messages to the browser.
//!
//! ## Native Functions
//!
//! Every context gets [`VERSION_FUNCTION`]. The browser adds more with the
//! `exposeFunction(name, source?)` message; an exposed function is bound in
//! the browser's main-frame context, now or as soon as one is created.
//! Calling an exposed function sends a message named after it.

use crate::boundary::{is_malformed, message_kind};
use crate::config::RuntimeConfig;
use crate::errors::RuntimeError;
use crate::script::{InMemoryScriptContext, ScriptRegistry, SharedScriptRegistry};
use mr_01_renderer_router::{
    BindingError, QueryRequest, RendererError, RendererRouter, RendererRouterApi, RendererStats,
    ScriptContext,
};
use parking_lot::Mutex;
use router_telemetry::{log_event, log_query_event, metric_inc, metrics};
use shared_bus::{MessageDispatcher, MessageListener, Transport};
use shared_types::{
    ContextId, FrameRoute, FunctionNamespace, MessageNames, NamedMessage, QueryId, QueryOutcome,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const EXPOSE_FUNCTION_MESSAGE: &str = "exposeFunction";

/// Native function every context starts with.
pub const VERSION_FUNCTION: &str = "cefVersion";

pub const VERSION_STRING: &str = concat!("message-router v", env!("CARGO_PKG_VERSION"));

const PROCESS: &str = "renderer";

struct RouterEntry {
    owner: &'static str,
    router: RendererRouter,
}

pub struct RendererHost {
    transport: Arc<dyn Transport>,
    routers: Vec<RouterEntry>,
    namespace: FunctionNamespace,
    scripts: SharedScriptRegistry,
    dispatcher: MessageDispatcher,
    next_context: u64,
}

impl RendererHost {
    pub fn new(config: &RuntimeConfig, transport: Arc<dyn Transport>) -> Result<Self, RuntimeError> {
        let namespace = config.namespace()?;
        let mut routers = Vec::new();
        for (owner, router_config) in config.routers() {
            routers.push(RouterEntry {
                owner,
                router: RendererRouter::new(router_config.clone(), transport.clone())?,
            });
        }

        let scripts: SharedScriptRegistry = Arc::new(Mutex::new(ScriptRegistry::default()));
        let mut dispatcher = MessageDispatcher::new();
        dispatcher.subscribe(
            EXPOSE_FUNCTION_MESSAGE,
            ExposeFunctionListener {
                scripts: scripts.clone(),
            },
        );

        Ok(Self {
            transport,
            routers,
            namespace,
            scripts,
            dispatcher,
            next_context: 0,
        })
    }

    /// A frame created its script context. Binds the native functions and
    /// every router's entry points.
    pub fn on_context_created(&mut self, route: FrameRoute) -> Result<ContextId, RuntimeError> {
        self.next_context += 1;
        let id = ContextId(self.next_context);
        let mut context = InMemoryScriptContext::new(id, route.clone());
        context
            .bind_function(VERSION_FUNCTION)
            .map_err(RendererError::Binding)?;

        for attached in 0..self.routers.len() {
            if let Err(e) = self.routers[attached]
                .router
                .on_context_created(route.clone(), &mut context)
            {
                for entry in &mut self.routers[..attached] {
                    entry.router.on_context_released(id);
                }
                context.release();
                return Err(e.into());
            }
        }

        let mut scripts = self.scripts.lock();
        if route.frame.is_main {
            for name in scripts.exposed(route.browser_id) {
                bind_exposed(&mut context, &name);
            }
        }
        scripts.insert(context);
        log_event!(info, PROCESS, "Script context created", context = %id, route = %route);
        Ok(id)
    }

    /// A script context went away. Its pending queries are dropped without
    /// running their continuations.
    pub fn on_context_released(&mut self, context: ContextId) -> usize {
        let Some(released) = self.scripts.lock().remove(context) else {
            return 0;
        };
        let disposed = self
            .routers
            .iter_mut()
            .map(|entry| entry.router.on_context_released(context))
            .sum();
        released.release();
        self.publish_pending();
        log_event!(info, PROCESS, "Script context released", context = %context, disposed);
        disposed
    }

    /// Script called the query function `function` in `context`.
    pub fn query(
        &mut self,
        context: ContextId,
        function: &str,
        request: QueryRequest,
    ) -> Result<QueryId, RuntimeError> {
        let script = self.require_bound(context, function)?;
        let entry = self
            .routers
            .iter_mut()
            .find(|entry| entry.router.names().query == function)
            .ok_or_else(|| RuntimeError::UnknownFunction {
                context,
                name: function.to_string(),
            })?;

        let id = entry.router.query(context, metered(request))?;
        metric_inc!(metrics::QUERIES_ISSUED);
        log_query_event!(
            debug,
            PROCESS,
            "Query issued",
            script.route(),
            id,
            context = %context,
            router = entry.owner
        );
        self.publish_pending();
        Ok(id)
    }

    /// Script called the cancel function `function` in `context`.
    pub fn cancel(
        &mut self,
        context: ContextId,
        function: &str,
        id: QueryId,
    ) -> Result<bool, RuntimeError> {
        let script = self.require_bound(context, function)?;
        let entry = self
            .routers
            .iter_mut()
            .find(|entry| entry.router.names().cancel == function)
            .ok_or_else(|| RuntimeError::UnknownFunction {
                context,
                name: function.to_string(),
            })?;

        let canceled = entry.router.cancel(context, id);
        if canceled {
            metric_inc!(metrics::QUERIES_CANCELED);
        }
        log_query_event!(debug, PROCESS, "Query cancel requested", script.route(), id, canceled);
        self.publish_pending();
        Ok(canceled)
    }

    /// Script called a native function. Returns the function's value.
    pub fn call_function(&mut self, context: ContextId, name: &str) -> Result<String, RuntimeError> {
        let script = self.require_bound(context, name)?;
        if self.routers.iter().any(|entry| entry.router.names().owns(name)) {
            return Err(RuntimeError::EntryPoint(name.to_string()));
        }
        if name == VERSION_FUNCTION {
            return Ok(VERSION_STRING.to_string());
        }

        self.transport
            .send(script.route(), &NamedMessage::new(name))?;
        info!(context = %context, function = name, "Native function sent message");
        Ok(format!("{name} called"))
    }

    /// Offer a message from the browser. Router traffic goes to the routers,
    /// anything else to the one-way listeners.
    pub fn on_process_message_received(&mut self, route: &FrameRoute, message: &NamedMessage) -> bool {
        let names = self.router_names();
        let kind = message_kind(&names, message.name());
        metrics::record_received(PROCESS, kind);
        if is_malformed(&names, message) {
            metrics::record_discarded(PROCESS, "malformed");
        }

        let handled = if kind == "router" {
            self.routers
                .iter_mut()
                .fold(false, |handled, entry| {
                    entry.router.on_message_received(route, message) || handled
                })
        } else {
            self.dispatcher
                .dispatch(route, self.transport.as_ref(), message)
        };

        if !handled {
            metrics::record_discarded(PROCESS, "unhandled");
            debug!(route = %route, message = %message.describe(), "Message not handled");
        }
        self.publish_pending();
        handled
    }

    #[must_use]
    pub fn context(&self, id: ContextId) -> Option<InMemoryScriptContext> {
        self.scripts.lock().get(id).cloned()
    }

    #[must_use]
    pub fn context_count(&self) -> usize {
        self.scripts.lock().len()
    }

    #[must_use]
    pub fn pending_count(&self, context: Option<ContextId>) -> usize {
        self.routers
            .iter()
            .map(|entry| entry.router.pending_count(context))
            .sum()
    }

    /// Per-router counters, labelled.
    #[must_use]
    pub fn stats(&self) -> Vec<(&'static str, RendererStats)> {
        self.routers
            .iter()
            .map(|entry| (entry.owner, entry.router.stats()))
            .collect()
    }

    #[must_use]
    pub fn namespace(&self) -> &FunctionNamespace {
        &self.namespace
    }

    fn require_bound(
        &self,
        context: ContextId,
        name: &str,
    ) -> Result<InMemoryScriptContext, RuntimeError> {
        let script = self
            .context(context)
            .ok_or(RuntimeError::UnknownContext(context))?;
        if !script.is_bound(name) {
            return Err(RuntimeError::UnknownFunction {
                context,
                name: name.to_string(),
            });
        }
        Ok(script)
    }

    fn router_names(&self) -> Vec<MessageNames> {
        self.routers
            .iter()
            .map(|entry| entry.router.names().clone())
            .collect()
    }

    fn publish_pending(&self) {
        metrics::set_pending(PROCESS, self.pending_count(None));
    }
}

/// Count the resolution before script sees it.
fn metered(mut request: QueryRequest) -> QueryRequest {
    let mut on_result = request.on_result;
    request.on_result = Box::new(move |outcome: QueryOutcome| {
        metrics::record_resolution(outcome.is_success());
        on_result(outcome);
    });
    request
}

fn bind_exposed(context: &mut InMemoryScriptContext, name: &str) {
    match context.bind_function(name) {
        Ok(()) => info!(context = %context.id(), function = name, "Function exposed"),
        Err(BindingError::AlreadyBound(_)) => {
            debug!(context = %context.id(), function = name, "Function already exposed");
        }
        Err(e) => warn!(context = %context.id(), function = name, error = %e, "Cannot expose function"),
    }
}

/// Binds functions the browser asks for into the main-frame context.
struct ExposeFunctionListener {
    scripts: SharedScriptRegistry,
}

impl MessageListener for ExposeFunctionListener {
    fn on_message(
        &mut self,
        route: &FrameRoute,
        _reply: &dyn Transport,
        message: &NamedMessage,
    ) -> bool {
        let Some(name) = message.string_arg(0) else {
            warn!(route = %route, message = %message.describe(), "exposeFunction without a name");
            metrics::record_discarded(PROCESS, "malformed");
            return false;
        };

        let mut scripts = self.scripts.lock();
        scripts.expose(route.browser_id, name);
        match scripts.main_frame(route.browser_id).cloned() {
            Some(mut context) => bind_exposed(&mut context, name),
            None => debug!(
                browser = %route.browser_id,
                function = name,
                "No main-frame context yet, exposure deferred"
            ),
        }
        true
    }
}
