//! # Browser Router Service
//!
//! The answering side of one router pair.
//!
//! ## Architecture
//!
//! This service:
//! 1. Dispatches query-start messages to registered handlers in order
//! 2. Answers unaccepted queries at once with the "no handler" failure
//! 3. Turns queued callback answers into response messages
//! 4. Drops outstanding queries on cancel, handler removal and teardown,
//!    telling the handler each time


use crate::domain::{
    BrowserRouterError, BrowserStats, Completion, CompletionNotifier, HandlerRegistry,
    QueryCallback, QueryKey,
};
use crate::ports::inbound::{IncomingQuery, QueryHandler};
use shared_bus::Transport;
use shared_types::{
    BrowserId, FrameInfo, FrameRoute, MessageNames, NamedMessage, QueryId, QueryOutcome,
    RouterConfig, RouterMessage,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// An accepted query awaiting its answer.
struct PendingEntry {
    query: IncomingQuery,
    handler: Arc<dyn QueryHandler>,
    token: u64,
    done: Arc<AtomicBool>,
}

/// Answering-side router. Owned by one thread; see `shared_bus::executor`.
pub struct BrowserRouter {
    config: RouterConfig,
    names: MessageNames,
    transport: Arc<dyn Transport>,
    registry: HandlerRegistry,
    pending: HashMap<QueryKey, PendingEntry>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    notifier: Option<CompletionNotifier>,
    next_token: u64,
    stats: BrowserStats,
}

impl BrowserRouter {
    /// Create a router. Fails when `config` is invalid.
    pub fn new(
        config: RouterConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, BrowserRouterError> {
        config.validate()?;
        let names = config.message_names();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Ok(Self {
            config,
            names,
            transport,
            registry: HandlerRegistry::new(),
            pending: HashMap::new(),
            completions_tx,
            completions_rx,
            notifier: None,
            next_token: 0,
            stats: BrowserStats::default(),
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
    pub fn stats(&self) -> BrowserStats {
        self.stats
    }

    /// Called from any thread after a callback queues an answer. Should
    /// arrange for [`Self::process_completions`] to run on the owner thread.
    ///
    /// Affects callbacks created after this call.
    pub fn set_completion_notifier(&mut self, notifier: impl Fn() + Send + Sync + 'static) {
        self.notifier = Some(Arc::new(notifier));
    }

    /// Register a handler. `first` puts it ahead of existing handlers.
    ///
    /// Returns `false` when it is already registered.
    pub fn add_handler(&mut self, handler: Arc<dyn QueryHandler>, first: bool) -> bool {
        let added = self.registry.add(handler, first);
        debug!(
            router = %self.names.query,
            first,
            added,
            handlers = self.registry.len(),
            "Handler registration"
        );
        added
    }

    /// Unregister a handler. Its outstanding queries are canceled: the
    /// renderer gets the canceled failure and the handler is notified.
    ///
    /// Returns `false` when it was not registered.
    pub fn remove_handler(&mut self, handler: &Arc<dyn QueryHandler>) -> bool {
        if !self.registry.remove(handler) {
            return false;
        }
        let canceled = self.cancel_matching(None, Some(handler), true);
        debug!(router = %self.names.query, canceled, "Handler removed");
        true
    }

    /// Unregister every handler, canceling all outstanding queries.
    pub fn remove_all_handlers(&mut self) -> usize {
        let removed = self.registry.clear();
        self.cancel_matching(None, None, true);
        removed.len()
    }

    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.registry.len()
    }

    /// Cancel outstanding queries, optionally restricted to one browser
    /// and/or one handler. The renderer gets the canceled failure.
    pub fn cancel_pending(
        &mut self,
        browser: Option<BrowserId>,
        handler: Option<&Arc<dyn QueryHandler>>,
    ) -> usize {
        self.cancel_matching(browser, handler, true)
    }

    /// Outstanding queries, optionally restricted to one browser and/or
    /// one handler.
    #[must_use]
    pub fn pending_count(
        &self,
        browser: Option<BrowserId>,
        handler: Option<&Arc<dyn QueryHandler>>,
    ) -> usize {
        self.pending
            .values()
            .filter(|entry| entry_matches(entry, browser, handler))
            .count()
    }

    /// The browser is closing. Its queries are dropped without telling the
    /// renderer.
    pub fn on_before_close(&mut self, browser: BrowserId) -> usize {
        self.cancel_matching(Some(browser), None, false)
    }

    /// The renderer process hosting `browser` died.
    pub fn on_render_process_terminated(&mut self, browser: BrowserId) -> usize {
        self.cancel_matching(Some(browser), None, false)
    }

    /// A frame of `browser` is navigating. Main-frame navigation tears down
    /// every script context of the browser, so its queries are dropped.
    pub fn on_before_browse(&mut self, browser: BrowserId, frame: &FrameInfo) -> usize {
        if !frame.is_main {
            return 0;
        }
        self.cancel_matching(Some(browser), None, false)
    }

    /// Offer a message from the renderer. Returns `true` when it carried one
    /// of this router's names.
    pub fn on_message_received(&mut self, route: &FrameRoute, message: &NamedMessage) -> bool {
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
            RouterMessage::QueryStart {
                id,
                request,
                persistent,
            } => self.on_query_start(route, id, request, persistent),
            RouterMessage::Cancel { id } => self.on_cancel(route, id),
            RouterMessage::Response { .. } => {
                self.stats.malformed += 1;
                warn!(
                    route = %route,
                    name = message.name(),
                    "Discarding response addressed to the answering side"
                );
            }
        }
        true
    }

    /// Apply every queued callback answer. Returns how many produced a
    /// response.
    pub fn process_completions(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            if self.apply_completion(completion) {
                delivered += 1;
            }
        }
        delivered
    }

    fn on_query_start(
        &mut self,
        route: &FrameRoute,
        id: QueryId,
        request: String,
        persistent: bool,
    ) {
        let key = (route.browser_id, id);
        if self.pending.contains_key(&key) {
            self.stats.malformed += 1;
            warn!(
                route = %route,
                query_id = %id,
                "Discarding query with an id already pending"
            );
            return;
        }
        self.stats.queries_received += 1;

        let query = IncomingQuery {
            route: route.clone(),
            id,
            request,
            persistent,
        };

        let sender = &self.completions_tx;
        let notifier = &self.notifier;
        let next_token = &mut self.next_token;
        let accepted = self.registry.dispatch(&query, || {
            *next_token += 1;
            QueryCallback::new(key, *next_token, persistent, sender.clone(), notifier.clone())
        });

        match accepted {
            Some((handler, callback)) => {
                debug!(route = %route, query_id = %id, persistent, "Query accepted");
                self.pending.insert(
                    key,
                    PendingEntry {
                        query,
                        handler,
                        token: callback.token(),
                        done: callback.done_flag(),
                    },
                );
                // The handler may already have answered.
                self.process_completions();
            }
            None => {
                self.stats.unhandled += 1;
                debug!(route = %route, query_id = %id, "No handler accepted query");
                self.send_response(route, id, QueryOutcome::no_handler());
            }
        }
    }

    fn on_cancel(&mut self, route: &FrameRoute, id: QueryId) {
        let key = (route.browser_id, id);
        let Some(entry) = self.pending.remove(&key) else {
            self.stats.stale += 1;
            debug!(route = %route, query_id = %id, "Cancel for unknown query ignored");
            return;
        };
        entry.done.store(true, Ordering::Release);
        self.stats.canceled_by_renderer += 1;
        debug!(route = %route, query_id = %id, "Query canceled by renderer");
        entry.handler.on_query_canceled(&entry.query);
    }

    fn apply_completion(&mut self, completion: Completion) -> bool {
        let Completion {
            key,
            token,
            outcome,
        } = completion;

        let ends = match self.pending.get(&key) {
            Some(entry) if entry.token == token => {
                !(entry.query.persistent && outcome.is_success())
            }
            _ => {
                self.stats.stale += 1;
                debug!(
                    query_id = %key.1,
                    browser = %key.0,
                    "Discarding answer for unknown query"
                );
                return false;
            }
        };

        let route = if ends {
            match self.pending.remove(&key) {
                Some(entry) => entry.query.route,
                None => return false,
            }
        } else {
            match self.pending.get(&key) {
                Some(entry) => entry.query.route.clone(),
                None => return false,
            }
        };
        self.send_response(&route, key.1, outcome)
    }

    fn cancel_matching(
        &mut self,
        browser: Option<BrowserId>,
        handler: Option<&Arc<dyn QueryHandler>>,
        notify_renderer: bool,
    ) -> usize {
        let keys: Vec<QueryKey> = self
            .pending
            .iter()
            .filter(|(_, entry)| entry_matches(entry, browser, handler))
            .map(|(key, _)| *key)
            .collect();

        for key in &keys {
            let Some(entry) = self.pending.remove(key) else {
                continue;
            };
            entry.done.store(true, Ordering::Release);
            self.stats.canceled_locally += 1;
            if notify_renderer {
                self.send_response(&entry.query.route, entry.query.id, QueryOutcome::canceled());
            }
            entry.handler.on_query_canceled(&entry.query);
        }

        if !keys.is_empty() {
            debug!(
                router = %self.names.query,
                browser = ?browser,
                canceled = keys.len(),
                notify_renderer,
                "Pending queries canceled"
            );
        }
        keys.len()
    }

    fn send_response(&mut self, route: &FrameRoute, id: QueryId, outcome: QueryOutcome) -> bool {
        let message = RouterMessage::Response { id, outcome }.to_named(&self.names);
        match self.transport.send(route, &message) {
            Ok(()) => {
                self.stats.responses_sent += 1;
                true
            }
            Err(e) => {
                self.stats.send_failures += 1;
                warn!(route = %route, query_id = %id, error = %e, "Response not delivered");
                false
            }
        }
    }
}

impl Drop for BrowserRouter {
    fn drop(&mut self) {
        self.cancel_matching(None, None, false);
    }
}

fn entry_matches(
    entry: &PendingEntry,
    browser: Option<BrowserId>,
    handler: Option<&Arc<dyn QueryHandler>>,
) -> bool {
    browser.map_or(true, |b| entry.query.route.browser_id == b)
        && handler.map_or(true, |h| Arc::ptr_eq(&entry.handler, h))
}
