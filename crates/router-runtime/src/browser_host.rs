//! # Browser Host
//!
//! Everything the browser process does with the boundary: the answering
//! routers, their handlers and the application's one-way messages.
//!
//! ## One-Way Messages
//!
//! | Received | Reaction |
//! |----------|----------|
//! | `roomOpen` | Send `exposeFunction("testFunction", ..)` back |
//! | `roomClosed` | Acknowledge |
//! | `testFunction` | Acknowledge |
//!
//! On main-frame navigation the host sends `exposeFunction("roomOpen")` and
//! `exposeFunction("roomClosed")` so the new page can open a room.

use crate::boundary::{is_malformed, message_kind};
use crate::config::RuntimeConfig;
use crate::errors::RuntimeError;
use crate::handlers::{AcknowledgeHandler, ReverseHandler};
use crate::renderer_host::EXPOSE_FUNCTION_MESSAGE;
use mr_02_browser_router::{BrowserRouter, BrowserStats, CompletionNotifier, QueryHandler};
use router_telemetry::{log_event, metrics};
use shared_bus::{MessageDispatcher, Transport};
use shared_types::{
    BrowserId, FrameInfo, FrameRoute, FunctionNamespace, MessageNames, NamedMessage,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const ROOM_OPEN_MESSAGE: &str = "roomOpen";
pub const ROOM_CLOSED_MESSAGE: &str = "roomClosed";
pub const TEST_FUNCTION_MESSAGE: &str = "testFunction";

/// Script body shipped with an exposed function.
const TEST_FUNCTION_SOURCE: &str = "function testFunction() {}";

const PROCESS: &str = "browser";

/// A router and the handlers installed on it while browsers exist.
struct RouterSlot {
    owner: &'static str,
    router: BrowserRouter,
    handlers: Vec<Arc<dyn QueryHandler>>,
}

pub struct BrowserHost {
    transport: Arc<dyn Transport>,
    routers: Vec<RouterSlot>,
    namespace: FunctionNamespace,
    dispatcher: MessageDispatcher,
    browsers: HashMap<BrowserId, FrameInfo>,
    handlers_installed: bool,
}

impl BrowserHost {
    /// Create the default and custom routers of `config`. Handlers are
    /// installed when the first browser is created.
    pub fn new(config: &RuntimeConfig, transport: Arc<dyn Transport>) -> Result<Self, RuntimeError> {
        let namespace = config.namespace()?;
        let mut routers = Vec::new();
        for (owner, router_config) in config.routers() {
            let handler: Arc<dyn QueryHandler> = match owner {
                "default" => Arc::new(ReverseHandler::new(config.startup_url.clone())),
                _ => Arc::new(AcknowledgeHandler::new(config.startup_url.clone())),
            };
            routers.push(RouterSlot {
                owner,
                router: BrowserRouter::new(router_config.clone(), transport.clone())?,
                handlers: vec![handler],
            });
        }

        let mut dispatcher = MessageDispatcher::new();
        dispatcher.subscribe(ROOM_OPEN_MESSAGE, on_room_open);
        dispatcher.subscribe(ROOM_CLOSED_MESSAGE, acknowledge);
        dispatcher.subscribe(TEST_FUNCTION_MESSAGE, acknowledge);

        Ok(Self {
            transport,
            routers,
            namespace,
            dispatcher,
            browsers: HashMap::new(),
            handlers_installed: false,
        })
    }

    /// Ask every router to wake the owner after a callback answers.
    pub fn set_completion_notifier(&mut self, notifier: impl Fn() + Send + Sync + 'static) {
        let notifier: CompletionNotifier = Arc::new(notifier);
        for slot in &mut self.routers {
            let notifier = notifier.clone();
            slot.router.set_completion_notifier(move || notifier());
        }
    }

    /// A browser window exists. The first one installs the handlers.
    pub fn on_after_created(&mut self, browser: BrowserId, main_frame: FrameInfo) {
        if !self.handlers_installed {
            for slot in &mut self.routers {
                for handler in &slot.handlers {
                    slot.router.add_handler(handler.clone(), false);
                }
            }
            self.handlers_installed = true;
            debug!("Query handlers installed");
        }
        self.browsers.insert(browser, main_frame);
        log_event!(info, PROCESS, "Browser created", browser = %browser, browsers = self.browsers.len());
    }

    /// A browser window is closing. The last one removes the handlers.
    pub fn on_before_close(&mut self, browser: BrowserId) {
        let dropped: usize = self
            .routers
            .iter_mut()
            .map(|slot| slot.router.on_before_close(browser))
            .sum();
        self.browsers.remove(&browser);

        if self.browsers.is_empty() && self.handlers_installed {
            for slot in &mut self.routers {
                for handler in &slot.handlers {
                    slot.router.remove_handler(handler);
                }
            }
            self.handlers_installed = false;
            debug!("Last browser closed, query handlers removed");
        }
        self.publish_pending();
        log_event!(info, PROCESS, "Browser closed", browser = %browser, dropped);
    }

    /// A frame of `browser` starts navigating.
    pub fn on_before_browse(&mut self, browser: BrowserId, frame: &FrameInfo) {
        for slot in &mut self.routers {
            slot.router.on_before_browse(browser, frame);
        }
        if frame.is_main {
            self.browsers.insert(browser, frame.clone());
            let route = FrameRoute::new(browser, frame.clone());
            for name in [ROOM_OPEN_MESSAGE, ROOM_CLOSED_MESSAGE] {
                let message = NamedMessage::new(EXPOSE_FUNCTION_MESSAGE).with_arg(name);
                if let Err(e) = self.transport.send(&route, &message) {
                    warn!(browser = %browser, function = name, error = %e, "Failed to expose function");
                }
            }
        }
        self.publish_pending();
    }

    pub fn on_render_process_terminated(&mut self, browser: BrowserId) {
        let dropped: usize = self
            .routers
            .iter_mut()
            .map(|slot| slot.router.on_render_process_terminated(browser))
            .sum();
        self.publish_pending();
        log_event!(warn, PROCESS, "Render process terminated", browser = %browser, dropped);
    }

    /// Offer a message from the renderer to every router and listener.
    ///
    /// Returns `true` when any of them handled it.
    pub fn on_process_message_received(&mut self, route: &FrameRoute, message: &NamedMessage) -> bool {
        let names = self.router_names();
        metrics::record_received(PROCESS, message_kind(&names, message.name()));
        if is_malformed(&names, message) {
            metrics::record_discarded(PROCESS, "malformed");
        }

        let mut handled = false;
        for slot in &mut self.routers {
            handled |= slot.router.on_message_received(route, message);
        }
        handled |= self
            .dispatcher
            .dispatch(route, self.transport.as_ref(), message);

        if !handled {
            metrics::record_discarded(PROCESS, "unhandled");
            debug!(route = %route, message = %message.describe(), "Message not handled");
        }
        self.publish_pending();
        handled
    }

    /// Apply queued handler answers on every router.
    pub fn process_completions(&mut self) -> usize {
        let delivered = self
            .routers
            .iter_mut()
            .map(|slot| slot.router.process_completions())
            .sum();
        self.publish_pending();
        delivered
    }

    /// Add an application handler to the router labelled `owner`.
    pub fn add_handler(&mut self, owner: &str, handler: Arc<dyn QueryHandler>, first: bool) -> bool {
        self.routers
            .iter_mut()
            .find(|slot| slot.owner == owner)
            .is_some_and(|slot| slot.router.add_handler(handler, first))
    }

    /// Remove an application handler from the router labelled `owner`. Its
    /// outstanding queries fail with the canceled code.
    pub fn remove_handler(&mut self, owner: &str, handler: &Arc<dyn QueryHandler>) -> bool {
        let removed = self
            .routers
            .iter_mut()
            .find(|slot| slot.owner == owner)
            .is_some_and(|slot| slot.router.remove_handler(handler));
        self.publish_pending();
        removed
    }

    #[must_use]
    pub fn browser_count(&self) -> usize {
        self.browsers.len()
    }

    #[must_use]
    pub fn main_frame(&self, browser: BrowserId) -> Option<&FrameInfo> {
        self.browsers.get(&browser)
    }

    #[must_use]
    pub fn handlers_installed(&self) -> bool {
        self.handlers_installed
    }

    /// Unregister every handler of every router. Outstanding queries are
    /// canceled and their requesters get the canceled failure.
    pub fn remove_all_handlers(&mut self) -> usize {
        let removed = self
            .routers
            .iter_mut()
            .map(|slot| slot.router.remove_all_handlers())
            .sum();
        self.handlers_installed = false;
        self.publish_pending();
        log_event!(info, PROCESS, "All query handlers removed", removed);
        removed
    }

    /// Handlers registered on the router labelled `owner`.
    #[must_use]
    pub fn handler_count(&self, owner: &str) -> usize {
        self.routers
            .iter()
            .find(|slot| slot.owner == owner)
            .map_or(0, |slot| slot.router.handler_count())
    }

    #[must_use]
    pub fn pending_count(&self, browser: Option<BrowserId>) -> usize {
        self.routers
            .iter()
            .map(|slot| slot.router.pending_count(browser, None))
            .sum()
    }

    /// Per-router counters, labelled.
    #[must_use]
    pub fn stats(&self) -> Vec<(&'static str, BrowserStats)> {
        self.routers
            .iter()
            .map(|slot| (slot.owner, slot.router.stats()))
            .collect()
    }

    #[must_use]
    pub fn namespace(&self) -> &FunctionNamespace {
        &self.namespace
    }

    #[must_use]
    pub fn dispatcher(&self) -> &MessageDispatcher {
        &self.dispatcher
    }

    fn router_names(&self) -> Vec<MessageNames> {
        self.routers
            .iter()
            .map(|slot| slot.router.names().clone())
            .collect()
    }

    fn publish_pending(&self) {
        metrics::set_pending(PROCESS, self.pending_count(None));
    }
}

fn on_room_open(route: &FrameRoute, reply: &dyn Transport, _message: &NamedMessage) -> bool {
    info!(route = %route, "Room opened");
    let expose = NamedMessage::new(EXPOSE_FUNCTION_MESSAGE)
        .with_arg(TEST_FUNCTION_MESSAGE)
        .with_arg(TEST_FUNCTION_SOURCE);
    if let Err(e) = reply.send(route, &expose) {
        warn!(route = %route, error = %e, "Failed to expose test function");
    }
    true
}

fn acknowledge(route: &FrameRoute, _reply: &dyn Transport, message: &NamedMessage) -> bool {
    info!(route = %route, name = message.name(), "One-way message acknowledged");
    true
}
