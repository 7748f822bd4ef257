//! # One-Way Message Dispatcher
//!
//! Best-effort channel for named messages that are not router traffic.
//! Every listener subscribed to a message's name is consulted, in
//! subscription order. A message nobody listens to is dropped.

use crate::transport::Transport;
use shared_types::{FrameRoute, NamedMessage};
use std::fmt;
use tracing::{debug, trace};
use uuid::Uuid;

/// Handle returned by [`MessageDispatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receives one-way messages.
///
/// `reply` sends back to the process the message came from.
pub trait MessageListener: Send {
    /// Returns `true` when the message was handled.
    fn on_message(
        &mut self,
        route: &FrameRoute,
        reply: &dyn Transport,
        message: &NamedMessage,
    ) -> bool;
}

impl<F> MessageListener for F
where
    F: FnMut(&FrameRoute, &dyn Transport, &NamedMessage) -> bool + Send,
{
    fn on_message(
        &mut self,
        route: &FrameRoute,
        reply: &dyn Transport,
        message: &NamedMessage,
    ) -> bool {
        self(route, reply, message)
    }
}

struct Registration {
    id: ListenerId,
    name: String,
    listener: Box<dyn MessageListener>,
}

/// Name-keyed listener registry.
#[derive(Default)]
pub struct MessageDispatcher {
    listeners: Vec<Registration>,
    dispatched: u64,
    dropped: u64,
}

impl MessageDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen for messages called `name`.
    pub fn subscribe(
        &mut self,
        name: impl Into<String>,
        listener: impl MessageListener + 'static,
    ) -> ListenerId {
        let id = ListenerId(Uuid::new_v4());
        let name = name.into();
        debug!(listener = %id, name = %name, "Listener subscribed");
        self.listeners.push(Registration {
            id,
            name,
            listener: Box::new(listener),
        });
        id
    }

    /// Remove a listener. Returns `false` when it was not subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|registration| registration.id != id);
        before != self.listeners.len()
    }

    /// Offer `message` to every listener of its name.
    ///
    /// Returns `true` when at least one listener handled it.
    pub fn dispatch(
        &mut self,
        route: &FrameRoute,
        reply: &dyn Transport,
        message: &NamedMessage,
    ) -> bool {
        let mut consulted = 0usize;
        let mut handled = false;
        for registration in self
            .listeners
            .iter_mut()
            .filter(|registration| registration.name == message.name())
        {
            consulted += 1;
            handled |= registration.listener.on_message(route, reply, message);
        }

        if handled {
            self.dispatched += 1;
        } else {
            self.dropped += 1;
        }
        trace!(
            route = %route,
            message = %message.describe(),
            consulted,
            handled,
            "One-way message dispatched"
        );
        handled
    }

    /// Number of listeners for `name`.
    #[must_use]
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.iter().filter(|r| r.name == name).count()
    }

    /// Messages that at least one listener handled.
    #[must_use]
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Messages nobody handled.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
