//! # Process Boundary
//!
//! Connects the two hosts: each side sends through a [`MeteredTransport`],
//! and a pump task per direction opens arriving envelopes and posts them to
//! the receiving host's owner thread.
//!
//! ```text
//!  RendererHost ──MeteredTransport──▶ channel ──pump──▶ OwnerHandle<BrowserHost>
//!  BrowserHost  ──MeteredTransport──▶ channel ──pump──▶ OwnerHandle<RendererHost>
//! ```

use router_telemetry::metrics;
use shared_bus::{EnvelopeReceiver, OwnerHandle, Transport, TransportError};
use shared_types::{FrameRoute, MessageNames, NamedMessage, ProcessRole, RouterMessage};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

/// Metric label for a message: router traffic or one-way.
#[must_use]
pub fn message_kind(routers: &[MessageNames], name: &str) -> &'static str {
    if routers.iter().any(|names| names.owns(name)) {
        "router"
    } else {
        "oneway"
    }
}

/// A message carrying a router name without that router's layout. The
/// router consumes it with a warning; it still counts as discarded.
#[must_use]
pub fn is_malformed(routers: &[MessageNames], message: &NamedMessage) -> bool {
    routers
        .iter()
        .any(|names| RouterMessage::parse(names, message).is_err())
}

/// Counts every message sent through the wrapped transport.
pub struct MeteredTransport<T> {
    inner: T,
    routers: Vec<MessageNames>,
}

impl<T: Transport> MeteredTransport<T> {
    /// `routers` are the names of every router pair of the session.
    pub fn new(inner: T, routers: Vec<MessageNames>) -> Self {
        Self { inner, routers }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: Transport> Transport for MeteredTransport<T> {
    fn send(&self, route: &FrameRoute, message: &NamedMessage) -> Result<(), TransportError> {
        let process = self.inner.source().as_str();
        match self.inner.send(route, message) {
            Ok(()) => {
                metrics::record_sent(process, message_kind(&self.routers, message.name()));
                Ok(())
            }
            Err(e) => {
                metrics::record_discarded(process, "send_failed");
                Err(e)
            }
        }
    }

    fn source(&self) -> ProcessRole {
        self.inner.source()
    }
}

/// Entry point a pump delivers into.
pub type Deliver<S> = fn(&mut S, &FrameRoute, &NamedMessage) -> bool;

/// Forward every envelope from `receiver` to the owner behind `owner`.
///
/// Ends when the sending side is gone or the owner has stopped; resolves
/// to the number of messages forwarded.
pub fn spawn_pump<S: Send + 'static>(
    receiver: EnvelopeReceiver,
    owner: OwnerHandle<S>,
    deliver: Deliver<S>,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut forwarded = 0u64;
        let mut envelopes = receiver.into_stream();
        while let Some(envelope) = envelopes.next().await {
            let message = match envelope.open() {
                Ok(message) => message,
                Err(e) => {
                    warn!(owner = owner.name(), error = %e, "Undecodable envelope dropped");
                    metrics::record_discarded(owner.name(), "decode");
                    continue;
                }
            };
            let route = envelope.route;
            if owner
                .post(move |state| {
                    deliver(state, &route, &message);
                })
                .is_err()
            {
                debug!(owner = owner.name(), "Owner stopped, pump exiting");
                break;
            }
            forwarded += 1;
        }
        debug!(owner = owner.name(), forwarded, "Pump finished");
        forwarded
    })
}
