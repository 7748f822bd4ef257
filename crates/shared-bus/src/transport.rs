//! # Boundary Transport
//!
//! Delivers [`NamedMessage`]s to the process on the other side of the
//! boundary, tied to the frame they concern.
//!
//! Messages never cross by reference. Every send encodes the message into an
//! [`Envelope`]; the receiving side decodes its own copy with
//! [`Envelope::open`]. Delivery over one channel is FIFO.

use parking_lot::Mutex;
use shared_types::codec::{self, CodecError};
use shared_types::{FrameRoute, NamedMessage, ProcessRole};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{trace, warn};

/// Errors from sending across the boundary.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to encode message: {0}")]
    Codec(#[from] CodecError),

    /// The receiving process is gone.
    #[error("Boundary to the {0} process is closed")]
    Closed(&'static str),
}

/// Capability to send a message to the opposite process.
pub trait Transport: Send + Sync {
    /// Send `message` tied to `route`.
    fn send(&self, route: &FrameRoute, message: &NamedMessage) -> Result<(), TransportError>;

    /// The process this transport sends from.
    fn source(&self) -> ProcessRole;
}

/// What actually crosses the boundary: routing data plus encoded bytes.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub route: FrameRoute,
    pub source: ProcessRole,
    payload: Vec<u8>,
}

impl Envelope {
    /// Encode `message` for delivery.
    pub fn seal(
        route: FrameRoute,
        source: ProcessRole,
        message: &NamedMessage,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            route,
            source,
            payload: codec::encode(message)?,
        })
    }

    /// Decode the carried message.
    pub fn open(&self) -> Result<NamedMessage, CodecError> {
        codec::decode(&self.payload)
    }

    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

/// Transport over an in-memory `tokio::sync::mpsc` channel.
pub struct ChannelTransport {
    source: ProcessRole,
    sender: mpsc::UnboundedSender<Envelope>,
    sent: AtomicU64,
}

/// Receiving end of a [`ChannelTransport`].
pub struct EnvelopeReceiver {
    receiver: mpsc::UnboundedReceiver<Envelope>,
}

impl ChannelTransport {
    /// Create a transport sending from `source`, and the receiver that the
    /// opposite process reads from.
    #[must_use]
    pub fn channel(source: ProcessRole) -> (Self, EnvelopeReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                source,
                sender,
                sent: AtomicU64::new(0),
            },
            EnvelopeReceiver { receiver },
        )
    }

    /// Total messages handed to the channel.
    #[must_use]
    pub fn messages_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

impl Transport for ChannelTransport {
    fn send(&self, route: &FrameRoute, message: &NamedMessage) -> Result<(), TransportError> {
        let envelope = Envelope::seal(route.clone(), self.source, message)?;
        let bytes = envelope.payload_len();
        if self.sender.send(envelope).is_err() {
            warn!(
                source = self.source.as_str(),
                route = %route,
                name = message.name(),
                "Boundary closed, message dropped"
            );
            return Err(TransportError::Closed(self.source.opposite().as_str()));
        }
        self.sent.fetch_add(1, Ordering::Relaxed);
        trace!(
            source = self.source.as_str(),
            route = %route,
            name = message.name(),
            bytes,
            "Message sent across boundary"
        );
        Ok(())
    }

    fn source(&self) -> ProcessRole {
        self.source
    }
}

impl EnvelopeReceiver {
    /// Receive without waiting.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.receiver.try_recv().ok()
    }

    /// Convert into a stream of envelopes. The stream ends once every
    /// sender is dropped.
    #[must_use]
    pub fn into_stream(self) -> UnboundedReceiverStream<Envelope> {
        UnboundedReceiverStream::new(self.receiver)
    }
}

/// A message captured by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub route: FrameRoute,
    pub message: NamedMessage,
}

/// Transport that records every message instead of delivering it.
///
/// Each message is still encoded and decoded, so recorded messages are
/// copies exactly as the other side would see them.
pub struct RecordingTransport {
    source: ProcessRole,
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingTransport {
    #[must_use]
    pub fn new(source: ProcessRole) -> Self {
        Self {
            source,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<SentMessage> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Names of recorded messages, oldest first.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .map(|sent| sent.message.name().to_string())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, route: &FrameRoute, message: &NamedMessage) -> Result<(), TransportError> {
        let envelope = Envelope::seal(route.clone(), self.source, message)?;
        let copy = envelope.open()?;
        self.sent.lock().push(SentMessage {
            route: envelope.route,
            message: copy,
        });
        Ok(())
    }

    fn source(&self) -> ProcessRole {
        self.source
    }
}
