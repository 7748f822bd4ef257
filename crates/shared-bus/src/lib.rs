//! # Shared Bus - Boundary Plumbing
//!
//! Everything a router needs from its surroundings, apart from the routing
//! logic itself.
//!
//! ## Components
//!
//! - [`transport`]: sends named messages to the opposite process. Messages
//!   are encoded into an [`Envelope`] on every send, so the receiver always
//!   works on a copy.
//! - [`dispatcher`]: the best-effort one-way channel. Listeners subscribe by
//!   message name.
//! - [`executor`]: the single owner thread. Router state lives inside one
//!   task and every entry point is posted to it.
//!
//! ```text
//! ┌────────────────┐   Envelope (bincode)   ┌────────────────┐
//! │ Browser owner  │ ─────────────────────▶ │ Renderer owner │
//! │ thread         │ ◀───────────────────── │ thread         │
//! └────────────────┘      FIFO per pair      └────────────────┘
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod dispatcher;
pub mod executor;
pub mod transport;

pub use dispatcher::{ListenerId, MessageDispatcher, MessageListener};
pub use executor::{ExecutorError, OwnerHandle, OwnerThread};
pub use transport::{
    ChannelTransport, Envelope, EnvelopeReceiver, RecordingTransport, SentMessage, Transport,
    TransportError,
};
