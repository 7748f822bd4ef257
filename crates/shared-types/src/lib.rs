//! # Shared Types Crate
//!
//! Value objects exchanged between the browser (answering) process and the
//! renderer (requesting) process.
//!
//! ## Design Principles
//!
//! - **Copy, never share**: every [`NamedMessage`] crossing a boundary is
//!   serialized by [`codec`] and rebuilt on the other side.
//! - **Configuration over constants**: message names are derived from a
//!   validated [`RouterConfig`], never from globals.
//! - **Typed protocol**: the three router messages (query-start, cancel,
//!   response) are parsed into [`RouterMessage`] before any routing decision.

pub mod codec;
pub mod config;
pub mod ids;
pub mod message;
pub mod protocol;
pub mod value;

pub use codec::CodecError;
pub use config::{ConfigError, FunctionNamespace, RouterConfig};
pub use ids::{BrowserId, ContextId, FrameId, FrameInfo, FrameRoute, ProcessRole, QueryId};
pub use message::NamedMessage;
pub use protocol::{
    MessageNames, ProtocolError, QueryOutcome, RouterMessage, CANCELED_ERROR_CODE,
    CANCELED_ERROR_MESSAGE, NO_HANDLER_ERROR_CODE, NO_HANDLER_ERROR_MESSAGE,
};
pub use value::ArgumentValue;
