//! Renderer router error types.

use crate::ports::outbound::BindingError;
use shared_bus::TransportError;
use shared_types::{ConfigError, ContextId, QueryId};
use thiserror::Error;

/// Correlation table invariant violations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CorrelationError {
    /// An id was registered twice. Allocation is monotonic, so this means
    /// a caller registered an id it did not allocate.
    #[error("Query id {0} is already pending")]
    DuplicateId(QueryId),

    /// The 64-bit id space is used up.
    #[error("Query id space exhausted")]
    IdsExhausted,
}

/// Errors surfaced to the embedding code.
///
/// Wire-originated problems never appear here: malformed, stale or
/// unexpected messages are discarded with a diagnostic.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Unknown script context {0}")]
    UnknownContext(ContextId),

    #[error("Script context {0} is already attached")]
    ContextAlreadyAttached(ContextId),

    #[error("Failed to bind entry point: {0}")]
    Binding(BindingError),

    #[error(transparent)]
    Correlation(#[from] CorrelationError),

    #[error("Failed to send to the browser process: {0}")]
    Transport(#[from] TransportError),
}
