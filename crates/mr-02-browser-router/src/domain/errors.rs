//! Browser router error types.

use shared_types::ConfigError;
use thiserror::Error;

/// Errors surfaced to the embedding code.
///
/// Only setup can fail. Wire problems are discarded with a diagnostic and
/// handler errors travel to the renderer as failure responses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrowserRouterError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}
