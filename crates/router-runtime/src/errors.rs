//! Runtime error types.

use crate::config::SettingsError;
use mr_01_renderer_router::RendererError;
use mr_02_browser_router::BrowserRouterError;
use shared_bus::{ExecutorError, TransportError};
use shared_types::{ConfigError, ContextId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Renderer(#[from] RendererError),

    #[error(transparent)]
    Browser(#[from] BrowserRouterError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Unknown script context {0}")]
    UnknownContext(ContextId),

    #[error("Function {name:?} is not bound in context {context}")]
    UnknownFunction { context: ContextId, name: String },

    /// Router entry points take arguments; use `query` or `cancel`.
    #[error("{0:?} is a router entry point, not a native function")]
    EntryPoint(String),
}
