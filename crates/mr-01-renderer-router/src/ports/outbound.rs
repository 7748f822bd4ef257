//! # Outbound Port - ScriptContext
//!
//! The script execution environment a router binds its entry points into.
//! The engine owns the context; the router only adds and removes names.

use shared_types::ContextId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("Function {0:?} is already bound in this context")]
    AlreadyBound(String),

    #[error("Script context has been released")]
    Released,
}

/// A script execution context (one per frame).
pub trait ScriptContext: Send {
    fn id(&self) -> ContextId;

    /// Expose a callable entry point named `name` to script.
    fn bind_function(&mut self, name: &str) -> Result<(), BindingError>;

    /// Remove an entry point. Returns `false` when it was not bound.
    fn unbind_function(&mut self, name: &str) -> bool;
}
