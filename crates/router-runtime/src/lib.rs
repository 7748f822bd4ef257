//! # Router Runtime Library
//!
//! Process hosts and session wiring for the message router. The `main.rs`
//! binary drives a scripted session through them.
//!
//! ## Message Flow
//!
//! ```text
//!  script ──query()──▶ RendererHost ─┐                ┌─▶ BrowserHost ──▶ QueryHandler
//!                        (mr-01)     │   boundary     │     (mr-02)           │
//!                                    ├──────────────▶─┤                       │
//!  continuation ◀── RendererHost ◀───┴──◀─────────────┴── BrowserHost ◀──callback
//! ```
//!
//! One-way messages take the same boundary but skip the routers: they go
//! to each host's `MessageDispatcher`.
//!
//! ## Modules
//!
//! - `config` - `RuntimeConfig` from `MR_*` environment variables
//! - `handlers` - Demo query handlers
//! - `script` - In-memory script contexts
//! - `browser_host` / `renderer_host` - One host per process
//! - `boundary` - Metered transport and envelope pumps
//! - `session` - Both hosts on owner threads

#![allow(clippy::type_complexity)]

pub mod boundary;
pub mod browser_host;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod renderer_host;
pub mod script;
pub mod session;

pub use browser_host::BrowserHost;
pub use config::{RuntimeConfig, SettingsError};
pub use errors::RuntimeError;
pub use renderer_host::RendererHost;
pub use session::{channel_request, next_outcome, wait_until_bound, Session, SessionReport};
