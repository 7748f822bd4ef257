//! # Renderer Router (Requesting Side)
//!
//! Runs in the script process. Exposes a query function and a cancel
//! function to every attached script context, and turns calls to them into
//! correlated messages to the browser process.
//!
//! ## Query Lifecycle
//!
//! ```text
//!            query()                     response (id)
//! script ─────────────▶ [ISSUED] ──────────────────────▶ [RESOLVED]
//!                          │   ▲                              │
//!                          │   └── success, persistent ───────┘
//!                          │
//!                          ├── cancel() ─────────────────▶ [CANCELLED]
//!                          │   (cancel message sent)
//!                          │
//!                          └── context released ─────────▶ [DISPOSED]
//!                              (nothing sent, nothing invoked)
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | One pending entry per id | `domain/correlation.rs` - `register()` |
//! | Ids strictly increase | `domain/correlation.rs` - `allocate()` |
//! | At most one resolution (non-persistent) | `domain/correlation.rs` - `resolve()` removes first |
//! | Disposal never invokes continuations | `domain/correlation.rs` - `dispose_context()` |
//! | Both entry points bound, or neither | `service/mod.rs` - `on_context_created()` |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  service/          - RendererRouter                             │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - RendererRouterApi, QueryRequest            │
//! │  ports/outbound.rs - ScriptContext                              │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/correlation.rs - CorrelationTable, PendingQuery         │
//! │  domain/errors.rs      - CorrelationError, RendererError        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    Continuation, CorrelationError, CorrelationTable, PendingQuery, RendererError, RendererStats,
};
pub use ports::inbound::{QueryRequest, RendererRouterApi};
pub use ports::outbound::{BindingError, ScriptContext};
pub use service::RendererRouter;
