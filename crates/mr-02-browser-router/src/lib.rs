//! # Browser Router (Answering Side)
//!
//! Runs in the browser process. Receives query-start and cancel messages
//! from the renderer, offers each query to registered handlers in order and
//! sends exactly one response per one-shot query (or a stream of responses
//! ending in a failure for persistent ones).
//!
//! ## Query State Machine
//!
//! ```text
//!   query-start ──▶ dispatch ──(no handler)──▶ failure(-2) sent ──▶ [DONE]
//!                      │
//!                   accepted
//!                      ▼
//!                 [PENDING] ──success (persistent)──▶ response sent ─┐
//!                   │  ▲                                             │
//!                   │  └─────────────────────────────────────────────┘
//!                   ├── success / failure ──▶ response sent ──▶ [DONE]
//!                   ├── renderer cancel ────▶ handler notified ─▶ [DONE]
//!                   ├── handler removed ────▶ failure(-1) sent,
//!                   │                         handler notified ─▶ [DONE]
//!                   └── close / crash / main-frame navigation
//!                                           ▶ handler notified ─▶ [DONE]
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | First acceptor wins, in registration order | `domain/registry.rs` - `dispatch()` |
//! | A declined callback never answers | `domain/registry.rs` - `dispatch()` |
//! | One-shot queries answer once | `domain/callback.rs` - `success()` |
//! | Stale answers never reach the renderer | `service/mod.rs` - `apply_completion()` |
//! | Handlers hear about every cancellation | `service/mod.rs` - `cancel_matching()` |
//!
//! ## Threading
//!
//! A [`BrowserRouter`] belongs to one owner thread. [`QueryCallback`] is the
//! only piece that crosses threads: it queues a [`Completion`] and rings the
//! notifier set by [`BrowserRouter::set_completion_notifier`], and the owner
//! applies queued answers in [`BrowserRouter::process_completions`].

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    BrowserRouterError, BrowserStats, Completion, CompletionNotifier, HandlerRegistry,
    QueryCallback, QueryKey,
};
pub use ports::inbound::{IncomingQuery, QueryHandler};
pub use service::BrowserRouter;
