//! # Domain Layer
//!
//! Handler ordering and the callback handlers answer through.
//!
//! ## Modules
//!
//! - `registry` - Ordered handler list, first acceptor wins
//! - `callback` - Thread-safe answer handle and its completion queue
//! - `stats` - Per-router counters
//! - `errors` - Domain error types

pub mod callback;
pub mod errors;
pub mod registry;
pub mod stats;

pub use callback::{Completion, CompletionNotifier, QueryCallback, QueryKey};
pub use errors::BrowserRouterError;
pub use registry::HandlerRegistry;
pub use stats::BrowserStats;
