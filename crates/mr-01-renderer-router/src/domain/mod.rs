//! # Domain Layer
//!
//! Correlation bookkeeping for the requesting side. No I/O happens here.
//!
//! ## Modules
//!
//! - `correlation` - Query id allocation and pending continuations
//! - `stats` - Per-router counters
//! - `errors` - Domain error types

pub mod correlation;
pub mod errors;
pub mod stats;

pub use correlation::{Continuation, CorrelationTable, PendingQuery};
pub use errors::{CorrelationError, RendererError};
pub use stats::RendererStats;
