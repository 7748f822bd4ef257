//! # Ports Layer
//!
//! - `inbound.rs` - What script and the boundary call on the router
//! - `outbound.rs` - The script context the router binds its entry points into

pub mod inbound;
pub mod outbound;
