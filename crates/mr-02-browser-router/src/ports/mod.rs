//! # Ports Layer
//!
//! - `inbound.rs` - The handler capability applications implement
//!
//! The outbound port is `shared_bus::Transport`.

pub mod inbound;
