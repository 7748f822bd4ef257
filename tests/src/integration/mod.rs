//! # Integration Tests
//!
//! Both hosts run on their own owner threads and talk only through the
//! in-memory boundary, the way the runtime binary wires them.

#[cfg(test)]
mod fixtures;
pub mod flows;
pub mod lifecycle;
