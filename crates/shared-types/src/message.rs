//! # Named Messages
//!
//! One-way, named, argument-bearing unit of communication.

use crate::value::ArgumentValue;
use serde::{Deserialize, Serialize};

/// An immutable message: a name plus ordered positional arguments.
///
/// Built by the sending side with the `with_*` builders, read-only on the
/// receiving side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedMessage {
    name: String,
    args: Vec<ArgumentValue>,
}

impl NamedMessage {
    /// Create a message with no arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Create a message from a name and a complete argument list.
    pub fn with_args(name: impl Into<String>, args: Vec<ArgumentValue>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Append an argument.
    #[must_use]
    pub fn with_arg(mut self, value: impl Into<ArgumentValue>) -> Self {
        self.args.push(value.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn args(&self) -> &[ArgumentValue] {
        &self.args
    }

    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&ArgumentValue> {
        self.args.get(index)
    }

    #[must_use]
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// String argument at `index`, if present and of string type.
    #[must_use]
    pub fn string_arg(&self, index: usize) -> Option<&str> {
        self.arg(index).and_then(ArgumentValue::as_str)
    }

    #[must_use]
    pub fn int_arg(&self, index: usize) -> Option<i64> {
        self.arg(index).and_then(ArgumentValue::as_i64)
    }

    #[must_use]
    pub fn bool_arg(&self, index: usize) -> Option<bool> {
        self.arg(index).and_then(ArgumentValue::as_bool)
    }

    /// One-line rendering for log output: `name(arg0, arg1, ...)`.
    #[must_use]
    pub fn describe(&self) -> String {
        let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
        format!("{}({})", self.name, args.join(", "))
    }
}
