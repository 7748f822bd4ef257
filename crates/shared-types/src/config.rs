//! # Router Configuration
//!
//! Each router instance is configured with the names of the two script entry
//! points it exposes. All message names on the wire are derived from them.
//!
//! Names must be unique among routers sharing a process or a script context;
//! [`FunctionNamespace`] enforces that at setup time.

use crate::protocol::MessageNames;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Default query entry point name.
pub const DEFAULT_QUERY_FUNCTION: &str = "cefQuery";

/// Default cancel entry point name.
pub const DEFAULT_CANCEL_FUNCTION: &str = "cefQueryCancel";

/// Configuration errors. Surfaced at construction, never at runtime.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Function name must not be empty")]
    EmptyName,

    #[error("Function name {0:?} is not a valid identifier")]
    InvalidName(String),

    #[error("Query and cancel functions share the name {0:?}")]
    SameName(String),

    #[error("Name {name:?} is already claimed by router {owner:?}")]
    NameCollision { name: String, owner: String },
}

/// Function names for one router instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Script function that issues a query.
    pub query_function: String,
    /// Script function that cancels a query.
    pub cancel_function: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            query_function: DEFAULT_QUERY_FUNCTION.to_string(),
            cancel_function: DEFAULT_CANCEL_FUNCTION.to_string(),
        }
    }
}

impl RouterConfig {
    /// Build and validate a configuration.
    pub fn new(
        query_function: impl Into<String>,
        cancel_function: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            query_function: query_function.into(),
            cancel_function: cancel_function.into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check both names are usable script identifiers and distinct.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_identifier(&self.query_function)?;
        validate_identifier(&self.cancel_function)?;
        if self.query_function == self.cancel_function {
            return Err(ConfigError::SameName(self.query_function.clone()));
        }
        let names = self.message_names();
        if names.cancel == names.response {
            return Err(ConfigError::SameName(names.response));
        }
        Ok(())
    }

    /// Wire message names derived from this configuration.
    #[must_use]
    pub fn message_names(&self) -> MessageNames {
        MessageNames::from_config(self)
    }
}

fn validate_identifier(name: &str) -> Result<(), ConfigError> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(ConfigError::EmptyName);
    };
    let valid_first = first.is_ascii_alphabetic() || first == '_' || first == '$';
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if valid_first && valid_rest {
        Ok(())
    } else {
        Err(ConfigError::InvalidName(name.to_string()))
    }
}

/// Registry of message names claimed by the routers of one process.
///
/// Claiming covers the query, cancel and response names, so two routers can
/// never receive each other's traffic.
#[derive(Debug, Default)]
pub struct FunctionNamespace {
    claimed: HashMap<String, String>,
}

impl FunctionNamespace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim every name of `config` for the router labelled `owner`.
    ///
    /// Nothing is claimed when any single name collides.
    pub fn claim(&mut self, owner: &str, config: &RouterConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let names = config.message_names();
        for name in names.all() {
            if let Some(existing) = self.claimed.get(name) {
                return Err(ConfigError::NameCollision {
                    name: name.to_string(),
                    owner: existing.clone(),
                });
            }
        }
        for name in names.all() {
            self.claimed.insert(name.to_string(), owner.to_string());
        }
        Ok(())
    }

    /// Reserve names used by the host itself, outside any router.
    ///
    /// Nothing is reserved when any single name is already claimed.
    pub fn reserve(&mut self, owner: &str, names: &[&str]) -> Result<(), ConfigError> {
        if let Some(name) = names.iter().find(|name| self.claimed.contains_key(**name)) {
            return Err(ConfigError::NameCollision {
                name: name.to_string(),
                owner: self.claimed[*name].clone(),
            });
        }
        for name in names {
            self.claimed.insert(name.to_string(), owner.to_string());
        }
        Ok(())
    }

    /// Release the names of `config`. Returns how many were released.
    pub fn release(&mut self, config: &RouterConfig) -> usize {
        let names = config.message_names();
        names
            .all()
            .into_iter()
            .filter(|name| self.claimed.remove(*name).is_some())
            .count()
    }

    #[must_use]
    pub fn is_claimed(&self, name: &str) -> bool {
        self.claimed.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}
