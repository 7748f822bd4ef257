//! # Runtime Configuration
//!
//! Settings for the demo session, read from `MR_*` environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `MR_STARTUP_URL` | `http://message-router.test/index.html` |
//! | `MR_QUERY_FUNCTION` | `cefQuery` |
//! | `MR_CANCEL_FUNCTION` | `cefQueryCancel` |
//! | `MR_CUSTOM_QUERY_FUNCTION` | `queryUpstage` |
//! | `MR_CUSTOM_CANCEL_FUNCTION` | `cancelQuery` |
//! | `MR_ANSWER_TIMEOUT_MS` | `2000` |

use crate::browser_host::{ROOM_CLOSED_MESSAGE, ROOM_OPEN_MESSAGE, TEST_FUNCTION_MESSAGE};
use crate::renderer_host::{EXPOSE_FUNCTION_MESSAGE, VERSION_FUNCTION};
use serde::Serialize;
use shared_types::{ConfigError, FunctionNamespace, RouterConfig};
use std::env;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_STARTUP_URL: &str = "http://message-router.test/index.html";
pub const CUSTOM_QUERY_FUNCTION: &str = "queryUpstage";
pub const CUSTOM_CANCEL_FUNCTION: &str = "cancelQuery";
const DEFAULT_ANSWER_TIMEOUT_MS: u64 = 2000;

/// Names the hosts use for native functions and one-way messages. No router
/// may claim them.
pub const HOST_RESERVED_NAMES: [&str; 5] = [
    VERSION_FUNCTION,
    EXPOSE_FUNCTION_MESSAGE,
    ROOM_OPEN_MESSAGE,
    ROOM_CLOSED_MESSAGE,
    TEST_FUNCTION_MESSAGE,
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Invalid router configuration: {0}")]
    Router(#[from] ConfigError),

    #[error("{var} has invalid value {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeConfig {
    /// Handlers only answer frames whose URL starts with this.
    pub startup_url: String,
    /// Router with the stock function names.
    pub default_router: RouterConfig,
    /// Second router pair, answered by the acknowledging handler.
    pub custom_router: RouterConfig,
    /// How long the demo waits for each answer.
    #[serde(skip)]
    pub answer_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            startup_url: DEFAULT_STARTUP_URL.to_string(),
            default_router: RouterConfig::default(),
            custom_router: RouterConfig {
                query_function: CUSTOM_QUERY_FUNCTION.to_string(),
                cancel_function: CUSTOM_CANCEL_FUNCTION.to_string(),
            },
            answer_timeout: Duration::from_millis(DEFAULT_ANSWER_TIMEOUT_MS),
        }
    }
}

impl RuntimeConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through `lookup`; unset keys keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let defaults = Self::default();

        let default_router = RouterConfig::new(
            lookup("MR_QUERY_FUNCTION").unwrap_or(defaults.default_router.query_function),
            lookup("MR_CANCEL_FUNCTION").unwrap_or(defaults.default_router.cancel_function),
        )?;
        let custom_router = RouterConfig::new(
            lookup("MR_CUSTOM_QUERY_FUNCTION").unwrap_or(defaults.custom_router.query_function),
            lookup("MR_CUSTOM_CANCEL_FUNCTION").unwrap_or(defaults.custom_router.cancel_function),
        )?;

        let answer_timeout = match lookup("MR_ANSWER_TIMEOUT_MS") {
            Some(value) => match value.parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    return Err(SettingsError::InvalidValue {
                        var: "MR_ANSWER_TIMEOUT_MS",
                        value,
                    })
                }
            },
            None => defaults.answer_timeout,
        };

        let config = Self {
            startup_url: lookup("MR_STARTUP_URL").unwrap_or(defaults.startup_url),
            default_router,
            custom_router,
            answer_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check both routers can share one process.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.startup_url.is_empty() {
            return Err(SettingsError::InvalidValue {
                var: "MR_STARTUP_URL",
                value: String::new(),
            });
        }
        self.namespace()?;
        Ok(())
    }

    /// Host names plus every router's names, claimed in one namespace.
    pub fn namespace(&self) -> Result<FunctionNamespace, SettingsError> {
        let mut namespace = FunctionNamespace::new();
        namespace.reserve("host", &HOST_RESERVED_NAMES)?;
        for (owner, config) in self.routers() {
            namespace.claim(owner, config)?;
        }
        Ok(namespace)
    }

    /// Every router of the session, labelled.
    #[must_use]
    pub fn routers(&self) -> [(&'static str, &RouterConfig); 2] {
        [
            ("default", &self.default_router),
            ("custom", &self.custom_router),
        ]
    }
}
