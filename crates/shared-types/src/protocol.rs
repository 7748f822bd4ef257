//! # Query Wire Protocol
//!
//! The three messages exchanged by a pair of routers:
//!
//! | Message | Name | Arguments |
//! |---------|------|-----------|
//! | Query-start | `<query fn>` | `[int64 id, string request, bool persistent]` |
//! | Cancel | `<cancel fn>` | `[int64 id]` |
//! | Response | `<query fn>Response` | `[int64 id, bool success, string result \| int64 code, string message]` |
//!
//! Anything carrying one of a router's names but not matching the layout is a
//! [`ProtocolError`]. Receivers discard such messages with a diagnostic.

use crate::config::RouterConfig;
use crate::ids::QueryId;
use crate::message::NamedMessage;
use crate::value::ArgumentValue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Suffix appended to the query function name to form the response name.
pub const RESPONSE_SUFFIX: &str = "Response";

/// Error code sent when a pending query is canceled by the answering side.
pub const CANCELED_ERROR_CODE: i32 = -1;
pub const CANCELED_ERROR_MESSAGE: &str = "The query has been canceled";

/// Error code sent when no registered handler accepted a query.
pub const NO_HANDLER_ERROR_CODE: i32 = -2;
pub const NO_HANDLER_ERROR_MESSAGE: &str = "No handler accepted the query";

/// Malformed message for a reserved name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("{name}: expected {expected} arguments, got {actual}")]
    WrongArgCount {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("{name}: argument {index} should be {expected}, got {actual}")]
    WrongArgType {
        name: String,
        index: usize,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("{name}: error code {code} does not fit in 32 bits")]
    ErrorCodeOutOfRange { name: String, code: i64 },
}

/// The result delivered to a query's continuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOutcome {
    Success(String),
    Failure { code: i32, message: String },
}

impl QueryOutcome {
    pub fn failure(code: i32, message: impl Into<String>) -> Self {
        Self::Failure {
            code,
            message: message.into(),
        }
    }

    /// Failure reported when no handler accepted the query.
    #[must_use]
    pub fn no_handler() -> Self {
        Self::failure(NO_HANDLER_ERROR_CODE, NO_HANDLER_ERROR_MESSAGE)
    }

    /// Failure reported when the answering side canceled the query.
    #[must_use]
    pub fn canceled() -> Self {
        Self::failure(CANCELED_ERROR_CODE, CANCELED_ERROR_MESSAGE)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Wire names used by one router pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageNames {
    pub query: String,
    pub cancel: String,
    pub response: String,
}

impl MessageNames {
    #[must_use]
    pub fn from_config(config: &RouterConfig) -> Self {
        Self {
            query: config.query_function.clone(),
            cancel: config.cancel_function.clone(),
            response: format!("{}{}", config.query_function, RESPONSE_SUFFIX),
        }
    }

    /// True when `name` belongs to this router pair.
    #[must_use]
    pub fn owns(&self, name: &str) -> bool {
        name == self.query || name == self.cancel || name == self.response
    }

    #[must_use]
    pub fn all(&self) -> [&str; 3] {
        [
            self.query.as_str(),
            self.cancel.as_str(),
            self.response.as_str(),
        ]
    }
}

/// A parsed router message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterMessage {
    QueryStart {
        id: QueryId,
        request: String,
        persistent: bool,
    },
    Cancel {
        id: QueryId,
    },
    Response {
        id: QueryId,
        outcome: QueryOutcome,
    },
}

impl RouterMessage {
    #[must_use]
    pub fn id(&self) -> QueryId {
        match self {
            Self::QueryStart { id, .. } | Self::Cancel { id } | Self::Response { id, .. } => *id,
        }
    }

    /// Build the wire message.
    #[must_use]
    pub fn to_named(&self, names: &MessageNames) -> NamedMessage {
        match self {
            Self::QueryStart {
                id,
                request,
                persistent,
            } => NamedMessage::new(names.query.as_str())
                .with_arg(id.value())
                .with_arg(request.as_str())
                .with_arg(*persistent),
            Self::Cancel { id } => NamedMessage::new(names.cancel.as_str()).with_arg(id.value()),
            Self::Response { id, outcome } => {
                let msg = NamedMessage::new(names.response.as_str()).with_arg(id.value());
                match outcome {
                    QueryOutcome::Success(result) => {
                        msg.with_arg(true).with_arg(result.as_str()).with_arg("")
                    }
                    QueryOutcome::Failure { code, message } => msg
                        .with_arg(false)
                        .with_arg(*code)
                        .with_arg(message.as_str()),
                }
            }
        }
    }

    /// Parse a wire message.
    ///
    /// Returns `Ok(None)` when the name does not belong to `names`, so that
    /// unrelated traffic passes through untouched.
    pub fn parse(names: &MessageNames, message: &NamedMessage) -> Result<Option<Self>, ProtocolError> {
        let name = message.name();
        if name == names.query {
            expect_count(message, 3)?;
            Ok(Some(Self::QueryStart {
                id: QueryId(int_at(message, 0)?),
                request: string_at(message, 1)?.to_string(),
                persistent: bool_at(message, 2)?,
            }))
        } else if name == names.cancel {
            expect_count(message, 1)?;
            Ok(Some(Self::Cancel {
                id: QueryId(int_at(message, 0)?),
            }))
        } else if name == names.response {
            expect_count(message, 4)?;
            let id = QueryId(int_at(message, 0)?);
            let outcome = if bool_at(message, 1)? {
                QueryOutcome::Success(string_at(message, 2)?.to_string())
            } else {
                let raw = int_at(message, 2)?;
                let code = i32::try_from(raw).map_err(|_| ProtocolError::ErrorCodeOutOfRange {
                    name: name.to_string(),
                    code: raw,
                })?;
                QueryOutcome::Failure {
                    code,
                    message: string_at(message, 3)?.to_string(),
                }
            };
            Ok(Some(Self::Response { id, outcome }))
        } else {
            Ok(None)
        }
    }
}

fn expect_count(message: &NamedMessage, expected: usize) -> Result<(), ProtocolError> {
    if message.arg_count() == expected {
        Ok(())
    } else {
        Err(ProtocolError::WrongArgCount {
            name: message.name().to_string(),
            expected,
            actual: message.arg_count(),
        })
    }
}

fn type_error(message: &NamedMessage, index: usize, expected: &'static str) -> ProtocolError {
    ProtocolError::WrongArgType {
        name: message.name().to_string(),
        index,
        expected,
        actual: message.arg(index).map_or("missing", ArgumentValue::type_name),
    }
}

fn int_at(message: &NamedMessage, index: usize) -> Result<i64, ProtocolError> {
    message
        .int_arg(index)
        .ok_or_else(|| type_error(message, index, "int64"))
}

fn bool_at(message: &NamedMessage, index: usize) -> Result<bool, ProtocolError> {
    message
        .bool_arg(index)
        .ok_or_else(|| type_error(message, index, "bool"))
}

fn string_at(message: &NamedMessage, index: usize) -> Result<&str, ProtocolError> {
    message
        .string_arg(index)
        .ok_or_else(|| type_error(message, index, "string"))
}
