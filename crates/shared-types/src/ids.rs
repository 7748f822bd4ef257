//! # Identities
//!
//! Identifiers for browsers, frames, script contexts and queries, plus the
//! route a message travels along.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a browser instance (one embedded page host).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BrowserId(pub u32);

/// Identifier of a frame within a browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameId(pub u64);

/// Identifier of a script execution context within a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(pub u64);

/// Correlation id of a query. Travels on the wire as a 64-bit integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryId(pub i64);

impl QueryId {
    #[must_use]
    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for BrowserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "browser#{}", self.0)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context#{}", self.0)
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of the boundary a process is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessRole {
    /// The trusted host process; answers queries.
    Browser,
    /// The script process; issues queries.
    Renderer,
}

impl ProcessRole {
    /// The process on the other side of the boundary.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Browser => Self::Renderer,
            Self::Renderer => Self::Browser,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Renderer => "renderer",
        }
    }
}

/// A frame as seen by message handlers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameInfo {
    pub id: FrameId,
    /// URL currently loaded in the frame.
    pub url: String,
    pub is_main: bool,
}

impl FrameInfo {
    pub fn main(id: FrameId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            is_main: true,
        }
    }

    pub fn child(id: FrameId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            is_main: false,
        }
    }
}

/// The (browser, frame) pair a message is tied to.
///
/// Messages in both directions are addressed by the frame they concern;
/// a response is routed back along the route its query arrived on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRoute {
    pub browser_id: BrowserId,
    pub frame: FrameInfo,
}

impl FrameRoute {
    pub fn new(browser_id: BrowserId, frame: FrameInfo) -> Self {
        Self { browser_id, frame }
    }
}

impl fmt::Display for FrameRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.browser_id, self.frame.id)
    }
}
