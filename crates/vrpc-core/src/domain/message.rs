//! Envelope schemas exchanged between execution contexts.
//!
//! Field names follow the wire contract exactly (`Name`, `Id`, `Source`,
//! `Args`, `Result`, `BrowserId`). Browser-addressed traffic is not a separate
//! type: an envelope is browser-addressed iff `BrowserId` is present.

use crate::domain::id::CallId;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Identifier of one embedded-view instance hosted by a client.
pub type BrowserId = i32;

/// Logical origin of a call, used to route replies back through the right hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Client process (wire tag 0).
    Client,
    /// Embedded view hosted inside the client (wire tag 1).
    View,
    /// Server process (wire tag 2).
    Server,
}

impl Source {
    /// Wire tag for this source.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Client => 0,
            Self::View => 1,
            Self::Server => 2,
        }
    }

    /// Parse a wire tag.
    #[must_use]
    pub const fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Client),
            1 => Some(Self::View),
            2 => Some(Self::Server),
            _ => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::View => write!(f, "view"),
            Self::Server => write!(f, "server"),
        }
    }
}

impl Serialize for Source {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Source {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tag = u8::deserialize(deserializer)?;
        Self::from_u8(tag).ok_or_else(|| D::Error::custom(format!("unknown source tag {tag}")))
    }
}

/// Common view over every envelope variant, used by middleware.
pub trait Envelope: Send + Sync {
    /// Procedure name carried by the envelope.
    fn name(&self) -> &str;

    /// Target embedded view, if browser-addressed.
    fn browser_id(&self) -> Option<BrowserId>;

    /// Whether this envelope targets an embedded view.
    fn is_browser_addressed(&self) -> bool {
        self.browser_id().is_some()
    }
}

/// Fire-and-forget call (`AsyncRequest` / `AsyncBrowserRequest` on the wire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AsyncRequest {
    pub name: String,
    #[serde(default)]
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_id: Option<BrowserId>,
}

impl AsyncRequest {
    /// Create a peer-addressed fire-and-forget request.
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
            browser_id: None,
        }
    }

    /// Address this request to one embedded view.
    #[must_use]
    pub fn with_browser(mut self, browser_id: BrowserId) -> Self {
        self.browser_id = Some(browser_id);
        self
    }
}

impl Envelope for AsyncRequest {
    fn name(&self) -> &str {
        &self.name
    }

    fn browser_id(&self) -> Option<BrowserId> {
        self.browser_id
    }
}

/// Call-and-reply request (`Request` / `BrowserRequest` on the wire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Request {
    pub name: String,
    pub id: CallId,
    pub source: Source,
    #[serde(default)]
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_id: Option<BrowserId>,
}

impl Request {
    /// Create a peer-addressed request.
    pub fn new(name: impl Into<String>, id: CallId, source: Source, args: Value) -> Self {
        Self {
            name: name.into(),
            id,
            source,
            args,
            browser_id: None,
        }
    }

    /// Address this request to one embedded view.
    #[must_use]
    pub fn with_browser(mut self, browser_id: BrowserId) -> Self {
        self.browser_id = Some(browser_id);
        self
    }

    /// Build the reply for this request.
    ///
    /// Name, id and source are copied; a browser-addressed request yields a
    /// browser-addressed reply with the same `BrowserId`.
    #[must_use]
    pub fn reply(&self, result: Value) -> Reply {
        Reply {
            name: self.name.clone(),
            id: self.id,
            source: self.source,
            result,
            browser_id: self.browser_id,
        }
    }
}

impl Envelope for Request {
    fn name(&self) -> &str {
        &self.name
    }

    fn browser_id(&self) -> Option<BrowserId> {
        self.browser_id
    }
}

/// Reply to a request (`Result` / `BrowserResult` on the wire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Reply {
    pub name: String,
    pub id: CallId,
    pub source: Source,
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_id: Option<BrowserId>,
}

impl Envelope for Reply {
    fn name(&self) -> &str {
        &self.name
    }

    fn browser_id(&self) -> Option<BrowserId> {
        self.browser_id
    }
}
