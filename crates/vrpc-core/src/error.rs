//! Error types for the dispatch engine.

use crate::domain::CallId;
use thiserror::Error;

/// Failure raised by a procedure handler.
///
/// Handler failures are caught at the dispatch boundary and never produce a
/// reply, so the remote caller observes them as a timeout.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProcedureError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("result could not be serialized: {0}")]
    InvalidResult(String),

    #[error("procedure failed: {0}")]
    Failed(String),
}

impl ProcedureError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

/// Caller-side failure of a call-and-reply call.
#[derive(Debug, Error)]
pub enum CallError {
    /// No reply arrived within the timeout.
    #[error("call '{name}' (id {id}) timed out after {timeout_ms}ms")]
    TimedOut {
        name: String,
        id: CallId,
        timeout_ms: u64,
    },

    #[error("call arguments could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("call result could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),

    /// The calling endpoint has no route yet (an embedded view before attach).
    #[error("endpoint is not attached")]
    NotAttached,

    /// No route to the addressed peer or view.
    #[error("no route to {0}")]
    Unreachable(String),
}

impl CallError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Wire payload could not be turned into an envelope.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,
}
