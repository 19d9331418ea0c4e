//! JSON wire codec for envelopes.
//!
//! Decoding tolerates unknown fields and missing optional ones, so peers built
//! against different envelope revisions can still talk.

use crate::domain::{AsyncRequest, Reply, Request};
use crate::error::CodecError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// An inbound payload sorted by envelope kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// No `Id`: fire-and-forget.
    Async(AsyncRequest),
    /// `Id` without `Result`: call-and-reply request.
    Request(Request),
    /// `Result` present: reply to an earlier request.
    Reply(Reply),
}

impl Inbound {
    /// Procedure name carried by the envelope.
    pub fn name(&self) -> &str {
        match self {
            Self::Async(request) => &request.name,
            Self::Request(request) => &request.name,
            Self::Reply(reply) => &reply.name,
        }
    }
}

/// Decode a payload as a known envelope type.
pub fn decode<T: DeserializeOwned>(payload: &str) -> Result<T, CodecError> {
    Ok(serde_json::from_str(payload)?)
}

/// Encode an envelope.
pub fn encode<T: Serialize + ?Sized>(envelope: &T) -> Result<String, CodecError> {
    Ok(serde_json::to_string(envelope)?)
}

/// Decode a payload whose kind is only known from its fields.
pub fn classify(payload: &str) -> Result<Inbound, CodecError> {
    let value: Value = serde_json::from_str(payload)?;
    let Some(object) = value.as_object() else {
        return Err(CodecError::NotAnObject);
    };

    let inbound = if object.contains_key("Result") {
        Inbound::Reply(serde_json::from_value(value)?)
    } else if object.contains_key("Id") {
        Inbound::Request(serde_json::from_value(value)?)
    } else {
        Inbound::Async(serde_json::from_value(value)?)
    };
    Ok(inbound)
}
