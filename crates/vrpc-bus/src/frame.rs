//! # Frames and Outlets
//!
//! A [`Frame`] is one named event with a JSON payload. An [`Outlet`] is the
//! sending half of a one-way link to another endpoint.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use vrpc_core::{codec, CallError};

/// Errors from emitting on a link.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The receiving endpoint is gone.
    #[error("link closed")]
    Closed,
}

/// One named event on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event: String,
    pub payload: String,
}

impl Frame {
    pub fn new(event: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            payload: payload.into(),
        }
    }
}

/// Sending half of a one-way link.
pub trait Outlet: Send + Sync {
    /// Emit a frame. Delivery order is not guaranteed by the contract.
    fn emit(&self, frame: Frame) -> Result<(), LinkError>;
}

/// Outlet backed by an unbounded Tokio channel.
///
/// `wrap` turns the frame into the receiver's inbox item, e.g. tagging it with
/// the sending peer.
pub struct ChannelOutlet<T> {
    sender: mpsc::UnboundedSender<T>,
    wrap: Box<dyn Fn(Frame) -> T + Send + Sync>,
}

impl ChannelOutlet<Frame> {
    /// Outlet whose inbox receives bare frames.
    pub fn new(sender: mpsc::UnboundedSender<Frame>) -> Self {
        Self::tagged(sender, |frame| frame)
    }
}

impl<T: Send + 'static> ChannelOutlet<T> {
    pub fn tagged<W>(sender: mpsc::UnboundedSender<T>, wrap: W) -> Self
    where
        W: Fn(Frame) -> T + Send + Sync + 'static,
    {
        Self {
            sender,
            wrap: Box::new(wrap),
        }
    }
}

impl<T: Send + 'static> Outlet for ChannelOutlet<T> {
    fn emit(&self, frame: Frame) -> Result<(), LinkError> {
        self.sender
            .send((self.wrap)(frame))
            .map_err(|_| LinkError::Closed)
    }
}

/// Encode `envelope` and emit it as `event`.
///
/// Failures are logged and swallowed: an undelivered call-and-reply request
/// surfaces to its caller as a timeout.
pub(crate) fn emit_envelope<T: Serialize + ?Sized>(outlet: &dyn Outlet, event: &str, envelope: &T) {
    let payload = match codec::encode(envelope) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(event = event, error = %e, "Failed to encode envelope");
            return;
        }
    };

    if let Err(e) = outlet.emit(Frame::new(event, payload)) {
        debug!(event = event, error = %e, "Frame not delivered");
    }
}

/// Forward an already-encoded payload under a new event name.
pub(crate) fn forward(outlet: &dyn Outlet, event: &str, payload: String) {
    if let Err(e) = outlet.emit(Frame::new(event, payload)) {
        debug!(event = event, error = %e, "Frame not forwarded");
    }
}

/// Decode a frame payload, logging and dropping malformed input.
pub(crate) fn decode_frame<T: DeserializeOwned>(frame: &Frame) -> Option<T> {
    match codec::decode::<T>(&frame.payload) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            debug!(event = %frame.event, error = %e, "Malformed payload, dropping");
            None
        }
    }
}

pub(crate) fn to_args<A: Serialize + ?Sized>(args: &A) -> Result<Value, CallError> {
    serde_json::to_value(args).map_err(CallError::Encode)
}
