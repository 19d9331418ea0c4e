//! Domain types: envelopes, correlation ids, call outcomes, configuration.

pub mod config;
pub mod id;
pub mod message;
pub mod outcome;

pub use config::{ConfigError, ControllerConfig, DEFAULT_CALL_TIMEOUT};
pub use id::{CallId, IdGenerator};
pub use message::{AsyncRequest, BrowserId, Envelope, Reply, Request, Source};
pub use outcome::CallOutcome;
