//! # vrpc-core - Correlation and Dispatch Engine
//!
//! Named procedure calls between execution contexts that can only exchange
//! one-way messages (a server, its clients, and embedded views inside a
//! client). Request/reply semantics are layered on top with correlation ids
//! and per-call timeouts.
//!
//! ## Call Flow
//!
//! ```text
//!  caller Controller                               callee Controller
//!  ─────────────────                               ─────────────────
//!  start_call()
//!    ├─ insert id in CorrelationTable
//!    ├─ arm timer
//!    └─ send(Request) ─────────── transport ──────▶ dispatch_call_and_reply()
//!                                                     ├─ middleware chain
//!                                                     ├─ handler
//!  complete_correlation() ◀────── transport ──────── └─ deliver(Reply)
//!    └─ resolve PendingReply (or TimedOut)
//! ```
//!
//! ## Guarantees
//!
//! - **Exactly-once resolution:** a pending call ends either `Resolved` or
//!   `TimedOut`, never both
//! - **Insert before send:** a reply arriving before `send` returns is matched
//! - **First registration wins:** duplicate procedure names are ignored
//! - **Snapshot dispatch:** middleware registered mid-dispatch affects only
//!   later dispatches
//!
//! The engine knows nothing about the transport. Adapters (see `vrpc-bus`)
//! decode envelopes and pass `send` / `deliver` callbacks.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod codec;
pub mod controller;
pub mod correlation;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod procedure;
pub mod registry;

// Re-export main types
pub use codec::{classify, Inbound};
pub use controller::Controller;
pub use correlation::{CorrelationStats, CorrelationTable, PendingReply};
pub use domain::{
    AsyncRequest, BrowserId, CallId, CallOutcome, ConfigError, ControllerConfig, Envelope,
    IdGenerator, Reply, Request, Source, DEFAULT_CALL_TIMEOUT,
};
pub use error::{CallError, CodecError, ProcedureError};
pub use middleware::{ChainSnapshot, Middleware, MiddlewareChain, Next};
pub use procedure::{
    async_fn, sync_fn, typed_async, typed_sync, AsyncProcedure, CallerArgs, SyncProcedure,
};
pub use registry::ProcedureRegistry;
