//! # vrpc-bus - Hop Endpoints and In-Memory Transport
//!
//! Adapters that put a [`vrpc_core::Controller`] on each hop of the
//! server / client / embedded-view topology and move envelopes between them as
//! named [`Frame`]s.
//!
//! ## Topology
//!
//! ```text
//! ┌──────────────┐   frames   ┌──────────────┐   frames   ┌──────────────┐
//! │    Server    │ ◀────────▶ │    Client    │ ◀────────▶ │  View (n≥0)  │
//! │  N clients   │            │ relays views │            │  BrowserId   │
//! └──────────────┘            └──────────────┘            └──────────────┘
//! ```
//!
//! Views never talk to the server directly: the client forwards their traffic
//! and routes server traffic back by `BrowserId`.
//!
//! ## Drop Policy
//!
//! - Malformed payloads, unknown events and unknown views are logged at debug
//!   and dropped
//! - A caller whose request is dropped anywhere observes a timeout

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod browsers;
pub mod client;
pub mod events;
pub mod frame;
pub mod network;
pub mod server;
pub mod view;

// Re-export main types
pub use browsers::BrowserRegistry;
pub use client::{ClientEndpoint, ClientInbound};
pub use frame::{ChannelOutlet, Frame, LinkError, Outlet};
pub use network::{ClientNode, Network};
pub use server::{PeerId, ServerEndpoint};
pub use view::ViewEndpoint;
