//! # vrpc-telemetry
//!
//! Logging setup shared by vrpc endpoints and test harnesses.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vrpc_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() {
//!     init_logging(&TelemetryConfig::from_env()).expect("Failed to init logging");
//!     // Endpoints now emit structured events
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `VRPC_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `VRPC_JSON_LOGS` | `false` | JSON formatted output |
//! | `VRPC_DEBUG` | `false` | Debug-level events from `vrpc_core` and `vrpc_bus` |
//! | `VRPC_SERVICE_NAME` | `vrpc` | Service name on the startup event |
//! | `VRPC_CONSOLE_OUTPUT` | `true` | Write events to stdout |

mod config;
mod logging;

pub use config::{TelemetryConfig, DEBUG_DIRECTIVES};
pub use logging::{env_filter, init_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Global subscriber already initialized: {0}")]
    AlreadyInitialized(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
