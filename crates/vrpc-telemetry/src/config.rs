//! Telemetry configuration from environment variables.

use std::env;

/// Directives added when `VRPC_DEBUG` is set, making dropped traffic visible.
pub const DEBUG_DIRECTIVES: &str = "vrpc_core=debug,vrpc_bus=debug";

/// Configuration for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or full directive list
    pub log_level: String,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Log dropped, malformed and late traffic at debug level
    pub debug: bool,

    /// Whether to write events to stdout at all
    pub console_output: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "vrpc".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            debug: false,
            console_output: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `VRPC_SERVICE_NAME`: Service name (default: vrpc)
    /// - `VRPC_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `VRPC_JSON_LOGS`: Enable JSON logs (default: false)
    /// - `VRPC_DEBUG`: Debug-level logging for the vrpc crates (default: false)
    /// - `VRPC_CONSOLE_OUTPUT`: Enable console output (default: true)
    pub fn from_env() -> Self {
        Self {
            service_name: env::var("VRPC_SERVICE_NAME").unwrap_or_else(|_| "vrpc".to_string()),

            log_level: env::var("VRPC_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("VRPC_JSON_LOGS")
                .map(|v| is_truthy(&v))
                .unwrap_or(false),

            debug: env::var("VRPC_DEBUG").map(|v| is_truthy(&v)).unwrap_or(false),

            console_output: env::var("VRPC_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),
        }
    }

    /// Filter directives for `EnvFilter`.
    pub fn filter_directives(&self) -> String {
        if self.debug {
            format!("{},{}", self.log_level, DEBUG_DIRECTIVES)
        } else {
            self.log_level.clone()
        }
    }
}

fn is_truthy(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}
