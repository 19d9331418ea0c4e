//! Controller configuration with validation.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default per-call timeout when none is given at the call site.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default endpoint label used in log fields.
pub const DEFAULT_ENDPOINT_NAME: &str = "vrpc";

/// Configuration for one controller (one logical endpoint).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Endpoint label (server, client, view, ...)
    pub name: String,
    /// Timeout applied to calls that don't override it
    #[serde(with = "duration_serde")]
    pub default_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_ENDPOINT_NAME.to_string(),
            default_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl ControllerConfig {
    /// Configuration with the given endpoint label and defaults elsewhere.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `VRPC_ENDPOINT`: Endpoint label (default: vrpc)
    /// - `VRPC_TIMEOUT_MS`: Default call timeout in milliseconds (default: 1000)
    ///
    /// The result is validated; a zero or blank value is a [`ConfigError`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let default_timeout = match var("VRPC_TIMEOUT_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| ConfigError::InvalidTimeout(format!("VRPC_TIMEOUT_MS={raw}: {e}")))?,
            None => defaults.default_timeout,
        };

        let config = Self {
            name: var("VRPC_ENDPOINT").unwrap_or(defaults.name),
            default_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "default timeout cannot be 0".into(),
            ));
        }

        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint name cannot be empty".into()));
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Human-readable duration serialization ("300ms", "1s", "2m").
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" must be checked before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map_err(|_| "invalid minutes")?
                .checked_mul(60)
                .map(Duration::from_secs)
                .ok_or("minutes out of range")
        } else {
            // Bare numbers are milliseconds, matching VRPC_TIMEOUT_MS
            s.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid duration format")
        }
    }
}
