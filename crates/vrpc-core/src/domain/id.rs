//! Correlation identifiers for call-and-reply traffic.
//!
//! Ids are 32-bit on the wire and only need to be unique among calls that are
//! still pending, so a wrapping process-local counter is enough.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};

/// Correlation id tying a request to its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(i32);

impl CallId {
    /// Wrap a raw wire id.
    #[must_use]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw wire value.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for CallId {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl From<CallId> for i32 {
    fn from(id: CallId) -> Self {
        id.0
    }
}

/// Monotonic id source, wrapping at the `i32` bounds.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicI32,
}

impl IdGenerator {
    /// Start counting from `i32::MIN`.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(i32::MIN)
    }

    /// Start counting from `first`.
    #[must_use]
    pub fn starting_at(first: i32) -> Self {
        Self {
            next: AtomicI32::new(first),
        }
    }

    /// Produce the next id. Atomic `fetch_add` wraps on overflow.
    pub fn next_id(&self) -> CallId {
        CallId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
