//! Terminal outcome of a call-and-reply call.

/// How a pending call ended. Timeout is the only negative outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome<T> {
    /// A matching reply arrived before the timeout.
    Resolved(T),
    /// The timeout elapsed first.
    TimedOut,
}

impl<T> CallOutcome<T> {
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    /// Resolved value, if any.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Resolved(value) => Some(value),
            Self::TimedOut => None,
        }
    }

    pub fn map<U, F>(self, f: F) -> CallOutcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Resolved(value) => CallOutcome::Resolved(f(value)),
            Self::TimedOut => CallOutcome::TimedOut,
        }
    }
}
