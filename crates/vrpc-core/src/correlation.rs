//! Correlation table: pending call id → single-shot resolver.
//!
//! Flow:
//! 1. The caller inserts an entry and receives a oneshot receiver
//! 2. A timer is armed for the call's deadline
//! 3. The request is sent
//! 4. Either a matching reply (`complete`) or the timer (`expire`) removes the
//!    entry and fires the resolver
//!
//! Removal is the arbitration point: whichever side removes the entry wins and
//! the other side finds nothing.

use crate::domain::{CallId, CallOutcome, IdGenerator};
use crate::error::CallError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, warn};

/// A call waiting for its reply.
struct PendingCall {
    resolver: oneshot::Sender<CallOutcome<Value>>,
    name: String,
    created_at: Instant,
    timer: Option<AbortHandle>,
}

/// Counters for the correlation table.
#[derive(Debug, Default)]
pub struct CorrelationStats {
    /// Calls inserted
    pub total_registered: AtomicU64,
    /// Calls resolved by a matching reply
    pub total_completed: AtomicU64,
    /// Calls resolved by their timer
    pub total_timeouts: AtomicU64,
    /// Replies with no pending entry (late, duplicate or foreign)
    pub total_unmatched: AtomicU64,
    /// Calls whose caller stopped waiting before resolution
    pub total_abandoned: AtomicU64,
}

/// Pending call-and-reply calls keyed by correlation id.
#[derive(Default)]
pub struct CorrelationTable {
    pending: DashMap<CallId, PendingCall>,
    stats: CorrelationStats,
}

impl CorrelationTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id and insert a resolver for it.
    ///
    /// After the counter wraps, an id that is still pending is skipped rather
    /// than overwritten.
    pub fn insert(
        &self,
        ids: &IdGenerator,
        name: &str,
    ) -> (CallId, oneshot::Receiver<CallOutcome<Value>>) {
        let (tx, rx) = oneshot::channel();
        let mut resolver = Some(tx);

        loop {
            let id = ids.next_id();
            match self.pending.entry(id) {
                Entry::Occupied(_) => {
                    warn!(id = %id, name = name, "Correlation id still pending, skipping");
                }
                Entry::Vacant(slot) => {
                    if let Some(resolver) = resolver.take() {
                        slot.insert(PendingCall {
                            resolver,
                            name: name.to_string(),
                            created_at: Instant::now(),
                            timer: None,
                        });
                    }
                    self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
                    debug!(id = %id, name = name, "Registered pending call");
                    return (id, rx);
                }
            }
        }
    }

    /// Resolve `id` with a reply payload.
    ///
    /// Returns `false` if nothing was pending under `id`.
    pub fn complete(&self, id: CallId, result: Value) -> bool {
        let Some((_, call)) = self.pending.remove(&id) else {
            self.stats.total_unmatched.fetch_add(1, Ordering::Relaxed);
            debug!(id = %id, "Reply for unknown or expired correlation id, dropping");
            return false;
        };

        if let Some(timer) = &call.timer {
            timer.abort();
        }
        self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
        debug!(
            id = %id,
            name = call.name,
            elapsed_ms = call.created_at.elapsed().as_millis(),
            "Completed pending call"
        );
        self.fire(id, call, CallOutcome::Resolved(result));
        true
    }

    /// Resolve `id` as timed out.
    ///
    /// Returns `false` if the call had already been resolved.
    pub fn expire(&self, id: CallId) -> bool {
        let Some((_, call)) = self.pending.remove(&id) else {
            return false;
        };

        self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
        debug!(
            id = %id,
            name = call.name,
            elapsed_ms = call.created_at.elapsed().as_millis(),
            "Pending call timed out"
        );
        self.fire(id, call, CallOutcome::TimedOut);
        true
    }

    fn fire(&self, id: CallId, call: PendingCall, outcome: CallOutcome<Value>) {
        if call.resolver.send(outcome).is_err() {
            self.stats.total_abandoned.fetch_add(1, Ordering::Relaxed);
            debug!(id = %id, name = call.name, "Caller stopped waiting");
        }
    }

    /// Spawn the timer that expires `id` at `deadline`.
    ///
    /// The timer holds only a weak reference, so dropping the table cancels
    /// nothing but also keeps nothing alive. A matching reply aborts the
    /// timer. Must be called inside a Tokio runtime.
    pub fn arm_timeout(table: &Arc<Self>, id: CallId, deadline: Instant) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(table);
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(table) = weak.upgrade() {
                table.expire(id);
            }
        });

        match table.pending.get_mut(&id) {
            Some(mut call) => call.timer = Some(handle.abort_handle()),
            // Already resolved
            None => handle.abort(),
        }
        handle
    }

    /// Number of calls currently pending.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: CallId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn stats(&self) -> &CorrelationStats {
        &self.stats
    }
}

/// Caller-side handle of a call-and-reply call.
///
/// Awaiting it yields the raw [`CallOutcome`]; [`PendingReply::into_result`]
/// decodes the payload and maps a timeout to [`CallError::TimedOut`].
#[derive(Debug)]
#[must_use = "a pending reply does nothing unless awaited"]
pub struct PendingReply {
    id: CallId,
    name: String,
    timeout: Duration,
    receiver: oneshot::Receiver<CallOutcome<Value>>,
}

impl PendingReply {
    pub(crate) fn new(
        id: CallId,
        name: String,
        timeout: Duration,
        receiver: oneshot::Receiver<CallOutcome<Value>>,
    ) -> Self {
        Self {
            id,
            name,
            timeout,
            receiver,
        }
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait for the outcome and decode a resolved payload as `R`.
    pub async fn into_result<R: DeserializeOwned>(self) -> Result<R, CallError> {
        let Self {
            id,
            name,
            timeout,
            receiver,
        } = self;

        match receiver.await.unwrap_or(CallOutcome::TimedOut) {
            CallOutcome::Resolved(value) => serde_json::from_value(value).map_err(CallError::Decode),
            CallOutcome::TimedOut => Err(CallError::TimedOut {
                name,
                id,
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

impl Future for PendingReply {
    type Output = CallOutcome<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped resolver means the table went away with the call unresolved.
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or(CallOutcome::TimedOut))
    }
}
