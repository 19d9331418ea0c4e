//! The dispatch and correlation engine for one logical endpoint.
//!
//! A [`Controller`] owns two procedure registries, two middleware chains and
//! the correlation table. Transport adapters feed it decoded envelopes and
//! supply `send` / `deliver` callbacks; the controller never touches the wire.
//!
//! Inbound dispatch runs on its own Tokio task so a slow or suspended handler
//! never blocks the adapter's receive loop. Handler failures and panics stop
//! at that task boundary.

use crate::correlation::{CorrelationStats, CorrelationTable, PendingReply};
use crate::domain::{
    AsyncRequest, BrowserId, ControllerConfig, IdGenerator, Reply, Request, Source,
};
use crate::error::{CallError, ProcedureError};
use crate::middleware::{Middleware, MiddlewareChain};
use crate::procedure::{AsyncProcedure, SyncProcedure};
use crate::registry::ProcedureRegistry;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Stand-in deadline for timeouts past what `Instant` can represent.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Deadline `timeout` from now, saturating about thirty years out.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or(now + FAR_FUTURE)
}

/// Dispatch and correlation engine.
pub struct Controller {
    config: ControllerConfig,
    ids: IdGenerator,
    async_procedures: ProcedureRegistry<dyn AsyncProcedure>,
    sync_procedures: ProcedureRegistry<dyn SyncProcedure>,
    async_middleware: MiddlewareChain<AsyncRequest>,
    sync_middleware: MiddlewareChain<Request>,
    pending: Arc<CorrelationTable>,
}

impl Controller {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            ids: IdGenerator::new(),
            async_procedures: ProcedureRegistry::new(),
            sync_procedures: ProcedureRegistry::new(),
            async_middleware: MiddlewareChain::new(),
            sync_middleware: MiddlewareChain::new(),
            pending: Arc::new(CorrelationTable::new()),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    // ---------------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------------

    /// Bind a fire-and-forget handler. Returns `false` if `name` was taken.
    pub fn register_async_procedure(
        &self,
        name: impl Into<String>,
        handler: Arc<dyn AsyncProcedure>,
    ) -> bool {
        self.async_procedures.register(name, handler)
    }

    /// Bind a call-and-reply handler. Returns `false` if `name` was taken.
    pub fn register_sync_procedure(
        &self,
        name: impl Into<String>,
        handler: Arc<dyn SyncProcedure>,
    ) -> bool {
        self.sync_procedures.register(name, handler)
    }

    pub fn unregister_async_procedure(&self, name: &str) -> bool {
        self.async_procedures.unregister(name)
    }

    pub fn unregister_sync_procedure(&self, name: &str) -> bool {
        self.sync_procedures.unregister(name)
    }

    pub fn has_async_procedure(&self, name: &str) -> bool {
        self.async_procedures.contains(name)
    }

    pub fn has_sync_procedure(&self, name: &str) -> bool {
        self.sync_procedures.contains(name)
    }

    /// Add an outermost layer to the fire-and-forget chain.
    pub fn register_async_middleware(&self, layer: Arc<dyn Middleware<AsyncRequest>>) {
        self.async_middleware.register(layer);
    }

    /// Add an outermost layer to the call-and-reply chain.
    pub fn register_sync_middleware(&self, layer: Arc<dyn Middleware<Request>>) {
        self.sync_middleware.register(layer);
    }

    // ---------------------------------------------------------------------
    // Inbound dispatch
    // ---------------------------------------------------------------------

    /// Run the fire-and-forget handler for `request`.
    ///
    /// Returns `None` when no handler is bound to the name.
    pub fn dispatch_fire_and_forget(&self, request: AsyncRequest) -> Option<JoinHandle<()>> {
        self.dispatch_fire_and_forget_with(request, |args| args)
    }

    /// Like [`Controller::dispatch_fire_and_forget`], passing the arguments
    /// through `adapt` before they reach the handler.
    pub fn dispatch_fire_and_forget_with<F>(
        &self,
        request: AsyncRequest,
        adapt: F,
    ) -> Option<JoinHandle<()>>
    where
        F: FnOnce(Value) -> Value + Send + 'static,
    {
        let Some(handler) = self.async_procedures.lookup(&request.name) else {
            debug!(
                endpoint = %self.config.name,
                name = %request.name,
                "No async procedure registered, dropping"
            );
            return None;
        };

        let chain = self.async_middleware.snapshot();
        let endpoint = self.config.name.clone();

        let dispatch = async move {
            let mut outcome: Option<Result<(), ProcedureError>> = None;
            {
                let slot = &mut outcome;
                let args = request.args.clone();
                chain
                    .run(&request, move || async move {
                        *slot = Some(handler.invoke(adapt(args)).await);
                    })
                    .await;
            }

            match outcome {
                Some(Ok(())) => {}
                Some(Err(e)) => {
                    warn!(endpoint = %endpoint, name = %request.name, error = %e, "Async procedure failed");
                }
                None => {
                    debug!(endpoint = %endpoint, name = %request.name, "Async call vetoed by middleware");
                }
            }
        };

        let name = self.config.name.clone();
        Some(tokio::spawn(async move {
            if AssertUnwindSafe(dispatch).catch_unwind().await.is_err() {
                warn!(endpoint = %name, "Async procedure panicked");
            }
        }))
    }

    /// Run the call-and-reply handler for `request` and hand its reply to
    /// `deliver`.
    ///
    /// `deliver` runs at most once, and only if the handler produced a value.
    /// A missing handler, a veto, a failure or a panic all leave the caller to
    /// time out. Returns `None` when no handler is bound to the name.
    pub fn dispatch_call_and_reply<D>(&self, request: Request, deliver: D) -> Option<JoinHandle<()>>
    where
        D: FnOnce(Reply) + Send + 'static,
    {
        self.dispatch_call_and_reply_with(request, deliver, |args| args)
    }

    /// Like [`Controller::dispatch_call_and_reply`], passing the arguments
    /// through `adapt` before they reach the handler.
    pub fn dispatch_call_and_reply_with<D, F>(
        &self,
        request: Request,
        deliver: D,
        adapt: F,
    ) -> Option<JoinHandle<()>>
    where
        D: FnOnce(Reply) + Send + 'static,
        F: FnOnce(Value) -> Value + Send + 'static,
    {
        let Some(handler) = self.sync_procedures.lookup(&request.name) else {
            debug!(
                endpoint = %self.config.name,
                name = %request.name,
                id = %request.id,
                "No sync procedure registered, dropping"
            );
            return None;
        };

        let chain = self.sync_middleware.snapshot();
        let endpoint = self.config.name.clone();

        let dispatch = async move {
            let mut outcome: Option<Result<Value, ProcedureError>> = None;
            {
                let slot = &mut outcome;
                let args = request.args.clone();
                chain
                    .run(&request, move || async move {
                        *slot = Some(handler.invoke(adapt(args)).await);
                    })
                    .await;
            }

            match outcome {
                Some(Ok(result)) => {
                    debug!(
                        endpoint = %endpoint,
                        name = %request.name,
                        id = %request.id,
                        browser_id = ?request.browser_id,
                        "Delivering reply"
                    );
                    deliver(request.reply(result));
                }
                Some(Err(e)) => {
                    warn!(
                        endpoint = %endpoint,
                        name = %request.name,
                        id = %request.id,
                        error = %e,
                        "Sync procedure failed, no reply sent"
                    );
                }
                None => {
                    debug!(
                        endpoint = %endpoint,
                        name = %request.name,
                        id = %request.id,
                        "Sync call vetoed by middleware, no reply sent"
                    );
                }
            }
        };

        let name = self.config.name.clone();
        Some(tokio::spawn(async move {
            if AssertUnwindSafe(dispatch).catch_unwind().await.is_err() {
                warn!(endpoint = %name, "Sync procedure panicked, no reply sent");
            }
        }))
    }

    // ---------------------------------------------------------------------
    // Correlation
    // ---------------------------------------------------------------------

    /// Resolve the pending call matching `reply.id`.
    ///
    /// Late, duplicate and foreign replies are ignored and yield `false`.
    pub fn complete_correlation(&self, reply: Reply) -> bool {
        self.pending.complete(reply.id, reply.result)
    }

    /// Number of calls awaiting a reply.
    pub fn pending_calls(&self) -> usize {
        self.pending.pending_count()
    }

    pub fn correlation_stats(&self) -> &CorrelationStats {
        self.pending.stats()
    }

    // ---------------------------------------------------------------------
    // Outbound calls
    // ---------------------------------------------------------------------

    /// Issue a call-and-reply call.
    ///
    /// The correlation entry and its timer exist before `send` runs, so a reply
    /// completed from inside `send` still resolves the call. `timeout` defaults
    /// to the configured one. Must be called inside a Tokio runtime.
    pub fn start_call<S>(
        &self,
        name: impl Into<String>,
        args: Value,
        timeout: Option<Duration>,
        source: Source,
        send: S,
    ) -> PendingReply
    where
        S: FnOnce(Request),
    {
        self.issue(name.into(), args, timeout, source, None, send)
    }

    /// Issue a call-and-reply call addressed to one embedded view.
    pub fn start_browser_call<S>(
        &self,
        name: impl Into<String>,
        args: Value,
        browser_id: BrowserId,
        timeout: Option<Duration>,
        source: Source,
        send: S,
    ) -> PendingReply
    where
        S: FnOnce(Request),
    {
        self.issue(name.into(), args, timeout, source, Some(browser_id), send)
    }

    fn issue<S>(
        &self,
        name: String,
        args: Value,
        timeout: Option<Duration>,
        source: Source,
        browser_id: Option<BrowserId>,
        send: S,
    ) -> PendingReply
    where
        S: FnOnce(Request),
    {
        let timeout = timeout.unwrap_or(self.config.default_timeout);
        let deadline = deadline_after(timeout);

        let (id, receiver) = self.pending.insert(&self.ids, &name);
        CorrelationTable::arm_timeout(&self.pending, id, deadline);

        let request = Request {
            name: name.clone(),
            id,
            source,
            args,
            browser_id,
        };

        debug!(
            endpoint = %self.config.name,
            name = %name,
            id = %id,
            source = %source,
            browser_id = ?browser_id,
            timeout_ms = timeout.as_millis(),
            "Sending request"
        );
        send(request);

        PendingReply::new(id, name, timeout, receiver)
    }

    /// Typed call-and-reply call: encode `args`, await the reply, decode it.
    pub async fn call<A, R, S>(
        &self,
        name: impl Into<String>,
        args: &A,
        timeout: Option<Duration>,
        source: Source,
        send: S,
    ) -> Result<R, CallError>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
        S: FnOnce(Request),
    {
        let args = serde_json::to_value(args).map_err(CallError::Encode)?;
        self.start_call(name, args, timeout, source, send)
            .into_result()
            .await
    }

    /// Issue a fire-and-forget call. Nothing is tracked.
    pub fn fire_and_forget_call<S>(&self, name: impl Into<String>, args: Value, send: S)
    where
        S: FnOnce(AsyncRequest),
    {
        let request = AsyncRequest::new(name, args);
        debug!(endpoint = %self.config.name, name = %request.name, "Sending async request");
        send(request);
    }

    /// Issue a fire-and-forget call addressed to one embedded view.
    pub fn fire_and_forget_browser_call<S>(
        &self,
        name: impl Into<String>,
        args: Value,
        browser_id: BrowserId,
        send: S,
    ) where
        S: FnOnce(AsyncRequest),
    {
        let request = AsyncRequest::new(name, args).with_browser(browser_id);
        debug!(
            endpoint = %self.config.name,
            name = %request.name,
            browser_id = browser_id,
            "Sending async browser request"
        );
        send(request);
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}
