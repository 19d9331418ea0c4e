//! # View Endpoint
//!
//! An embedded view hosted by a client. Everything it sends goes through the
//! client; requests it issues carry its `BrowserId` so replies find their way
//! back. The id is assigned by the hosting client on attach.

use crate::events::{client, view};
use crate::frame::{decode_frame, emit_envelope, to_args, Frame, Outlet};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;
use vrpc_core::{
    AsyncRequest, BrowserId, CallError, Controller, ControllerConfig, Reply, Request, Source,
};

/// View side of the three-hop topology.
pub struct ViewEndpoint {
    controller: Controller,
    client: Arc<dyn Outlet>,
    browser_id: RwLock<Option<BrowserId>>,
}

impl ViewEndpoint {
    pub fn new(config: ControllerConfig, client: Arc<dyn Outlet>) -> Self {
        Self {
            controller: Controller::new(config),
            client,
            browser_id: RwLock::new(None),
        }
    }

    /// Procedure and middleware registration.
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Record the id assigned by the hosting client.
    pub fn attach(&self, browser_id: BrowserId) {
        debug!(browser_id = browser_id, "View attached");
        *self.browser_id.write() = Some(browser_id);
    }

    pub fn browser_id(&self) -> Option<BrowserId> {
        *self.browser_id.read()
    }

    fn attached_id(&self) -> Result<BrowserId, CallError> {
        self.browser_id().ok_or(CallError::NotAttached)
    }

    /// Receive loop. Runs until every sender of `inbox` is dropped.
    pub async fn run(self: Arc<Self>, mut inbox: mpsc::UnboundedReceiver<Frame>) {
        while let Some(frame) = inbox.recv().await {
            self.handle_frame(frame);
        }
        debug!(endpoint = %self.controller.config().name, "View inbox closed");
    }

    /// Route one frame delivered by the hosting client.
    pub fn handle_frame(&self, frame: Frame) {
        match frame.event.as_str() {
            view::NOREPLY => {
                if let Some(request) = decode_frame::<AsyncRequest>(&frame) {
                    self.controller.dispatch_fire_and_forget(request);
                }
            }
            view::CLIENT_REPLY => self.reply_via(frame, client::RECEIVE_FROM_BROWSER),
            view::SERVER_REPLY => self.reply_via(frame, client::REDIRECT_BROWSER_TO_SERVER),
            view::CLIENT_CALLBACK | view::SERVER_CALLBACK => {
                if let Some(reply) = decode_frame::<Reply>(&frame) {
                    self.controller.complete_correlation(reply);
                }
            }
            other => {
                debug!(event = other, "Unknown view entry point, dropping");
            }
        }
    }

    fn reply_via(&self, frame: Frame, event: &'static str) {
        let Some(request) = decode_frame::<Request>(&frame) else {
            return;
        };
        let outlet = Arc::clone(&self.client);
        self.controller.dispatch_call_and_reply(request, move |reply| {
            emit_envelope(outlet.as_ref(), event, &reply);
        });
    }

    /// Fire-and-forget call to the hosting client.
    pub fn call_client_async<A: Serialize + ?Sized>(&self, name: &str, args: &A) -> Result<(), CallError> {
        let args = to_args(args)?;
        self.controller.fire_and_forget_call(name, args, |request| {
            emit_envelope(self.client.as_ref(), crate::events::NOREPLY, &request);
        });
        Ok(())
    }

    /// Fire-and-forget call to the server, relayed by the client.
    pub fn call_server_async<A: Serialize + ?Sized>(&self, name: &str, args: &A) -> Result<(), CallError> {
        let args = to_args(args)?;
        self.controller.fire_and_forget_call(name, args, |request| {
            emit_envelope(self.client.as_ref(), client::REDIRECT_NOREPLY_TO_SERVER, &request);
        });
        Ok(())
    }

    /// Call-and-reply call to the hosting client.
    pub async fn call_client<A, R>(
        &self,
        name: &str,
        args: &A,
        timeout: Option<Duration>,
    ) -> Result<R, CallError>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.browser_call(client::REPLY_TO_BROWSER, name, args, timeout)
            .await
    }

    /// Call-and-reply call to the server, relayed by the client.
    pub async fn call_server<A, R>(
        &self,
        name: &str,
        args: &A,
        timeout: Option<Duration>,
    ) -> Result<R, CallError>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.browser_call(client::REDIRECT_BROWSER_TO_SERVER, name, args, timeout)
            .await
    }

    async fn browser_call<A, R>(
        &self,
        event: &str,
        name: &str,
        args: &A,
        timeout: Option<Duration>,
    ) -> Result<R, CallError>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let browser_id = self.attached_id()?;
        let args = to_args(args)?;
        self.controller
            .start_browser_call(name, args, browser_id, timeout, Source::View, |request: Request| {
                emit_envelope(self.client.as_ref(), event, &request);
            })
            .into_result()
            .await
    }
}
