//! # Client Endpoint
//!
//! The middle hop. Runs its own procedures, and relays traffic between the
//! server and the views it hosts. Relayed payloads are forwarded as-is; only
//! the `BrowserId` is read to pick the target view.

use crate::browsers::BrowserRegistry;
use crate::events::{client, server, view, NOREPLY};
use crate::frame::{decode_frame, emit_envelope, forward, to_args, Frame, Outlet};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;
use vrpc_core::codec::{self, Inbound};
use vrpc_core::{
    AsyncRequest, BrowserId, CallError, Controller, ControllerConfig, Envelope, Reply, Request,
    Source,
};

/// Inbox item of a client: a frame plus which side it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientInbound {
    FromServer(Frame),
    FromView(Frame),
}

/// Client side of the three-hop topology.
pub struct ClientEndpoint {
    controller: Controller,
    server: Arc<dyn Outlet>,
    views: BrowserRegistry<dyn Outlet>,
}

impl ClientEndpoint {
    pub fn new(config: ControllerConfig, server: Arc<dyn Outlet>) -> Self {
        Self {
            controller: Controller::new(config),
            server,
            views: BrowserRegistry::new(),
        }
    }

    /// Procedure and middleware registration.
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Host a view. Returns the id the view must use for its own calls.
    pub fn attach_view(&self, outlet: Arc<dyn Outlet>) -> BrowserId {
        self.views.register(outlet)
    }

    pub fn detach_view(&self, browser_id: BrowserId) -> bool {
        self.views.remove(browser_id).is_some()
    }

    /// Ids of the hosted views.
    pub fn views(&self) -> Vec<BrowserId> {
        self.views.ids()
    }

    fn view(&self, browser_id: BrowserId) -> Result<Arc<dyn Outlet>, CallError> {
        self.views
            .get(browser_id)
            .ok_or_else(|| CallError::Unreachable(format!("browser {browser_id}")))
    }

    /// Outlet of the view an envelope is addressed to.
    fn target_view(&self, envelope: &impl Envelope) -> Option<Arc<dyn Outlet>> {
        let Some(browser_id) = envelope.browser_id() else {
            debug!(name = envelope.name(), "Envelope without BrowserId, dropping");
            return None;
        };
        let outlet = self.views.get(browser_id);
        if outlet.is_none() {
            debug!(name = envelope.name(), browser_id = browser_id, "Unknown view, dropping");
        }
        outlet
    }

    /// Receive loop. Runs until every sender of `inbox` is dropped.
    pub async fn run(self: Arc<Self>, mut inbox: mpsc::UnboundedReceiver<ClientInbound>) {
        while let Some(inbound) = inbox.recv().await {
            match inbound {
                ClientInbound::FromServer(frame) => self.handle_server_frame(frame),
                ClientInbound::FromView(frame) => self.handle_view_frame(frame),
            }
        }
        debug!(endpoint = %self.controller.config().name, "Client inbox closed");
    }

    /// Route one frame received from the server.
    pub fn handle_server_frame(&self, frame: Frame) {
        match frame.event.as_str() {
            NOREPLY => {
                if let Some(request) = decode_frame::<AsyncRequest>(&frame) {
                    self.controller.dispatch_fire_and_forget(request);
                }
            }
            client::REPLY_TO_SERVER => {
                let Some(request) = decode_frame::<Request>(&frame) else {
                    return;
                };
                let upstream = Arc::clone(&self.server);
                self.controller.dispatch_call_and_reply(request, move |reply| {
                    emit_envelope(upstream.as_ref(), server::RECEIVE_FROM_CLIENT, &reply);
                });
            }
            client::RECEIVE_FROM_SERVER => {
                if let Some(reply) = decode_frame::<Reply>(&frame) {
                    self.controller.complete_correlation(reply);
                }
            }
            client::REDIRECT_NOREPLY_TO_BROWSER => {
                let Some(request) = decode_frame::<AsyncRequest>(&frame) else {
                    return;
                };
                if let Some(outlet) = self.target_view(&request) {
                    forward(outlet.as_ref(), view::NOREPLY, frame.payload);
                }
            }
            client::REDIRECT_SERVER_TO_BROWSER => match codec::classify(&frame.payload) {
                Ok(Inbound::Request(request)) => {
                    if let Some(outlet) = self.target_view(&request) {
                        forward(outlet.as_ref(), view::SERVER_REPLY, frame.payload);
                    }
                }
                Ok(Inbound::Reply(reply)) => {
                    if let Some(outlet) = self.target_view(&reply) {
                        forward(outlet.as_ref(), view::SERVER_CALLBACK, frame.payload);
                    }
                }
                Ok(Inbound::Async(request)) => {
                    debug!(name = %request.name, "Async envelope on request relay, dropping");
                }
                Err(e) => {
                    debug!(event = %frame.event, error = %e, "Malformed payload, dropping");
                }
            },
            other => {
                debug!(event = other, "Unknown server event, dropping");
            }
        }
    }

    /// Route one frame received from a hosted view.
    pub fn handle_view_frame(&self, frame: Frame) {
        match frame.event.as_str() {
            NOREPLY => {
                if let Some(request) = decode_frame::<AsyncRequest>(&frame) {
                    self.controller.dispatch_fire_and_forget(request);
                }
            }
            client::REDIRECT_NOREPLY_TO_SERVER => {
                forward(self.server.as_ref(), NOREPLY, frame.payload);
            }
            client::REPLY_TO_BROWSER => {
                let Some(request) = decode_frame::<Request>(&frame) else {
                    return;
                };
                let Some(outlet) = self.target_view(&request) else {
                    return;
                };
                self.controller.dispatch_call_and_reply(request, move |reply| {
                    emit_envelope(outlet.as_ref(), view::CLIENT_CALLBACK, &reply);
                });
            }
            client::REDIRECT_BROWSER_TO_SERVER => match codec::classify(&frame.payload) {
                Ok(Inbound::Request(_)) => {
                    forward(self.server.as_ref(), server::REPLY_TO_BROWSER, frame.payload);
                }
                Ok(Inbound::Reply(_)) => {
                    forward(self.server.as_ref(), server::RECEIVE_FROM_BROWSER, frame.payload);
                }
                Ok(Inbound::Async(request)) => {
                    debug!(name = %request.name, "Async envelope on request relay, dropping");
                }
                Err(e) => {
                    debug!(event = %frame.event, error = %e, "Malformed payload, dropping");
                }
            },
            client::RECEIVE_FROM_BROWSER => {
                if let Some(reply) = decode_frame::<Reply>(&frame) {
                    self.controller.complete_correlation(reply);
                }
            }
            other => {
                debug!(event = other, "Unknown view event, dropping");
            }
        }
    }

    /// Fire-and-forget call to the server.
    pub fn call_server_async<A: Serialize + ?Sized>(&self, name: &str, args: &A) -> Result<(), CallError> {
        let args = to_args(args)?;
        self.controller.fire_and_forget_call(name, args, |request| {
            emit_envelope(self.server.as_ref(), NOREPLY, &request);
        });
        Ok(())
    }

    /// Call-and-reply call to the server.
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
        self.controller
            .call(name, args, timeout, Source::Client, |request| {
                emit_envelope(self.server.as_ref(), server::REPLY_TO_CLIENT, &request);
            })
            .await
    }

    /// Fire-and-forget call to a hosted view.
    pub fn call_browser_async<A: Serialize + ?Sized>(
        &self,
        browser_id: BrowserId,
        name: &str,
        args: &A,
    ) -> Result<(), CallError> {
        let outlet = self.view(browser_id)?;
        let args = to_args(args)?;
        self.controller.fire_and_forget_call(name, args, |request| {
            emit_envelope(outlet.as_ref(), view::NOREPLY, &request);
        });
        Ok(())
    }

    /// Call-and-reply call to a hosted view.
    pub async fn call_browser<A, R>(
        &self,
        browser_id: BrowserId,
        name: &str,
        args: &A,
        timeout: Option<Duration>,
    ) -> Result<R, CallError>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let outlet = self.view(browser_id)?;
        self.controller
            .call(name, args, timeout, Source::Client, |request| {
                emit_envelope(outlet.as_ref(), view::CLIENT_REPLY, &request);
            })
            .await
    }
}
