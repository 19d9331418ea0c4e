//! # Server Endpoint
//!
//! Terminates traffic from every connected client and from the views those
//! clients host. Fire-and-forget handlers receive [`CallerArgs`] so they know
//! which peer called.

use crate::events::{client, server, NOREPLY};
use crate::frame::{decode_frame, emit_envelope, to_args, Frame, Outlet};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;
use vrpc_core::{
    AsyncRequest, BrowserId, CallError, CallerArgs, Controller, ControllerConfig, Reply, Request,
    Source,
};

/// Identity of one connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(Uuid);

impl PeerId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server side of the three-hop topology.
pub struct ServerEndpoint {
    controller: Controller,
    peers: DashMap<PeerId, Arc<dyn Outlet>>,
}

impl ServerEndpoint {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            controller: Controller::new(config),
            peers: DashMap::new(),
        }
    }

    /// Procedure and middleware registration.
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Attach a client's outlet.
    pub fn connect_peer(&self, peer: PeerId, outlet: Arc<dyn Outlet>) {
        info!(peer = %peer, "Peer connected");
        self.peers.insert(peer, outlet);
    }

    pub fn disconnect_peer(&self, peer: PeerId) -> bool {
        let removed = self.peers.remove(&peer).is_some();
        if removed {
            info!(peer = %peer, "Peer disconnected");
        }
        removed
    }

    pub fn peers(&self) -> Vec<PeerId> {
        self.peers.iter().map(|entry| *entry.key()).collect()
    }

    fn outlet(&self, peer: PeerId) -> Result<Arc<dyn Outlet>, CallError> {
        self.peers
            .get(&peer)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| CallError::Unreachable(format!("peer {peer}")))
    }

    /// Receive loop. Runs until every sender of `inbox` is dropped.
    pub async fn run(self: Arc<Self>, mut inbox: mpsc::UnboundedReceiver<(PeerId, Frame)>) {
        while let Some((peer, frame)) = inbox.recv().await {
            self.handle_frame(peer, frame);
        }
        debug!(endpoint = %self.controller.config().name, "Server inbox closed");
    }

    /// Route one inbound frame from `peer`.
    pub fn handle_frame(&self, peer: PeerId, frame: Frame) {
        match frame.event.as_str() {
            NOREPLY => {
                let Some(request) = decode_frame::<AsyncRequest>(&frame) else {
                    return;
                };
                let player = peer.to_string();
                self.controller
                    .dispatch_fire_and_forget_with(request, move |args| CallerArgs::wrap(player, args));
            }
            server::REPLY_TO_CLIENT => {
                let Some(request) = decode_frame::<Request>(&frame) else {
                    return;
                };
                let Ok(outlet) = self.outlet(peer) else {
                    debug!(peer = %peer, "Request from unknown peer, dropping");
                    return;
                };
                self.controller.dispatch_call_and_reply(request, move |reply| {
                    emit_envelope(outlet.as_ref(), client::RECEIVE_FROM_SERVER, &reply);
                });
            }
            server::REPLY_TO_BROWSER => {
                let Some(request) = decode_frame::<Request>(&frame) else {
                    return;
                };
                let Ok(outlet) = self.outlet(peer) else {
                    debug!(peer = %peer, "Request from unknown peer, dropping");
                    return;
                };
                self.controller.dispatch_call_and_reply(request, move |reply| {
                    emit_envelope(outlet.as_ref(), client::REDIRECT_SERVER_TO_BROWSER, &reply);
                });
            }
            server::RECEIVE_FROM_CLIENT | server::RECEIVE_FROM_BROWSER => {
                if let Some(reply) = decode_frame::<Reply>(&frame) {
                    self.controller.complete_correlation(reply);
                }
            }
            other => {
                debug!(peer = %peer, event = other, "Unknown event, dropping");
            }
        }
    }

    /// Fire-and-forget call to a client.
    pub fn call_client_async<A: Serialize + ?Sized>(
        &self,
        peer: PeerId,
        name: &str,
        args: &A,
    ) -> Result<(), CallError> {
        let outlet = self.outlet(peer)?;
        let args = to_args(args)?;
        self.controller.fire_and_forget_call(name, args, |request| {
            emit_envelope(outlet.as_ref(), NOREPLY, &request);
        });
        Ok(())
    }

    /// Call-and-reply call to a client.
    pub async fn call_client<A, R>(
        &self,
        peer: PeerId,
        name: &str,
        args: &A,
        timeout: Option<Duration>,
    ) -> Result<R, CallError>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let outlet = self.outlet(peer)?;
        self.controller
            .call(name, args, timeout, Source::Server, |request| {
                emit_envelope(outlet.as_ref(), client::REPLY_TO_SERVER, &request);
            })
            .await
    }

    /// Fire-and-forget call to a view hosted by `peer`.
    pub fn call_browser_async<A: Serialize + ?Sized>(
        &self,
        peer: PeerId,
        browser_id: BrowserId,
        name: &str,
        args: &A,
    ) -> Result<(), CallError> {
        let outlet = self.outlet(peer)?;
        let args = to_args(args)?;
        self.controller
            .fire_and_forget_browser_call(name, args, browser_id, |request| {
                emit_envelope(outlet.as_ref(), client::REDIRECT_NOREPLY_TO_BROWSER, &request);
            });
        Ok(())
    }

    /// Call-and-reply call to a view hosted by `peer`.
    pub async fn call_browser<A, R>(
        &self,
        peer: PeerId,
        browser_id: BrowserId,
        name: &str,
        args: &A,
        timeout: Option<Duration>,
    ) -> Result<R, CallError>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let outlet = self.outlet(peer)?;
        let args = to_args(args)?;
        self.controller
            .start_browser_call(name, args, browser_id, timeout, Source::Server, |request| {
                emit_envelope(outlet.as_ref(), client::REDIRECT_SERVER_TO_BROWSER, &request);
            })
            .into_result()
            .await
    }
}
