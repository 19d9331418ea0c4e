//! In-process wiring of the three hops over Tokio channels.
//!
//! ```text
//!            (PeerId, Frame)               ClientInbound               Frame
//!  Server ◀───────────────── Client ◀───────────────────── View
//!         ───────────────────▶      ─────────────────────▶
//!            ClientInbound::FromServer                 Frame
//! ```

use crate::client::{ClientEndpoint, ClientInbound};
use crate::frame::{ChannelOutlet, Frame, Outlet};
use crate::server::{PeerId, ServerEndpoint};
use crate::view::ViewEndpoint;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;
use vrpc_core::ControllerConfig;

/// Running server plus its receive loop. Must be created inside a Tokio runtime.
pub struct Network {
    server: Arc<ServerEndpoint>,
    inbox: mpsc::UnboundedSender<(PeerId, Frame)>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Network {
    /// Start a server endpoint.
    pub fn start(config: ControllerConfig) -> Self {
        let (inbox, rx) = mpsc::unbounded_channel();
        let server = Arc::new(ServerEndpoint::new(config));
        let task = tokio::spawn(Arc::clone(&server).run(rx));

        Self {
            server,
            inbox,
            tasks: Mutex::new(vec![task]),
        }
    }

    pub fn server(&self) -> &Arc<ServerEndpoint> {
        &self.server
    }

    /// Start a client and connect it to the server.
    pub fn connect_client(&self, config: ControllerConfig) -> ClientNode {
        self.connect_client_with(config, |outlet| outlet)
    }

    /// Like [`Network::connect_client`], letting `decorate` wrap both link
    /// directions (for latency or loss injection).
    pub fn connect_client_with<D>(&self, config: ControllerConfig, decorate: D) -> ClientNode
    where
        D: Fn(Arc<dyn Outlet>) -> Arc<dyn Outlet>,
    {
        let peer = PeerId::new();
        let (client_tx, client_rx) = mpsc::unbounded_channel();

        let to_server: Arc<dyn Outlet> = Arc::new(ChannelOutlet::tagged(
            self.inbox.clone(),
            move |frame| (peer, frame),
        ));
        let to_client: Arc<dyn Outlet> = Arc::new(ChannelOutlet::tagged(
            client_tx.clone(),
            ClientInbound::FromServer,
        ));

        let client = Arc::new(ClientEndpoint::new(config, decorate(to_server)));
        self.server.connect_peer(peer, decorate(to_client));
        self.track(tokio::spawn(Arc::clone(&client).run(client_rx)));
        info!(peer = %peer, "Client connected to in-process server");

        ClientNode {
            peer,
            client,
            inbox: client_tx,
        }
    }

    /// Start a view hosted by `node`.
    pub fn open_view(&self, node: &ClientNode, config: ControllerConfig) -> Arc<ViewEndpoint> {
        let (view_tx, view_rx) = mpsc::unbounded_channel();

        let to_client: Arc<dyn Outlet> = Arc::new(ChannelOutlet::tagged(
            node.inbox.clone(),
            ClientInbound::FromView,
        ));
        let view = Arc::new(ViewEndpoint::new(config, to_client));
        let browser_id = node.client.attach_view(Arc::new(ChannelOutlet::new(view_tx)));
        view.attach(browser_id);
        self.track(tokio::spawn(Arc::clone(&view).run(view_rx)));

        view
    }

    fn track(&self, task: JoinHandle<()>) {
        self.tasks.lock().push(task);
    }

    /// Stop every receive loop.
    pub fn shutdown(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

impl Drop for Network {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A connected client.
pub struct ClientNode {
    pub peer: PeerId,
    pub client: Arc<ClientEndpoint>,
    inbox: mpsc::UnboundedSender<ClientInbound>,
}
