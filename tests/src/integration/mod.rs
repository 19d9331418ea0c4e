//! # Integration Tests
//!
//! Server, client and view endpoints wired through [`vrpc_bus::Network`].
//!
//! ## Call Paths Tested:
//!
//! 1. **Client ↔ Server**: direct hop, both directions
//! 2. **Client ↔ View**: direct hop, both directions
//! 3. **View ↔ Server**: relayed by the hosting client, routed by `BrowserId`
//!
//! Every path is exercised fire-and-forget and call-and-reply.

pub mod jitter;
pub mod races;
pub mod round_trips;

use std::sync::{Arc, Once};
use std::time::Duration;
use vrpc_bus::{ClientNode, Network, ServerEndpoint, ViewEndpoint};
use vrpc_core::ControllerConfig;
use vrpc_telemetry::{init_logging, TelemetryConfig};

static LOGGING: Once = Once::new();

/// Install logging once per test binary. Silent unless `VRPC_LOG_LEVEL` or
/// `RUST_LOG` asks for output.
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        let mut config = TelemetryConfig::from_env();
        if std::env::var("VRPC_LOG_LEVEL").is_err() && std::env::var("RUST_LOG").is_err() {
            config.log_level = "off".to_string();
        }
        // A subscriber installed elsewhere in the binary is fine too.
        let _ = init_logging(&config);
    });
}

/// Endpoint configuration with a short default timeout.
pub fn endpoint(name: &str, timeout: Duration) -> ControllerConfig {
    ControllerConfig::named(name).with_default_timeout(timeout)
}

/// One server, one client, one view.
pub struct Topology {
    pub network: Network,
    pub node: ClientNode,
    pub view: Arc<ViewEndpoint>,
}

impl Topology {
    /// Build the three hops, every endpoint using `timeout` as its default.
    pub fn start(timeout: Duration) -> Self {
        init_test_logging();
        let network = Network::start(endpoint("server", timeout));
        let node = network.connect_client(endpoint("client", timeout));
        let view = network.open_view(&node, endpoint("view", timeout));

        Self {
            network,
            node,
            view,
        }
    }

    pub fn server(&self) -> &Arc<ServerEndpoint> {
        self.network.server()
    }

    /// Open another view on the same client.
    pub fn open_view(&self, name: &str) -> Arc<ViewEndpoint> {
        let timeout = self.view.controller().config().default_timeout;
        self.network.open_view(&self.node, endpoint(name, timeout))
    }
}
