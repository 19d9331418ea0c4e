//! # Jittered Links
//!
//! Links that hold every frame for a random delay, so frames overtake each
//! other in flight. Correlation by id must still pair every reply with its
//! caller.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use vrpc_bus::{Frame, LinkError, Outlet};

/// Outlet that delivers each frame after a random delay up to `max_delay`.
pub struct JitterOutlet {
    inner: Arc<dyn Outlet>,
    max_delay: Duration,
}

impl JitterOutlet {
    pub fn wrap(inner: Arc<dyn Outlet>, max_delay: Duration) -> Arc<dyn Outlet> {
        Arc::new(Self { inner, max_delay })
    }
}

impl Outlet for JitterOutlet {
    fn emit(&self, frame: Frame) -> Result<(), LinkError> {
        let max_ms = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        let delay = Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms));
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // A closed link loses the frame, same as a real disconnect.
            let _ = inner.emit(frame);
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::{endpoint, init_test_logging};
    use super::*;
    use futures::future::join_all;
    use serde_json::{json, Value};
    use vrpc_bus::Network;
    use vrpc_core::sync_fn;

    const MAX_JITTER: Duration = Duration::from_millis(25);
    const CALL_TIMEOUT: Duration = Duration::from_secs(2);

    fn jittered_network() -> (Network, vrpc_bus::ClientNode) {
        init_test_logging();
        let network = Network::start(endpoint("server", CALL_TIMEOUT));
        let node = network.connect_client_with(endpoint("client", CALL_TIMEOUT), |outlet| {
            JitterOutlet::wrap(outlet, MAX_JITTER)
        });
        (network, node)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_jittered_client_calls_pair_correctly() {
        let (network, node) = jittered_network();
        network
            .server()
            .controller()
            .register_sync_procedure("double", sync_fn(|args| async move {
                Ok(json!(args.as_i64().unwrap_or(0) * 2))
            }));

        let client = &node.client;
        let calls = (0..50i64).map(|n| async move {
            let doubled: i64 = client.call_server("double", &n, None).await.unwrap();
            (n, doubled)
        });

        for (n, doubled) in join_all(calls).await {
            assert_eq!(doubled, n * 2);
        }
        assert_eq!(client.controller().pending_calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_jittered_relay_in_both_directions() {
        let (network, node) = jittered_network();
        let view = network.open_view(&node, endpoint("view", CALL_TIMEOUT));
        let browser_id = view.browser_id().unwrap();

        network.server().controller().register_sync_procedure(
            "serverEcho",
            sync_fn(|args| async move { Ok(json!({"server": args})) }),
        );
        view.controller().register_sync_procedure(
            "viewEcho",
            sync_fn(|args| async move { Ok(json!({"view": args})) }),
        );

        let server = network.server();
        let peer = node.peer;
        let upward = (0..20i64).map(|n| {
            let view = Arc::clone(&view);
            async move {
                let reply: Value = view.call_server("serverEcho", &n, None).await.unwrap();
                assert_eq!(reply, json!({"server": n}));
            }
        });
        let downward = (0..20i64).map(|n| async move {
            let reply: Value = server
                .call_browser(peer, browser_id, "viewEcho", &n, None)
                .await
                .unwrap();
            assert_eq!(reply, json!({"view": n}));
        });

        futures::join!(join_all(upward), join_all(downward));
    }
}
