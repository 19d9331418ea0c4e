//! # Round Trips
//!
//! Every caller/callee pair of the topology, through the real frame routing.
//!
//! | Caller | Callee | Call-and-reply events | Fire-and-forget events |
//! |--------|--------|-----------------------|------------------------|
//! | client | server | rtc → rfs             | nr                     |
//! | server | client | rts → rfc             | nr                     |
//! | client | view   | creply → rfb          | noreply                |
//! | view   | client | rtb → ccallback       | nr                     |
//! | view   | server | rbs → rtb → rsb → scallback | rns → nr         |
//! | server | view   | rsb → sreply → rbs → rfb    | rnb → noreply    |

#[cfg(test)]
mod tests {
    use super::super::Topology;
    use anyhow::Context;
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use vrpc_core::{async_fn, sync_fn, typed_async, typed_sync, CallerArgs, ProcedureError};

    const CALL_TIMEOUT: Duration = Duration::from_millis(500);

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    #[derive(Debug, Serialize, Deserialize)]
    struct AddArgs {
        a: i64,
        b: i64,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sum {
        total: i64,
    }

    fn adder() -> std::sync::Arc<dyn vrpc_core::SyncProcedure> {
        typed_sync(|args: AddArgs| async move {
            Ok::<_, ProcedureError>(Sum {
                total: args.a + args.b,
            })
        })
    }

    /// Fire-and-forget handler that forwards its arguments to a channel.
    fn recorder() -> (
        std::sync::Arc<dyn vrpc_core::AsyncProcedure>,
        mpsc::UnboundedReceiver<Value>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler = async_fn(move |args| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(args);
                Ok(())
            }
        });
        (handler, rx)
    }

    async fn received(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
        timeout(CALL_TIMEOUT, rx.recv())
            .await
            .expect("fire-and-forget call not delivered")
            .expect("recorder dropped")
    }

    // =============================================================================
    // CALL-AND-REPLY
    // =============================================================================

    #[tokio::test]
    async fn test_client_calls_server() {
        let topology = Topology::start(CALL_TIMEOUT);
        topology
            .server()
            .controller()
            .register_sync_procedure("add", adder());

        let sum: Sum = topology
            .node
            .client
            .call_server("add", &AddArgs { a: 2, b: 40 }, None)
            .await
            .unwrap();
        assert_eq!(sum, Sum { total: 42 });
        assert_eq!(topology.node.client.controller().pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_server_calls_client() {
        let topology = Topology::start(CALL_TIMEOUT);
        topology
            .node
            .client
            .controller()
            .register_sync_procedure("getVersion", sync_fn(|_| async { Ok(json!("1.4.2")) }));

        let version: String = topology
            .server()
            .call_client(topology.node.peer, "getVersion", &json!({}), None)
            .await
            .unwrap();
        assert_eq!(version, "1.4.2");
    }

    #[tokio::test]
    async fn test_client_calls_view() {
        let topology = Topology::start(CALL_TIMEOUT);
        topology
            .view
            .controller()
            .register_sync_procedure("add", adder());
        let browser_id = topology.view.browser_id().unwrap();

        let sum: Sum = topology
            .node
            .client
            .call_browser(browser_id, "add", &AddArgs { a: -1, b: 1 }, None)
            .await
            .unwrap();
        assert_eq!(sum, Sum { total: 0 });
    }

    #[tokio::test]
    async fn test_view_calls_client() {
        let topology = Topology::start(CALL_TIMEOUT);
        topology.node.client.controller().register_sync_procedure(
            "getSetting",
            sync_fn(|args| async move {
                match args["key"].as_str() {
                    Some("volume") => Ok(json!(80)),
                    _ => Ok(Value::Null),
                }
            }),
        );

        let volume: u32 = topology
            .view
            .call_client("getSetting", &json!({"key": "volume"}), None)
            .await
            .unwrap();
        assert_eq!(volume, 80);
    }

    #[tokio::test]
    async fn test_view_calls_server_through_client() -> anyhow::Result<()> {
        let topology = Topology::start(CALL_TIMEOUT);
        topology
            .server()
            .controller()
            .register_sync_procedure("add", adder());

        let sum: Sum = topology
            .view
            .call_server("add", &AddArgs { a: 20, b: 22 }, None)
            .await
            .context("relayed call to server")?;
        assert_eq!(sum, Sum { total: 42 });

        // The relay leaves nothing pending on the client
        assert_eq!(topology.node.client.controller().pending_calls(), 0);
        assert_eq!(topology.view.controller().pending_calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_server_calls_view_through_client() -> anyhow::Result<()> {
        let topology = Topology::start(CALL_TIMEOUT);
        topology.view.controller().register_sync_procedure(
            "getScore",
            sync_fn(|args| async move { Ok(json!({"score": args["level"].as_i64().unwrap_or(0) * 10})) }),
        );
        let browser_id = topology.view.browser_id().unwrap();

        let score: Value = topology
            .server()
            .call_browser(topology.node.peer, browser_id, "getScore", &json!({"level": 7}), None)
            .await
            .context("relayed call to view")?;
        assert_eq!(score, json!({"score": 70}));
        Ok(())
    }

    #[tokio::test]
    async fn test_server_routes_to_the_addressed_view() {
        let topology = Topology::start(CALL_TIMEOUT);
        let second = topology.open_view("view-2");
        for (view, label) in [(&topology.view, "first"), (&second, "second")] {
            view.controller()
                .register_sync_procedure("whoami", sync_fn(move |_| async move { Ok(json!(label)) }));
        }

        let first_id = topology.view.browser_id().unwrap();
        let second_id = second.browser_id().unwrap();
        assert_ne!(first_id, second_id);

        let server = topology.server();
        let peer = topology.node.peer;
        let a: String = server
            .call_browser(peer, second_id, "whoami", &json!(null), None)
            .await
            .unwrap();
        let b: String = server
            .call_browser(peer, first_id, "whoami", &json!(null), None)
            .await
            .unwrap();
        assert_eq!((a.as_str(), b.as_str()), ("second", "first"));
    }

    // =============================================================================
    // FIRE-AND-FORGET
    // =============================================================================

    #[tokio::test]
    async fn test_client_notifies_server_with_caller_identity() {
        let topology = Topology::start(CALL_TIMEOUT);
        let (tx, mut rx) = mpsc::unbounded_channel();
        topology.server().controller().register_async_procedure(
            "chat",
            typed_async(move |caller: CallerArgs<String>| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(caller);
                    Ok(())
                }
            }),
        );

        topology
            .node
            .client
            .call_server_async("chat", &json!("hello"))
            .unwrap();

        let caller = timeout(CALL_TIMEOUT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(caller.player, topology.node.peer.to_string());
        assert_eq!(caller.args, "hello");
    }

    #[tokio::test]
    async fn test_view_notifies_server_through_client() {
        let topology = Topology::start(CALL_TIMEOUT);
        let (handler, mut rx) = recorder();
        topology
            .server()
            .controller()
            .register_async_procedure("track", handler);

        topology
            .view
            .call_server_async("track", &json!({"event": "opened"}))
            .unwrap();

        let args = received(&mut rx).await;
        assert_eq!(args["Player"], json!(topology.node.peer.to_string()));
        assert_eq!(args["Args"], json!({"event": "opened"}));
    }

    #[tokio::test]
    async fn test_server_notifies_client() {
        let topology = Topology::start(CALL_TIMEOUT);
        let (handler, mut rx) = recorder();
        topology
            .node
            .client
            .controller()
            .register_async_procedure("setWeather", handler);

        topology
            .server()
            .call_client_async(topology.node.peer, "setWeather", &json!("rain"))
            .unwrap();

        assert_eq!(received(&mut rx).await, json!("rain"));
    }

    #[tokio::test]
    async fn test_server_notifies_view_through_client() {
        let topology = Topology::start(CALL_TIMEOUT);
        let (handler, mut rx) = recorder();
        topology
            .view
            .controller()
            .register_async_procedure("showToast", handler);
        let browser_id = topology.view.browser_id().unwrap();

        topology
            .server()
            .call_browser_async(topology.node.peer, browser_id, "showToast", &json!({"text": "hi"}))
            .unwrap();

        assert_eq!(received(&mut rx).await, json!({"text": "hi"}));
    }

    #[tokio::test]
    async fn test_client_and_view_notify_each_other() {
        let topology = Topology::start(CALL_TIMEOUT);
        let (to_view, mut view_rx) = recorder();
        let (to_client, mut client_rx) = recorder();
        topology
            .view
            .controller()
            .register_async_procedure("ping", to_view);
        topology
            .node
            .client
            .controller()
            .register_async_procedure("pong", to_client);
        let browser_id = topology.view.browser_id().unwrap();

        topology
            .node
            .client
            .call_browser_async(browser_id, "ping", &json!(1))
            .unwrap();
        assert_eq!(received(&mut view_rx).await, json!(1));

        topology.view.call_client_async("pong", &json!(2)).unwrap();
        assert_eq!(received(&mut client_rx).await, json!(2));
    }
}
