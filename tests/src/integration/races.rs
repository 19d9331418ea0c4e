//! # Concurrency and Ordering
//!
//! Many calls in flight at once, replies arriving out of order, and replies
//! produced before the caller has finished sending.

#[cfg(test)]
mod tests {
    use super::super::{endpoint, init_test_logging, Topology};
    use futures::future::join_all;
    use serde_json::{json, Value};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;
    use vrpc_bus::Network;
    use vrpc_core::{sync_fn, CallId, Controller, ControllerConfig, Request};

    const CALL_TIMEOUT: Duration = Duration::from_secs(2);

    fn echo_after_delay() -> Arc<dyn vrpc_core::SyncProcedure> {
        sync_fn(|args| async move {
            let delay = args["delay_ms"].as_u64().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(args)
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_out_of_order_replies_reach_their_callers() {
        let topology = Topology::start(CALL_TIMEOUT);
        topology
            .server()
            .controller()
            .register_sync_procedure("echo", echo_after_delay());

        // Earlier calls sleep longer, so replies come back in reverse order
        let client = &topology.node.client;
        let calls = (0..20u64).map(|n| {
            let args = json!({"n": n, "delay_ms": (20 - n) * 5});
            async move {
                let reply: Value = client.call_server("echo", &args, None).await.unwrap();
                (n, reply)
            }
        });

        for (n, reply) in join_all(calls).await {
            assert_eq!(reply["n"], json!(n));
        }
        assert_eq!(client.controller().pending_calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_view_calls_through_relay() {
        let topology = Topology::start(CALL_TIMEOUT);
        topology.server().controller().register_sync_procedure(
            "square",
            sync_fn(|args| async move {
                let n = args.as_i64().unwrap_or(0);
                Ok(json!(n * n))
            }),
        );

        let view = &topology.view;
        let calls = (0..100i64).map(|n| async move {
            let squared: i64 = view.call_server("square", &n, None).await.unwrap();
            (n, squared)
        });

        for (n, squared) in join_all(calls).await {
            assert_eq!(squared, n * n);
        }
        let stats = view.controller().correlation_stats();
        assert_eq!(
            stats.total_completed.load(std::sync::atomic::Ordering::Relaxed),
            100
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_server_calls_many_clients_concurrently() {
        init_test_logging();
        let network = Network::start(endpoint("server", CALL_TIMEOUT));
        let nodes: Vec<_> = (0..8)
            .map(|i| {
                let node = network.connect_client(endpoint(&format!("client-{i}"), CALL_TIMEOUT));
                node.client.controller().register_sync_procedure(
                    "whoami",
                    sync_fn(move |_| async move { Ok(json!(i)) }),
                );
                node
            })
            .collect();

        let server = network.server();
        let calls = nodes.iter().enumerate().map(|(i, node)| async move {
            let answer: usize = server
                .call_client(node.peer, "whoami", &json!(null), None)
                .await
                .unwrap();
            assert_eq!(answer, i);
        });
        join_all(calls).await;
        assert_eq!(server.peers().len(), 8);
    }

    #[tokio::test]
    async fn test_reply_produced_inside_send_resolves() {
        init_test_logging();
        let caller = Arc::new(Controller::new(ControllerConfig::named("caller")));

        // The callee replies before `send` returns; the entry must already exist
        let back = Arc::clone(&caller);
        let pending = caller.start_call(
            "now",
            Value::Null,
            Some(CALL_TIMEOUT),
            vrpc_core::Source::Client,
            move |request: Request| {
                back.complete_correlation(request.reply(json!("tick")));
            },
        );
        let reply: String = pending.into_result().await.unwrap();
        assert_eq!(reply, "tick");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_receive_distinct_ids() {
        init_test_logging();
        let caller = Arc::new(Controller::new(ControllerConfig::named("caller")));
        let ids = Arc::new(parking_lot::Mutex::new(Vec::<CallId>::new()));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let caller = Arc::clone(&caller);
                let ids = Arc::clone(&ids);
                tokio::spawn(async move {
                    for _ in 0..25 {
                        let pending = caller.start_call(
                            "noop",
                            Value::Null,
                            Some(Duration::from_millis(10)),
                            vrpc_core::Source::Client,
                            |_request: Request| {},
                        );
                        ids.lock().push(pending.id());
                    }
                })
            })
            .collect();
        for task in join_all(tasks).await {
            task.unwrap();
        }

        let ids = ids.lock();
        let unique: HashSet<_> = ids.iter().copied().collect();
        assert_eq!(ids.len(), 400);
        assert_eq!(unique.len(), 400);
    }
}
