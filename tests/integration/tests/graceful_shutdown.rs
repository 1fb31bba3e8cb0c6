//! Shutdown sweep over live HTTP sessions.
//!
//! Verifies the drain/close sequence from the client's point of view:
//! streams end, in-flight submissions resolve, and no new stream can open
//! behind the sweep.

use async_trait::async_trait;
use fleetgate_gateway::engine::ProtocolEngine;
use fleetgate_gateway::rpc::JsonRpcRequest;
use fleetgate_gateway::transport::{Frame, StreamTransport};
use fleetgate_gateway::{Gateway, GatewayConfig, ShutdownCoordinator};
use fleetgate_integration_tests::{open_stream, spawn_gateway};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_shutdown_closes_streams_and_rejects_new_ones() {
    let gateway = Gateway::with_builtin_tools(GatewayConfig::default()).await;
    let addr = spawn_gateway(&gateway).await;
    let client = reqwest::Client::new();

    let (mut reader_a, _session_a) = open_stream(&client, addr).await;
    let (mut reader_b, session_b) = open_stream(&client, addr).await;

    // One session has seen traffic, the other is idle.
    let resp = client
        .post(format!("http://{addr}/message/{session_b}"))
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "noop"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);
    assert!(reader_b.next_event().await.is_some());

    let coordinator =
        ShutdownCoordinator::new(gateway.registry(), Duration::from_secs(2));
    let report = coordinator.shutdown().await;
    assert!(report.is_clean());
    assert_eq!(report.closed, 2);

    // Both outbound sequences terminate.
    assert!(reader_a.next_event().await.is_none());
    assert!(reader_b.next_event().await.is_none());

    // The drained registry refuses new streams.
    let resp = client
        .get(format!("http://{addr}/stream"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
}

/// Engine whose handler never completes, to pin a hand-off mid-flight.
struct WedgedEngine;

#[async_trait]
impl ProtocolEngine for WedgedEngine {
    async fn attach(&self, transport: Arc<StreamTransport>) -> fleetgate_gateway::Result<()> {
        transport.send(Frame::endpoint(transport.session_id()))
    }

    async fn handle(
        &self,
        _transport: &StreamTransport,
        _request: JsonRpcRequest,
    ) -> fleetgate_gateway::Result<()> {
        futures::future::pending().await
    }
}

#[tokio::test]
async fn test_shutdown_resolves_in_flight_submission() {
    let gateway = Gateway::new(GatewayConfig::default(), Arc::new(WedgedEngine));
    let addr = spawn_gateway(&gateway).await;
    let client = reqwest::Client::new();

    let (_reader, session_id) = open_stream(&client, addr).await;

    // The submission blocks inside the wedged handler.
    let pending = {
        let client = client.clone();
        let url = format!("http://{addr}/message/{session_id}");
        tokio::spawn(async move {
            client
                .post(url)
                .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "noop"}))
                .send()
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let coordinator =
        ShutdownCoordinator::new(gateway.registry(), Duration::from_secs(2));
    let report = coordinator.shutdown().await;
    assert!(report.is_clean(), "cancelled hand-off should settle in time");

    // The caller gets a terminal status instead of hanging forever.
    let resp = pending.await.unwrap().expect("response");
    assert_eq!(resp.status(), 410);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "transport_closed");
}
