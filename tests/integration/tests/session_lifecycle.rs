//! End-to-end session lifecycle over real HTTP.
//!
//! Covers stream open, message submission, client-initiated close, and
//! the error surfaces for unknown sessions and the session limit.

use fleetgate_gateway::{Gateway, GatewayConfig};
use fleetgate_integration_tests::{open_stream, spawn_gateway};
use serde_json::json;
use std::time::Duration;

async fn default_gateway() -> Gateway {
    Gateway::with_builtin_tools(GatewayConfig::default()).await
}

#[tokio::test]
async fn test_health_reports_session_count() {
    let gateway = default_gateway().await;
    let addr = spawn_gateway(&gateway).await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["sessions"], json!(0));

    let (_reader, _session_id) = open_stream(&client, addr).await;

    let body: serde_json::Value = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["sessions"], json!(1));
}

#[tokio::test]
async fn test_submit_to_unknown_session_is_not_found() {
    let gateway = default_gateway().await;
    let addr = spawn_gateway(&gateway).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/message/no-such-session"))
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "noop"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "session_not_found");
}

#[tokio::test]
async fn test_open_submit_close_lifecycle() {
    let gateway = default_gateway().await;
    let addr = spawn_gateway(&gateway).await;
    let client = reqwest::Client::new();

    let (mut reader, session_id) = open_stream(&client, addr).await;

    // Submit a call; the ack is decoupled from the response frame.
    let resp = client
        .post(format!("http://{addr}/message/{session_id}"))
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "noop"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);
    let ack: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(ack["ok"], json!(true));
    assert_eq!(ack["session_id"], json!(session_id));

    // The correlated response arrives on the stream.
    let event = reader.next_event().await.expect("response frame");
    assert_eq!(event.event, "message");
    let response: serde_json::Value = serde_json::from_str(&event.data).unwrap();
    assert_eq!(response["id"], json!(1));
    assert_eq!(response["result"]["ok"], json!(true));

    // Client-initiated close.
    let resp = client
        .delete(format!("http://{addr}/stream/{session_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    // The outbound sequence terminates.
    assert!(reader.next_event().await.is_none());

    // Deregistration runs off the close path; wait for it to land.
    let registry = gateway.registry();
    for _ in 0..100 {
        if registry.lookup(&session_id).await.is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // The identity is gone for good.
    let resp = client
        .post(format!("http://{addr}/message/{session_id}"))
        .json(&json!({"jsonrpc": "2.0", "id": 2, "method": "noop"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_unknown_tool_surfaces_as_rpc_error_frame() {
    let gateway = default_gateway().await;
    let addr = spawn_gateway(&gateway).await;
    let client = reqwest::Client::new();

    let (mut reader, session_id) = open_stream(&client, addr).await;

    let resp = client
        .post(format!("http://{addr}/message/{session_id}"))
        .json(&json!({"jsonrpc": "2.0", "id": 9, "method": "no.such.tool"}))
        .send()
        .await
        .unwrap();
    // Dispatch failures are not submission failures.
    assert_eq!(resp.status(), 202);

    let event = reader.next_event().await.expect("error frame");
    let response: serde_json::Value = serde_json::from_str(&event.data).unwrap();
    assert_eq!(response["id"], json!(9));
    assert_eq!(response["error"]["code"], json!(-32601));
}

#[tokio::test]
async fn test_session_limit_rejects_new_streams() {
    let config = GatewayConfig {
        max_sessions: 1,
        ..Default::default()
    };
    let gateway = Gateway::with_builtin_tools(config).await;
    let addr = spawn_gateway(&gateway).await;
    let client = reqwest::Client::new();

    let (_reader, _session_id) = open_stream(&client, addr).await;

    let resp = client
        .get(format!("http://{addr}/stream"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "registration_failed");
}

#[tokio::test]
async fn test_client_disconnect_deregisters_session() {
    let gateway = default_gateway().await;
    let addr = spawn_gateway(&gateway).await;
    let client = reqwest::Client::new();

    let (reader, session_id) = open_stream(&client, addr).await;
    drop(reader);

    // The server notices the dropped connection and tears the session down.
    let registry = gateway.registry();
    let mut gone = false;
    for _ in 0..200 {
        if registry.lookup(&session_id).await.is_none() {
            gone = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(gone, "session should deregister after client disconnect");
}
