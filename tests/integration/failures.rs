//! Failure paths: unreachable peers, bad addresses, grace expiry, and
//! the sweep that follows.

use std::time::Duration;

use parley_core::NodeError;
use parley_services::NodeEvent;

use crate::*;

/// Dialing a dead port fails as `Unreachable` within the timeout and
/// leaves the store untouched.
#[tokio::test]
async fn connect_to_dead_port_leaves_store_unchanged() {
    let a = spawn_node("fail-dead").await;

    let err = a
        .node
        .connect_to_peer("127.0.0.1", dead_port())
        .await
        .expect_err("nothing listens there");
    assert!(matches!(err, NodeError::Unreachable { .. }), "got {err:?}");
    assert!(a.node.all_peers().is_empty());

    a.stop().await;
}

/// The control surface maps error causes to statuses: bad address 400,
/// unreachable 502.
#[tokio::test]
async fn control_surface_maps_errors_to_statuses() {
    let a = spawn_node("fail-status").await;
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/peers/connect", a.port());

    let bad_addr = client
        .post(&url)
        .json(&serde_json::json!({ "ip": "not-an-ip", "port": 8888 }))
        .send()
        .await
        .expect("request");
    assert_eq!(bad_addr.status().as_u16(), 400);

    let unreachable = client
        .post(&url)
        .json(&serde_json::json!({ "ip": "127.0.0.1", "port": dead_port() }))
        .send()
        .await
        .expect("request");
    assert_eq!(unreachable.status().as_u16(), 502);
    let body: serde_json::Value = unreachable.json().await.expect("error body");
    assert!(body["error"].is_string());

    a.stop().await;
}

/// When a peer goes silent past the grace window, its record flips to
/// disconnected, the loop announces it, and a sweep then drops it.
#[tokio::test]
async fn silent_peer_is_retired_after_grace_then_swept() {
    let a = spawn_node("fail-grace-a").await;
    let b = spawn_node("fail-grace-b").await;

    let b_record = a
        .node
        .connect_to_peer("127.0.0.1", b.port())
        .await
        .expect("handshake");
    let mut a_events = a.node.events().subscribe();

    // B vanishes without a goodbye.
    b.stop().await;

    let disconnected = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let NodeEvent::PeerDisconnected { peer_id } =
                a_events.recv().await.expect("event stream open")
            {
                break peer_id;
            }
        }
    })
    .await
    .expect("grace expiry should announce the disconnect");
    assert_eq!(disconnected, b_record.id);

    let stored = a.node.all_peers();
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].is_connected());

    let removed = a.node.sweep_stale();
    assert_eq!(removed, vec![b_record.id]);
    assert!(a.node.all_peers().is_empty());

    a.stop().await;
}

/// Sending to a vanished peer reports the failure but keeps the local
/// optimistic record.
#[tokio::test]
async fn failed_delivery_keeps_local_echo() {
    let a = spawn_node("fail-echo-a").await;
    let b = spawn_node("fail-echo-b").await;

    let b_record = a
        .node
        .connect_to_peer("127.0.0.1", b.port())
        .await
        .expect("handshake");
    b.stop().await;

    let err = a
        .node
        .send_message(&b_record.id, "anyone there?")
        .await
        .expect_err("peer is gone");
    assert!(matches!(err, NodeError::Unreachable { .. }), "got {err:?}");

    let outbox = a.node.history(&b_record.id);
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].content.as_deref(), Some("anyone there?"));

    a.stop().await;
}
