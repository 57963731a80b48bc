//! Handshake and peer directory behavior across two live nodes.

use std::time::Duration;

use crate::*;

/// A dials B: both sides end up with exactly one connected record for
/// the other, each carrying the dialed/advertised loopback address.
#[tokio::test]
async fn connect_registers_both_sides() {
    let a = spawn_node("dir-a").await;
    let b = spawn_node("dir-b").await;

    let a_id = a.node.profile().await.id;
    let b_id = b.node.profile().await.id;

    let record = a
        .node
        .connect_to_peer("127.0.0.1", b.port())
        .await
        .expect("handshake should succeed");
    assert_eq!(record.id, b_id);
    assert_eq!(record.addr(), format!("127.0.0.1:{}", b.port()));
    assert!(record.is_connected());

    // B learned about A from the inbound handshake.
    wait_until("B to register A", Duration::from_secs(5), || {
        b.node.all_peers().iter().any(|p| p.id == a_id)
    })
    .await;

    assert_eq!(a.node.all_peers().len(), 1);
    assert_eq!(b.node.all_peers().len(), 1);
    let b_side = &b.node.all_peers()[0];
    assert_eq!(b_side.addr(), format!("127.0.0.1:{}", a.port()));
    assert!(b_side.is_connected());

    a.stop().await;
    b.stop().await;
}

/// Reconnecting after a restart (same nickname, new id, new port) leaves
/// exactly one record on the remote side.
#[tokio::test]
async fn reconnect_with_new_identity_replaces_old_record() {
    let b = spawn_node("dir-replace-b").await;

    let a1 = spawn_node("dir-replace-a1").await;
    let nickname = a1
        .node
        .update_profile(parley_services::ProfilePatch {
            nickname: Some("wanderer".into()),
            avatar: None,
        })
        .await
        .expect("profile update")
        .nickname;
    a1.node
        .connect_to_peer("127.0.0.1", b.port())
        .await
        .expect("first handshake");
    let a1_id = a1.node.profile().await.id;
    a1.stop().await;

    let a2 = spawn_node("dir-replace-a2").await;
    a2.node
        .update_profile(parley_services::ProfilePatch {
            nickname: Some(nickname.clone()),
            avatar: None,
        })
        .await
        .expect("profile update");
    a2.node
        .connect_to_peer("127.0.0.1", b.port())
        .await
        .expect("second handshake");
    let a2_id = a2.node.profile().await.id;

    wait_until("old record to be replaced", Duration::from_secs(5), || {
        let peers = b.node.all_peers();
        peers.len() == 1 && peers[0].id == a2_id
    })
    .await;
    assert_ne!(a1_id, a2_id);

    a2.stop().await;
    b.stop().await;
}

/// A handshake without a user id is rejected with a structured 400 and
/// registers nothing.
#[tokio::test]
async fn connect_without_user_id_is_rejected() {
    let b = spawn_node("dir-badreq").await;

    let body = serde_json::json!({
        "user": { "id": "", "nickname": "ghost", "avatar": "fas fa-ghost" }
    });
    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}/connect", b.port()))
        .json(&body)
        .send()
        .await
        .expect("request should reach the node");

    assert_eq!(resp.status().as_u16(), 400);
    let error: serde_json::Value = resp.json().await.expect("error body");
    assert!(error["error"].is_string());
    assert!(b.node.all_peers().is_empty());

    b.stop().await;
}

/// /status advertises the scanner's protocol marker fields.
#[tokio::test]
async fn status_reports_identity_and_peer_count() {
    let a = spawn_node("dir-status").await;

    let status: serde_json::Value =
        reqwest::get(format!("http://127.0.0.1:{}/status", a.port()))
            .await
            .expect("status request")
            .json()
            .await
            .expect("status body");

    assert_eq!(status["isRunning"], true);
    assert_eq!(status["peersCount"], 0);
    assert_eq!(status["port"].as_u64().unwrap() as u16, a.port());
    assert_eq!(status["user"]["id"], a.node.profile().await.id);

    a.stop().await;
}

/// Profile updates fan out to connected peers and land in their stores.
#[tokio::test]
async fn profile_update_propagates_to_peers() {
    let a = spawn_node("dir-profile-a").await;
    let b = spawn_node("dir-profile-b").await;

    let a_id = a.node.profile().await.id;
    a.node
        .connect_to_peer("127.0.0.1", b.port())
        .await
        .expect("handshake");

    a.node
        .update_profile(parley_services::ProfilePatch {
            nickname: Some("renamed".into()),
            avatar: Some("fas fa-rocket".into()),
        })
        .await
        .expect("profile update");

    wait_until("B to see the new nickname", Duration::from_secs(5), || {
        b.node
            .all_peers()
            .iter()
            .any(|p| p.id == a_id && p.nickname == "renamed" && p.avatar == "fas fa-rocket")
    })
    .await;

    a.stop().await;
    b.stop().await;
}
