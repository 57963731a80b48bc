//! Subnet scanning against a live node on loopback.
//!
//! The scanner probes the /24 around its base address on the well-known
//! port, so the scanning node's config points at the listener's real
//! port and the base is `127.0.0.2` — leaving `127.0.0.1`, where the
//! target listens, as one of the probed hosts.

use parley_services::{ScanHit, ScanKind};

use crate::*;

#[tokio::test]
async fn scan_finds_the_listening_peer_and_skips_self() {
    let target = spawn_node("scan-target").await;

    let mut config = test_config("scan-probe");
    config.network.port = target.port();
    let prober = spawn_node_with(config).await;

    let hits = prober
        .node
        .scan_network(Some("127.0.0.2".to_string()))
        .await
        .expect("scan");

    assert!(
        hits.iter()
            .any(|h| h.ip == "127.0.0.1" && h.kind == ScanKind::Peer),
        "target not found: {hits:?}"
    );
    // The base host is never probed.
    assert!(hits.iter().all(|h| h.ip != "127.0.0.2"));
    // Nothing else on loopback answers that port.
    assert!(hits.iter().all(|h| h.ip == "127.0.0.1"));

    target.stop().await;
    prober.stop().await;
}

#[tokio::test]
async fn scan_rejects_garbage_base() {
    let a = spawn_node("scan-garbage").await;

    let err = a
        .node
        .scan_network(Some("definitely.not.an.ip".to_string()))
        .await
        .expect_err("base must be IPv4");
    assert!(matches!(err, parley_core::NodeError::InvalidAddress(_)));

    a.stop().await;
}

#[tokio::test]
async fn scan_reports_plain_http_responders_separately() {
    // A listener that speaks HTTP but not the peer protocol: bind a raw
    // TCP socket that answers any request with 404.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let port = listener.local_addr().expect("addr").port();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                use tokio::io::{AsyncReadExt, AsyncWriteExt};
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\n\r\n")
                    .await;
            });
        }
    });

    let mut config = test_config("scan-http");
    config.network.port = port;
    let prober = spawn_node_with(config).await;

    let hits: Vec<ScanHit> = prober
        .node
        .scan_network(Some("127.0.0.2".to_string()))
        .await
        .expect("scan");

    assert!(
        hits.iter()
            .any(|h| h.ip == "127.0.0.1" && h.kind == ScanKind::HttpResponder),
        "responder not classified: {hits:?}"
    );
    assert!(!hits
        .iter()
        .any(|h| h.ip == "127.0.0.1" && h.kind == ScanKind::Peer));

    prober.stop().await;
}
