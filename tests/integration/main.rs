//! Parley integration test harness.
//!
//! Each test spins up one or two complete in-process nodes: a [`Node`]
//! plus its directory service bound on `0.0.0.0` with an OS-assigned
//! port, talking to each other over loopback. Nodes advertise
//! `127.0.0.1:<bound port>` so handshakes carry a reachable address.
//!
//! Every node gets its own throwaway data directory; tests clean up
//! whatever they create.

mod directory;
mod failures;
mod files;
mod messaging;
mod scan;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use parley_api::{ApiState, DirectoryHandle};
use parley_core::config::{ParleyConfig, ScanConfig, StorageConfig, SyncConfig};
use parley_services::Node;

static NODE_SEQ: AtomicU32 = AtomicU32::new(0);

// ── Harness ───────────────────────────────────────────────────────────────────

pub struct TestNode {
    pub node: Node,
    pub directory: DirectoryHandle,
    pub data_dir: PathBuf,
}

impl TestNode {
    pub fn port(&self) -> u16 {
        self.directory.port()
    }

    pub async fn stop(self) {
        self.node.shutdown();
        self.directory.stop().await;
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}

/// Config with aggressive timings so sync transitions land within a
/// test-friendly window.
pub fn test_config(tag: &str) -> ParleyConfig {
    let seq = NODE_SEQ.fetch_add(1, Ordering::Relaxed);
    let data_dir = std::env::temp_dir().join(format!(
        "parley-it-{tag}-{}-{seq}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&data_dir);

    ParleyConfig {
        sync: SyncConfig {
            interval_ms: 50,
            ping_timeout_ms: 500,
            history_timeout_ms: 500,
            grace_ms: 400,
        },
        scan: ScanConfig {
            batch_size: 64,
            batch_delay_ms: 1,
            probe_timeout_ms: 500,
        },
        storage: StorageConfig { data_dir },
        ..ParleyConfig::default()
    }
}

pub async fn spawn_node(tag: &str) -> TestNode {
    spawn_node_with(test_config(tag)).await
}

pub async fn spawn_node_with(config: ParleyConfig) -> TestNode {
    let data_dir = config.storage.data_dir.clone();
    let node = Node::new(config).expect("node should build");
    let directory = parley_api::spawn(ApiState { node: node.clone() }, 0)
        .await
        .expect("directory service should bind");
    node.advertise("127.0.0.1", directory.port()).await;
    TestNode {
        node,
        directory,
        data_dir,
    }
}

/// Poll `check` until it holds or the deadline passes.
pub async fn wait_until<F>(what: &str, timeout: Duration, mut check: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("timed out waiting for {what}");
}

/// A port nothing listens on: bind, read the port, drop the listener.
pub fn dead_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("local addr").port()
}
