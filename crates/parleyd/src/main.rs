//! parleyd — Parley peer directory daemon.

use std::time::Duration;

use anyhow::Result;

use parley_core::config::ParleyConfig;
use parley_services::{Node, NodeEvent};

/// How often the LAN address is re-checked.
const IP_RECHECK: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = ParleyConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = ParleyConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        ParleyConfig::default()
    });

    let port = config.network.port;
    tracing::info!(port, "parleyd starting");

    let node = Node::new(config)?;

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let directory = parley_api::spawn(parley_api::ApiState { node: node.clone() }, port).await?;
    let own = node.profile().await;
    node.advertise(&own.ip, directory.port()).await;

    let event_logger = {
        let mut rx = node.events().subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => log_event(&event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "event log fell behind");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    };

    let ip_refresh = {
        let node = node.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(IP_RECHECK);
            loop {
                interval.tick().await;
                node.refresh_local_ip().await;
            }
        })
    };

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv() => tracing::info!("shutting down"),
        r = event_logger       => tracing::error!("event logger exited: {:?}", r),
        r = ip_refresh         => tracing::error!("ip refresh exited: {:?}", r),
    }

    node.shutdown();
    directory.stop().await;
    Ok(())
}

fn log_event(event: &NodeEvent) {
    match event {
        NodeEvent::PeerConnected(record) => {
            tracing::info!(peer_id = %record.id, nickname = %record.nickname, addr = %record.addr(), "peer connected");
        }
        NodeEvent::PeerDisconnected { peer_id } => {
            tracing::info!(peer_id = %peer_id, "peer disconnected");
        }
        NodeEvent::PeerInfoUpdated { peer_id } => {
            tracing::info!(peer_id = %peer_id, "peer info updated");
        }
        NodeEvent::MessageReceived { peer_id, message } => {
            tracing::info!(peer_id = %peer_id, message_id = %message.id, "message received");
        }
        NodeEvent::FileReceived { peer_id, message } => {
            tracing::info!(peer_id = %peer_id, message_id = %message.id, "file received");
        }
        NodeEvent::MessagesSynced { peer_id, messages } => {
            tracing::info!(peer_id = %peer_id, count = messages.len(), "messages synced");
        }
        NodeEvent::Error { context, detail } => {
            tracing::warn!(context = %context, detail = %detail, "node error");
        }
    }
}
