//! Per-peer synchronization loops.
//!
//! One background task per connected peer: ping on an interval, pull the
//! peer's copy of our conversation, merge what is new, and give a peer
//! that stops answering a grace window before declaring it gone. The
//! unreachable clock lives inside the task, so a ping that briefly
//! succeeds resets it and a flapping peer is not retired early.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parley_core::config::SyncConfig;
use parley_core::now_ms;
use tokio::task::JoinHandle;

use crate::client::PeerClient;
use crate::events::{EventBus, NodeEvent};
use crate::history::ChatHistory;
use crate::peer_store::PeerStore;

struct SyncInner {
    tasks: DashMap<String, JoinHandle<()>>,
    peers: PeerStore,
    history: ChatHistory,
    client: PeerClient,
    events: EventBus,
    config: SyncConfig,
    own_id: String,
}

/// Registry of running sync loops, keyed by peer id.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<SyncInner>,
}

impl SyncEngine {
    pub fn new(
        peers: PeerStore,
        history: ChatHistory,
        client: PeerClient,
        events: EventBus,
        config: SyncConfig,
        own_id: String,
    ) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                tasks: DashMap::new(),
                peers,
                history,
                client,
                events,
                config,
                own_id,
            }),
        }
    }

    /// Start a loop for `peer_id` if one is not already running.
    pub fn start(&self, peer_id: &str) {
        match self.inner.tasks.entry(peer_id.to_string()) {
            Entry::Occupied(mut slot) => {
                if !slot.get().is_finished() {
                    return;
                }
                let inner = Arc::clone(&self.inner);
                let id = peer_id.to_string();
                slot.insert(tokio::spawn(run(inner, id)));
            }
            Entry::Vacant(slot) => {
                let inner = Arc::clone(&self.inner);
                let id = peer_id.to_string();
                slot.insert(tokio::spawn(run(inner, id)));
                tracing::debug!(peer_id, "sync loop started");
            }
        }
    }

    /// Abort the loop for `peer_id`, if any.
    pub fn stop(&self, peer_id: &str) {
        if let Some((_, handle)) = self.inner.tasks.remove(peer_id) {
            handle.abort();
            tracing::debug!(peer_id, "sync loop stopped");
        }
    }

    pub fn stop_all(&self) {
        let ids: Vec<String> = self.inner.tasks.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.stop(&id);
        }
    }

    pub fn is_tracking(&self, peer_id: &str) -> bool {
        self.inner
            .tasks
            .get(peer_id)
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

async fn run(inner: Arc<SyncInner>, peer_id: String) {
    let mut tick = tokio::time::interval(Duration::from_millis(inner.config.interval_ms));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let ping_timeout = Duration::from_millis(inner.config.ping_timeout_ms);
    let history_timeout = Duration::from_millis(inner.config.history_timeout_ms);
    let mut unreachable_since: Option<u64> = None;

    loop {
        tick.tick().await;

        // Re-read each tick so eviction elsewhere stops the loop promptly.
        let Some(record) = inner.peers.get(&peer_id) else {
            break;
        };

        if inner.client.ping(&record.ip, record.port, ping_timeout).await {
            unreachable_since = None;
            inner.peers.mark_connected(&peer_id);

            match inner
                .client
                .fetch_history(&record.ip, record.port, &inner.own_id, history_timeout)
                .await
            {
                Ok(remote) => {
                    let admitted = inner.history.merge(&peer_id, remote);
                    if !admitted.is_empty() {
                        tracing::debug!(peer_id = %peer_id, count = admitted.len(), "history merged");
                        inner.events.publish(NodeEvent::MessagesSynced {
                            peer_id: peer_id.clone(),
                            messages: admitted,
                        });
                    }
                }
                Err(err) => {
                    tracing::debug!(peer_id = %peer_id, error = %err, "history pull failed");
                }
            }
        } else {
            inner.peers.mark_disconnected(&peer_id);
            let since = *unreachable_since.get_or_insert_with(now_ms);
            if now_ms().saturating_sub(since) > inner.config.grace_ms {
                tracing::info!(peer_id = %peer_id, "peer silent past grace, giving up");
                inner.events.publish(NodeEvent::PeerDisconnected {
                    peer_id: peer_id.clone(),
                });
                break;
            }
        }
    }

    inner.tasks.remove(&peer_id);
}
