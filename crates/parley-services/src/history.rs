//! Per-peer chat histories with pull-merge semantics.
//!
//! Each peer id keys an append-only log capped at [`HISTORY_CAP`]
//! entries, oldest trimmed first. Merging remote history admits only
//! messages authored by that peer, so a pull never re-imports the local
//! side's own echoes.

use std::sync::Arc;

use dashmap::DashMap;
use parley_core::ChatMessage;

/// Retention cap per peer.
pub const HISTORY_CAP: usize = 1000;

/// In-memory chat history store.
#[derive(Clone, Default)]
pub struct ChatHistory {
    /// Messages per conversation: peer id -> ordered log.
    messages: Arc<DashMap<String, Vec<ChatMessage>>>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(DashMap::new()),
        }
    }

    /// Append one message. Returns false if a message with the same id is
    /// already recorded (safe against redelivery).
    pub fn append(&self, peer_id: &str, message: ChatMessage) -> bool {
        let mut log = self.messages.entry(peer_id.to_string()).or_default();
        if log.iter().any(|m| m.id == message.id) {
            return false;
        }
        log.push(message);
        trim(&mut log);
        true
    }

    /// Merge a remote history pull. Admits messages whose id is unknown
    /// AND whose sender is `peer_id`, re-sorts by timestamp, trims to the
    /// cap, and returns the admitted batch. Idempotent by message id.
    pub fn merge(&self, peer_id: &str, remote: Vec<ChatMessage>) -> Vec<ChatMessage> {
        let mut log = self.messages.entry(peer_id.to_string()).or_default();
        let mut admitted: Vec<ChatMessage> = Vec::new();

        for msg in remote {
            if msg.sender_id != peer_id {
                continue;
            }
            if log.iter().any(|m| m.id == msg.id) || admitted.iter().any(|m| m.id == msg.id) {
                continue;
            }
            admitted.push(msg);
        }

        if !admitted.is_empty() {
            log.extend(admitted.iter().cloned());
            log.sort_by_key(|m| m.timestamp);
            trim(&mut log);
        }

        admitted
    }

    /// Full retained conversation with a peer, oldest first.
    pub fn get(&self, peer_id: &str) -> Vec<ChatMessage> {
        self.messages
            .get(peer_id)
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, peer_id: &str) -> usize {
        self.messages.get(peer_id).map(|log| log.len()).unwrap_or(0)
    }
}

fn trim(log: &mut Vec<ChatMessage>) {
    if log.len() > HISTORY_CAP {
        let excess = log.len() - HISTORY_CAP;
        log.drain(..excess);
    }
}
