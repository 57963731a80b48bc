//! Node event bus — fan-out notifications to local observers.
//!
//! The daemon logs these; embedding shells (the excluded GUI) would
//! forward them to their UI layer. Publishing never blocks and never
//! fails: with no subscribers the event is simply dropped.

use parley_core::{ChatMessage, PeerRecord};
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub enum NodeEvent {
    PeerConnected(PeerRecord),
    PeerDisconnected { peer_id: String },
    PeerInfoUpdated { peer_id: String },
    MessageReceived { peer_id: String, message: ChatMessage },
    FileReceived { peer_id: String, message: ChatMessage },
    /// One per newly merged history batch, not one per message.
    MessagesSynced {
        peer_id: String,
        messages: Vec<ChatMessage>,
    },
    Error { context: String, detail: String },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<NodeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: NodeEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
