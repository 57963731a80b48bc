//! parley-services — peer directory, sync engine, and transfer plumbing.
//!
//! Everything here is shared between the HTTP surface (`parley-api`), the
//! daemon, and the integration tests. Stores are clone-able handles over
//! `Arc<DashMap>` state.

pub mod client;
pub mod content_store;
pub mod events;
pub mod history;
pub mod node;
pub mod peer_store;
pub mod scanner;
pub mod sync;

pub use client::PeerClient;
pub use content_store::{ContentStore, StagedFile};
pub use events::{EventBus, NodeEvent};
pub use history::ChatHistory;
pub use node::{Node, NodeStatus, ProfilePatch};
pub use peer_store::{PeerStore, Upserted};
pub use scanner::{scan, ScanHit, ScanKind};
pub use sync::SyncEngine;
