//! parley-core — shared types, identity, configuration, and error taxonomy.
//! All other Parley crates depend on this one.

pub mod config;
pub mod error;
pub mod identity;
pub mod message;
pub mod peer;

pub use error::NodeError;
pub use identity::UserProfile;
pub use message::{ChatMessage, FileDescriptor, MessageKind};
pub use peer::{PeerRecord, PeerStatus};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
