//! Error taxonomy for node operations.
//!
//! One variant per failure class the protocol distinguishes. Scanner and
//! sync swallow per-host errors internally; everything user-initiated
//! (connect, send, profile update) propagates one of these.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// The given ip/port is not a dialable IPv4 address.
    #[error("invalid peer address: {0}")]
    InvalidAddress(String),

    /// The peer did not answer within the allotted timeout, refused the
    /// connection, or the host could not be reached at all.
    #[error("peer {addr} unreachable: {reason}")]
    Unreachable { addr: String, reason: String },

    /// The peer answered HTTP but outside the protocol (non-success
    /// status, or a body that does not parse).
    #[error("protocol error from {addr}: {detail}")]
    Protocol { addr: String, detail: String },

    /// No record for this peer id in the store.
    #[error("unknown peer: {0}")]
    PeerNotFound(String),

    /// No staged file matches this file id.
    #[error("unknown file: {0}")]
    FileNotFound(String),

    /// Local persistence failed (profile, peer set, staged file).
    #[error("storage failure on {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl NodeError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Storage error wrapping a JSON (de)serialization failure.
    pub fn storage_json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_address() {
        let err = NodeError::Unreachable {
            addr: "192.168.1.7:8888".into(),
            reason: "connection timed out".into(),
        };
        let text = err.to_string();
        assert!(text.contains("192.168.1.7:8888"));
        assert!(text.contains("timed out"));
    }

    #[test]
    fn storage_json_preserves_path() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = NodeError::storage_json("/tmp/user.json", parse_err);
        assert!(err.to_string().contains("/tmp/user.json"));
    }
}
