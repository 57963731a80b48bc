//! Chat messages and file descriptors — the payloads peers exchange.
//!
//! Message ids are deterministic: both ends of the wire hash the same
//! fields, so a sender's local copy and the receiver's stored copy carry
//! the same id and history merges dedup exactly.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::now_ms;

/// Kind tag on a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    File,
}

/// Descriptor for a staged file, embedded in file messages and returned
/// by the upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub file_id: String,
    pub original_name: String,
    pub size: u64,
    /// Unix timestamp in milliseconds at staging time.
    pub upload_time: u64,
    /// URL any LAN peer can fetch the bytes from.
    pub download_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_nickname: Option<String>,
}

/// One entry in a per-peer chat history. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: String,
    pub sender_nickname: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileDescriptor>,
    /// Unix timestamp in milliseconds, sender's clock.
    pub timestamp: u64,
}

impl ChatMessage {
    pub fn text(sender_id: &str, sender_nickname: &str, content: &str, timestamp: u64) -> Self {
        Self {
            id: text_message_id(sender_id, timestamp, content),
            sender_id: sender_id.to_string(),
            sender_nickname: sender_nickname.to_string(),
            kind: MessageKind::Text,
            content: Some(content.to_string()),
            file_info: None,
            timestamp,
        }
    }

    pub fn file(
        sender_id: &str,
        sender_nickname: &str,
        file_info: FileDescriptor,
        timestamp: u64,
    ) -> Self {
        Self {
            id: file_message_id(sender_id, file_info.upload_time, &file_info.file_id),
            sender_id: sender_id.to_string(),
            sender_nickname: sender_nickname.to_string(),
            kind: MessageKind::File,
            content: None,
            file_info: Some(file_info),
            timestamp,
        }
    }
}

// ── Deterministic ids ─────────────────────────────────────────────────────────

/// Id of a text message: `hex(blake3(sender || timestamp_le || content))`.
pub fn text_message_id(sender_id: &str, timestamp: u64, content: &str) -> String {
    let mut h = blake3::Hasher::new();
    h.update(sender_id.as_bytes());
    h.update(&timestamp.to_le_bytes());
    h.update(content.as_bytes());
    hex::encode(h.finalize().as_bytes())
}

/// Id of a file message: `hex(blake3(sender || upload_time_le || file_id))`.
pub fn file_message_id(sender_id: &str, upload_time: u64, file_id: &str) -> String {
    let mut h = blake3::Hasher::new();
    h.update(sender_id.as_bytes());
    h.update(&upload_time.to_le_bytes());
    h.update(file_id.as_bytes());
    hex::encode(h.finalize().as_bytes())
}

/// Short unique id for a staged file: `<unix_ms>-<random>`.
pub fn new_file_id() -> String {
    format!(
        "{}-{}",
        now_ms(),
        rand::thread_rng().gen_range(0..1_000_000_000u32)
    )
}
