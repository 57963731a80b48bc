//! Peer records — the directory's view of other instances on the LAN.

use serde::{Deserialize, Serialize};

use crate::identity::UserProfile;
use crate::now_ms;

/// Presence state of a tracked peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerStatus {
    Connected,
    Disconnected,
}

/// One tracked peer.
///
/// Unique by `id`. The store additionally enforces at most one record per
/// (ip, port), newest observation winning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerRecord {
    pub id: String,
    pub nickname: String,
    pub avatar: String,
    pub ip: String,
    pub port: u16,
    pub status: PeerStatus,
    /// Unix timestamp in milliseconds of the last observation.
    pub last_seen: u64,
    /// Protocol version the peer announced.
    pub version: String,
}

impl PeerRecord {
    /// Build a record from a handshake profile and the address it was
    /// actually observed at. The observed address wins over whatever the
    /// profile claims.
    pub fn from_profile(profile: &UserProfile, ip: &str, port: u16) -> Self {
        Self {
            id: profile.id.clone(),
            nickname: profile.nickname.clone(),
            avatar: profile.avatar.clone(),
            ip: ip.to_string(),
            port,
            status: PeerStatus::Connected,
            last_seen: now_ms(),
            version: profile.version.clone(),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.ip, self.port)
    }

    pub fn is_connected(&self) -> bool {
        self.status == PeerStatus::Connected
    }
}
