//! Local identity — the profile this instance presents on the network.
//!
//! Generated on first run, persisted to `user.json`, reloaded on every
//! start. Only `update` mutates it after that.

use std::net::SocketAddr;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::NodeError;
use crate::now_ms;

/// Protocol version announced in handshakes.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// The local user profile, also the body of the `/connect` handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub nickname: String,
    /// Icon tag rendered by clients, e.g. "fas fa-user".
    pub avatar: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    PROTOCOL_VERSION.to_string()
}

impl UserProfile {
    /// Fresh identity for a first run.
    ///
    /// The id embeds the creation time plus a short random suffix, so two
    /// instances started in the same millisecond still diverge.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            id: format!("user_{}_{}", now_ms(), random_suffix(&mut rng, 9)),
            nickname: format!("user-{:03}", rng.gen_range(0..1000)),
            avatar: "fas fa-user".to_string(),
            ip: String::new(),
            port: 0,
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    /// Load the profile from `path`, generating and persisting a fresh one
    /// if the file does not exist yet.
    pub fn load_or_create(path: &Path) -> Result<Self, NodeError> {
        if path.exists() {
            let text =
                std::fs::read_to_string(path).map_err(|e| NodeError::storage(path, e))?;
            serde_json::from_str(&text).map_err(|e| NodeError::storage_json(path, e))
        } else {
            let profile = Self::generate();
            profile.save(path)?;
            Ok(profile)
        }
    }

    /// Persist to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), NodeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| NodeError::storage(path, e))?;
        }
        let text =
            serde_json::to_string_pretty(self).map_err(|e| NodeError::storage_json(path, e))?;
        std::fs::write(path, text).map_err(|e| NodeError::storage(path, e))
    }
}

fn random_suffix(rng: &mut impl Rng, len: usize) -> String {
    const CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    (0..len)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// Best-effort LAN address detection.
///
/// A UDP socket "connected" to an outside address reveals which local
/// interface the OS would route through. No packet is sent.
pub fn detect_local_ip() -> Option<String> {
    let probe = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    probe.connect("8.8.8.8:80").ok()?;
    match probe.local_addr().ok()? {
        SocketAddr::V4(v4) if !v4.ip().is_loopback() => Some(v4.ip().to_string()),
        _ => None,
    }
}
