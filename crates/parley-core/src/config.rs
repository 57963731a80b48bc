//! Configuration system for Parley.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $PARLEY_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/parley/config.json
//!   3. ~/.config/parley/config.json

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParleyConfig {
    pub network: NetworkConfig,
    pub peers: PeersConfig,
    pub sync: SyncConfig,
    pub scan: ScanConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// HTTP port the directory service listens on. 0 = OS-assigned.
    pub port: u16,
    /// Budget for an outbound connect handshake, milliseconds.
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeersConfig {
    /// Treat a new record reusing a known nickname at a different address
    /// as a reconnection and evict the old record.
    pub dedup_by_nickname: bool,
    /// Records unseen this long are removed by the stale sweep, ms.
    pub stale_after_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Poll tick per tracked peer, ms.
    pub interval_ms: u64,
    /// Ping budget inside a tick, ms.
    pub ping_timeout_ms: u64,
    /// History-pull budget inside a tick, ms.
    pub history_timeout_ms: u64,
    /// Continuous unreachability tolerated before the peer is declared
    /// disconnected, ms.
    pub grace_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Hosts probed concurrently per batch.
    pub batch_size: usize,
    /// Pause between batches, ms.
    pub batch_delay_ms: u64,
    /// Per-host budget covering both probe stages, ms.
    pub probe_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding user.json, peers.json, and staged uploads.
    pub data_dir: PathBuf,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ParleyConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            peers: PeersConfig::default(),
            sync: SyncConfig::default(),
            scan: ScanConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: 8888,
            connect_timeout_ms: 10_000,
        }
    }
}

impl Default for PeersConfig {
    fn default() -> Self {
        Self {
            dedup_by_nickname: true,
            stale_after_ms: 5 * 60 * 1000,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            ping_timeout_ms: 3_000,
            history_timeout_ms: 5_000,
            grace_ms: 30_000,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            batch_delay_ms: 10,
            probe_timeout_ms: 3_000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: data_dir(),
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("parley")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("parley")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, serde_json::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(serde_json::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl ParleyConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            serde_json::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            ParleyConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("PARLEY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.json"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = serde_json::to_string_pretty(&ParleyConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text)
                .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply PARLEY_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PARLEY_NETWORK__PORT") {
            if let Ok(p) = v.parse() {
                self.network.port = p;
            }
        }
        if let Ok(v) = std::env::var("PARLEY_PEERS__DEDUP_BY_NICKNAME") {
            self.peers.dedup_by_nickname = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("PARLEY_SYNC__INTERVAL_MS") {
            if let Ok(ms) = v.parse() {
                self.sync.interval_ms = ms;
            }
        }
        if let Ok(v) = std::env::var("PARLEY_STORAGE__DATA_DIR") {
            self.storage.data_dir = PathBuf::from(v);
        }
    }
}
