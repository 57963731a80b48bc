//! Peer store — the directory's record set, with JSON persistence.
//!
//! Invariants enforced on every upsert: unique by id, at most one record
//! per (ip, port), and optionally at most one record per nickname (a
//! reconnect under a new address supersedes the old record).

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use parley_core::config::PeersConfig;
use parley_core::{now_ms, PeerRecord, PeerStatus};

/// Result of an upsert: the canonical stored record plus the ids of any
/// records the dedup rules evicted. Callers stop sync loops for the
/// evicted ids.
#[derive(Debug)]
pub struct Upserted {
    pub record: PeerRecord,
    pub evicted: Vec<String>,
}

/// In-memory peer set persisted to `peers.json` on every mutation.
#[derive(Clone)]
pub struct PeerStore {
    peers: Arc<DashMap<String, PeerRecord>>,
    path: Option<PathBuf>,
    dedup_by_nickname: bool,
    stale_after_ms: u64,
}

impl PeerStore {
    /// Open the store backed by `path`, loading any persisted records.
    /// Duplicate (ip, port) entries in the file keep the newest.
    pub fn open(path: PathBuf, config: &PeersConfig) -> Self {
        let store = Self {
            peers: Arc::new(DashMap::new()),
            path: Some(path),
            dedup_by_nickname: config.dedup_by_nickname,
            stale_after_ms: config.stale_after_ms,
        };
        store.load();
        store
    }

    /// Store without persistence.
    pub fn in_memory(config: &PeersConfig) -> Self {
        Self {
            peers: Arc::new(DashMap::new()),
            path: None,
            dedup_by_nickname: config.dedup_by_nickname,
            stale_after_ms: config.stale_after_ms,
        }
    }

    // ── Mutations ─────────────────────────────────────────────────────────────

    /// Register or refresh a peer. Runs the stale sweep first, applies the
    /// dedup invariants, marks the record connected, and persists.
    pub fn upsert(&self, mut incoming: PeerRecord) -> Upserted {
        self.sweep_stale();

        incoming.status = PeerStatus::Connected;
        incoming.last_seen = now_ms();

        let mut evicted = Vec::new();

        if self.dedup_by_nickname && !incoming.nickname.is_empty() {
            let duplicates: Vec<String> = self
                .peers
                .iter()
                .filter(|p| {
                    p.nickname == incoming.nickname
                        && p.id != incoming.id
                        && (p.ip != incoming.ip || p.port != incoming.port)
                })
                .map(|p| p.id.clone())
                .collect();
            for id in duplicates {
                tracing::info!(
                    nickname = %incoming.nickname,
                    old = %id,
                    "nickname reconnected from a new address, dropping old record"
                );
                self.peers.remove(&id);
                evicted.push(id);
            }
        }

        let address_duplicates: Vec<String> = self
            .peers
            .iter()
            .filter(|p| p.ip == incoming.ip && p.port == incoming.port && p.id != incoming.id)
            .map(|p| p.id.clone())
            .collect();
        for id in address_duplicates {
            self.peers.remove(&id);
            evicted.push(id);
        }

        self.peers.insert(incoming.id.clone(), incoming.clone());
        self.persist();

        Upserted {
            record: incoming,
            evicted,
        }
    }

    /// Remove every record that is not connected or has not been seen
    /// within the stale threshold. Idempotent. Returns removed ids.
    pub fn sweep_stale(&self) -> Vec<String> {
        let now = now_ms();
        let stale: Vec<String> = self
            .peers
            .iter()
            .filter(|p| {
                !p.is_connected() || now.saturating_sub(p.last_seen) > self.stale_after_ms
            })
            .map(|p| p.id.clone())
            .collect();
        for id in &stale {
            self.peers.remove(id);
        }
        if !stale.is_empty() {
            tracing::debug!(removed = stale.len(), "swept stale peers");
            self.persist();
        }
        stale
    }

    /// Drop every record that is not currently connected. Returns removed ids.
    pub fn force_reset(&self) -> Vec<String> {
        let gone: Vec<String> = self
            .peers
            .iter()
            .filter(|p| !p.is_connected())
            .map(|p| p.id.clone())
            .collect();
        for id in &gone {
            self.peers.remove(id);
        }
        if !gone.is_empty() {
            self.persist();
        }
        gone
    }

    /// Bulk-evict records unseen for longer than `days`. Returns removed ids.
    pub fn retire(&self, days: u32) -> Vec<String> {
        let cutoff = now_ms().saturating_sub(days as u64 * 24 * 60 * 60 * 1000);
        let old: Vec<String> = self
            .peers
            .iter()
            .filter(|p| p.last_seen < cutoff)
            .map(|p| p.id.clone())
            .collect();
        for id in &old {
            self.peers.remove(id);
        }
        if !old.is_empty() {
            self.persist();
        }
        old
    }

    pub fn remove(&self, peer_id: &str) -> bool {
        let removed = self.peers.remove(peer_id).is_some();
        if removed {
            self.persist();
        }
        removed
    }

    /// Set status connected and refresh last_seen.
    pub fn mark_connected(&self, peer_id: &str) {
        if let Some(mut p) = self.peers.get_mut(peer_id) {
            p.status = PeerStatus::Connected;
            p.last_seen = now_ms();
        }
        self.persist();
    }

    /// Set status disconnected. Deliberately leaves last_seen at the last
    /// successful observation so staleness checks measure real silence.
    pub fn mark_disconnected(&self, peer_id: &str) {
        if let Some(mut p) = self.peers.get_mut(peer_id) {
            p.status = PeerStatus::Disconnected;
        }
        self.persist();
    }

    /// Overwrite the cached nickname/avatar for a peer. Returns false for
    /// unknown ids.
    pub fn apply_profile(&self, peer_id: &str, nickname: &str, avatar: &str) -> bool {
        let known = match self.peers.get_mut(peer_id) {
            Some(mut p) => {
                p.nickname = nickname.to_string();
                p.avatar = avatar.to_string();
                p.last_seen = now_ms();
                true
            }
            None => false,
        };
        if known {
            self.persist();
        }
        known
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn get(&self, peer_id: &str) -> Option<PeerRecord> {
        self.peers.get(peer_id).map(|p| p.clone())
    }

    pub fn all(&self) -> Vec<PeerRecord> {
        self.peers.iter().map(|p| p.clone()).collect()
    }

    pub fn connected(&self) -> Vec<PeerRecord> {
        self.peers
            .iter()
            .filter(|p| p.is_connected())
            .map(|p| p.clone())
            .collect()
    }

    /// Records ordered by last_seen descending, capped at `limit`.
    pub fn recent(&self, limit: usize) -> Vec<PeerRecord> {
        let mut records = self.all();
        records.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        records.truncate(limit);
        records
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    // ── Persistence ───────────────────────────────────────────────────────────

    fn load(&self) {
        let Some(path) = &self.path else { return };
        if !path.exists() {
            return;
        }
        let records: Vec<PeerRecord> = match std::fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|text| serde_json::from_str(&text).map_err(anyhow::Error::from))
        {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to load peer set");
                return;
            }
        };

        // Dedup by (ip, port), newest last_seen wins.
        for record in records {
            let existing = self
                .peers
                .iter()
                .find(|p| p.ip == record.ip && p.port == record.port)
                .map(|p| (p.id.clone(), p.last_seen));
            match existing {
                Some((_, seen)) if seen >= record.last_seen => continue,
                Some((old_id, _)) => {
                    self.peers.remove(&old_id);
                }
                None => {}
            }
            self.peers.insert(record.id.clone(), record);
        }
        tracing::info!(count = self.peers.len(), "peer set loaded");
    }

    /// Write the full set out. Failure is logged, never propagated — the
    /// in-memory state is already updated.
    fn persist(&self) {
        let Some(path) = &self.path else { return };
        let records = self.all();
        let result = serde_json::to_string_pretty(&records)
            .map_err(anyhow::Error::from)
            .and_then(|text| std::fs::write(path, text).map_err(anyhow::Error::from));
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "failed to persist peer set");
        }
    }
}
