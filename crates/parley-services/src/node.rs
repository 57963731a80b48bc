//! Node facade — everything a local caller can do, in one place.
//!
//! The daemon and the HTTP layer both talk to this type. It owns the
//! profile, wires the stores to the sync engine, and keeps the rule that
//! a record's sync loop lives and dies with its presence in the peer
//! store: whatever evicts or removes a record also stops its loop.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parley_core::config::ParleyConfig;
use parley_core::identity::{detect_local_ip, PROTOCOL_VERSION};
use parley_core::{now_ms, ChatMessage, FileDescriptor, NodeError, PeerRecord, UserProfile};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::client::{
    IncomingMessage, PeerClient, ProfileInfo, ProfileUpdateRequest, ReceiveFileRequest,
    ReceiveMessageRequest,
};
use crate::content_store::{ContentStore, StagedFile};
use crate::events::{EventBus, NodeEvent};
use crate::history::ChatHistory;
use crate::peer_store::PeerStore;
use crate::scanner::{self, ScanHit};
use crate::sync::SyncEngine;

/// Partial profile update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub nickname: Option<String>,
    pub avatar: Option<String>,
}

/// Snapshot answered on `/status`, also the scanner's protocol marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    pub port: u16,
    pub user: UserProfile,
    pub peers_count: usize,
    pub is_running: bool,
}

#[derive(Clone)]
pub struct Node {
    profile: Arc<RwLock<UserProfile>>,
    user_path: PathBuf,
    config: ParleyConfig,
    peers: PeerStore,
    history: ChatHistory,
    content: ContentStore,
    client: PeerClient,
    events: EventBus,
    sync: SyncEngine,
    running: Arc<AtomicBool>,
}

impl Node {
    /// Build a node from config: load or mint the identity, open the
    /// stores, wire the sync engine. Does not bind any socket.
    pub fn new(config: ParleyConfig) -> Result<Self, NodeError> {
        let data_dir = config.storage.data_dir.clone();
        let user_path = data_dir.join("user.json");

        let mut profile = UserProfile::load_or_create(&user_path)?;
        profile.port = config.network.port;
        profile.version = PROTOCOL_VERSION.to_string();
        if let Some(ip) = detect_local_ip() {
            profile.ip = ip;
        }
        profile.save(&user_path)?;
        tracing::info!(id = %profile.id, nickname = %profile.nickname, ip = %profile.ip, "identity ready");

        let peers = PeerStore::open(data_dir.join("peers.json"), &config.peers);
        let history = ChatHistory::new();
        let content = ContentStore::new(data_dir.join("uploads"))?;
        let client = PeerClient::new();
        let events = EventBus::default();
        let sync = SyncEngine::new(
            peers.clone(),
            history.clone(),
            client.clone(),
            events.clone(),
            config.sync.clone(),
            profile.id.clone(),
        );

        Ok(Self {
            profile: Arc::new(RwLock::new(profile)),
            user_path,
            config,
            peers,
            history,
            content,
            client,
            events,
            sync,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    // ── Identity ──────────────────────────────────────────────────────────────

    pub async fn profile(&self) -> UserProfile {
        self.profile.read().await.clone()
    }

    /// Apply a patch, persist it, then fan the change out to every
    /// connected peer. Persistence failure aborts before any fan-out;
    /// fan-out failures are logged per peer and never fail the call.
    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<UserProfile, NodeError> {
        let updated = {
            let mut profile = self.profile.write().await;
            if let Some(nickname) = patch.nickname {
                profile.nickname = nickname;
            }
            if let Some(avatar) = patch.avatar {
                profile.avatar = avatar;
            }
            profile.clone()
        };
        updated.save(&self.user_path)?;
        tracing::info!(nickname = %updated.nickname, "profile updated");

        self.push_profile_to_peers(&updated).await;
        Ok(updated)
    }

    /// Best-effort `POST /user-info-update` to every connected peer.
    /// Returns how many deliveries succeeded.
    pub async fn push_profile_to_peers(&self, profile: &UserProfile) -> usize {
        let req = ProfileUpdateRequest {
            user_id: profile.id.clone(),
            user_info: ProfileInfo {
                nickname: profile.nickname.clone(),
                avatar: profile.avatar.clone(),
            },
        };

        let mut delivered = 0;
        for peer in self.peers.connected() {
            match self.client.push_profile(&peer.ip, peer.port, &req).await {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::warn!(peer_id = %peer.id, error = %err, "profile push failed");
                    self.events.publish(NodeEvent::Error {
                        context: format!("profile push to {}", peer.id),
                        detail: err.to_string(),
                    });
                }
            }
        }
        delivered
    }

    /// Record where this node is actually reachable. Used after binding,
    /// when an OS-assigned port replaces the configured one.
    pub async fn advertise(&self, ip: &str, port: u16) {
        let updated = {
            let mut profile = self.profile.write().await;
            profile.ip = ip.to_string();
            profile.port = port;
            profile.clone()
        };
        if let Err(err) = updated.save(&self.user_path) {
            tracing::warn!(error = %err, "identity persist failed");
        }
    }

    /// Re-detect the LAN address; persist and report true when it moved.
    pub async fn refresh_local_ip(&self) -> bool {
        let Some(ip) = detect_local_ip() else {
            return false;
        };
        let changed = {
            let mut profile = self.profile.write().await;
            if profile.ip == ip {
                false
            } else {
                tracing::info!(old = %profile.ip, new = %ip, "local address changed");
                profile.ip = ip;
                true
            }
        };
        if changed {
            let snapshot = self.profile.read().await.clone();
            if let Err(err) = snapshot.save(&self.user_path) {
                tracing::warn!(error = %err, "identity persist failed");
            }
        }
        changed
    }

    // ── Outbound ──────────────────────────────────────────────────────────────

    /// Handshake with a remote instance and start tracking it.
    pub async fn connect_to_peer(&self, ip: &str, port: u16) -> Result<PeerRecord, NodeError> {
        if ip.parse::<Ipv4Addr>().is_err() || port == 0 {
            return Err(NodeError::InvalidAddress(format!("{ip}:{port}")));
        }

        let own = self.profile().await;
        let timeout = Duration::from_millis(self.config.network.connect_timeout_ms);
        let remote = self.client.connect(ip, port, &own, timeout).await?;

        // The dialed address wins over whatever the remote claims.
        let upserted = self.peers.upsert(PeerRecord::from_profile(&remote, ip, port));
        for evicted in &upserted.evicted {
            self.sync.stop(evicted);
        }

        tracing::info!(peer_id = %upserted.record.id, addr = %upserted.record.addr(), "peer connected");
        self.events
            .publish(NodeEvent::PeerConnected(upserted.record.clone()));
        self.sync.start(&upserted.record.id);
        Ok(upserted.record)
    }

    /// Sweep the /24 around `base` (own address when absent).
    pub async fn scan_network(&self, base: Option<String>) -> Result<Vec<ScanHit>, NodeError> {
        let base = match base {
            Some(base) => base,
            None => {
                let ip = self.profile.read().await.ip.clone();
                if ip.is_empty() {
                    return Err(NodeError::InvalidAddress(
                        "local address unknown".to_string(),
                    ));
                }
                ip
            }
        };
        scanner::scan(&base, self.config.network.port, &self.config.scan).await
    }

    /// Send a text message: record locally first, then deliver. The local
    /// record survives a failed delivery.
    pub async fn send_message(
        &self,
        peer_id: &str,
        content: &str,
    ) -> Result<ChatMessage, NodeError> {
        let peer = self
            .peers
            .get(peer_id)
            .ok_or_else(|| NodeError::PeerNotFound(peer_id.to_string()))?;
        let own = self.profile().await;
        let timestamp = now_ms();
        let message = ChatMessage::text(&own.id, &own.nickname, content, timestamp);
        self.history.append(peer_id, message.clone());

        let req = ReceiveMessageRequest {
            sender_id: own.id,
            message: IncomingMessage {
                sender_nickname: own.nickname,
                content: content.to_string(),
                timestamp,
            },
        };
        self.client.push_message(&peer.ip, peer.port, &req).await?;
        Ok(message)
    }

    /// Stage a local file and announce it to the peer. The staged copy
    /// survives a failed delivery.
    pub async fn send_file(&self, peer_id: &str, path: &Path) -> Result<ChatMessage, NodeError> {
        let peer = self
            .peers
            .get(peer_id)
            .ok_or_else(|| NodeError::PeerNotFound(peer_id.to_string()))?;
        let own = self.profile().await;
        let staged = self.content.stage(path)?;

        let file_info = FileDescriptor {
            file_id: staged.file_id.clone(),
            original_name: staged.original_name.clone(),
            size: staged.size,
            upload_time: staged.upload_time,
            download_url: format!(
                "http://{}:{}/download/{}",
                own.ip, own.port, staged.file_id
            ),
            sender_nickname: Some(own.nickname.clone()),
        };
        let message =
            ChatMessage::file(&own.id, &own.nickname, file_info.clone(), staged.upload_time);
        self.history.append(peer_id, message.clone());

        let req = ReceiveFileRequest {
            sender_id: own.id,
            file_info,
        };
        self.client.push_file(&peer.ip, peer.port, &req).await?;
        Ok(message)
    }

    // ── Inbound (Directory Service) ───────────────────────────────────────────

    /// Register a caller that introduced itself on `/connect`. The remote
    /// announces its own listen address; we take it at its word since the
    /// socket's source port says nothing about its server.
    pub async fn handle_connect(&self, remote: UserProfile) -> UserProfile {
        let addr = remote.ip.clone();
        let upserted = self
            .peers
            .upsert(PeerRecord::from_profile(&remote, &addr, remote.port));
        for evicted in &upserted.evicted {
            self.sync.stop(evicted);
        }
        tracing::info!(peer_id = %upserted.record.id, addr = %upserted.record.addr(), "inbound handshake");
        self.events
            .publish(NodeEvent::PeerConnected(upserted.record));
        self.profile().await
    }

    /// Store a pushed text message. The id is recomputed from the wire
    /// fields, so redelivery and a later history pull both dedup exactly.
    pub fn record_incoming_message(&self, sender_id: &str, incoming: IncomingMessage) -> ChatMessage {
        let message = ChatMessage::text(
            sender_id,
            &incoming.sender_nickname,
            &incoming.content,
            incoming.timestamp,
        );
        if self.history.append(sender_id, message.clone()) {
            self.events.publish(NodeEvent::MessageReceived {
                peer_id: sender_id.to_string(),
                message: message.clone(),
            });
        }
        message
    }

    /// Store a pushed file announcement.
    pub fn record_incoming_file(&self, sender_id: &str, file_info: FileDescriptor) -> ChatMessage {
        let nickname = file_info
            .sender_nickname
            .clone()
            .or_else(|| self.peers.get(sender_id).map(|p| p.nickname))
            .unwrap_or_else(|| sender_id.to_string());
        let timestamp = file_info.upload_time;
        let message = ChatMessage::file(sender_id, &nickname, file_info, timestamp);
        if self.history.append(sender_id, message.clone()) {
            self.events.publish(NodeEvent::FileReceived {
                peer_id: sender_id.to_string(),
                message: message.clone(),
            });
        }
        message
    }

    /// Overwrite a peer's cached nickname/avatar. Quiet for unknown ids.
    pub fn apply_peer_profile(&self, peer_id: &str, nickname: &str, avatar: &str) {
        if self.peers.apply_profile(peer_id, nickname, avatar) {
            self.events.publish(NodeEvent::PeerInfoUpdated {
                peer_id: peer_id.to_string(),
            });
        }
    }

    // ── Peer set ──────────────────────────────────────────────────────────────

    pub fn all_peers(&self) -> Vec<PeerRecord> {
        self.peers.all()
    }

    pub fn connected_peers(&self) -> Vec<PeerRecord> {
        self.peers.connected()
    }

    pub fn recent_peers(&self, limit: usize) -> Vec<PeerRecord> {
        self.peers.recent(limit)
    }

    pub fn sweep_stale(&self) -> Vec<String> {
        let removed = self.peers.sweep_stale();
        for id in &removed {
            self.sync.stop(id);
        }
        removed
    }

    pub fn force_reset(&self) -> Vec<String> {
        let removed = self.peers.force_reset();
        for id in &removed {
            self.sync.stop(id);
        }
        removed
    }

    pub fn retire_peers(&self, days: u32) -> Vec<String> {
        let removed = self.peers.retire(days);
        for id in &removed {
            self.sync.stop(id);
        }
        removed
    }

    // ── History and files ─────────────────────────────────────────────────────

    pub fn history(&self, peer_id: &str) -> Vec<ChatMessage> {
        self.history.get(peer_id)
    }

    pub fn stage_bytes(&self, name: &str, bytes: Bytes) -> Result<StagedFile, NodeError> {
        self.content.stage_bytes(name, bytes)
    }

    pub fn resolve_file(&self, file_id: &str) -> Result<(PathBuf, String), NodeError> {
        self.content.resolve(file_id)
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    pub async fn status(&self) -> NodeStatus {
        NodeStatus {
            port: self.profile.read().await.port,
            user: self.profile().await,
            peers_count: self.peers.len(),
            is_running: self.running.load(Ordering::Relaxed),
        }
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Relaxed);
    }

    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    pub fn shutdown(&self) {
        self.sync.stop_all();
        self.set_running(false);
    }
}
