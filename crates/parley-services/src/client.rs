//! Outbound HTTP client — the speaking half of the peer protocol.
//!
//! The wire envelopes live here because this module is the sole producer
//! of them; the directory service handlers reuse the same structs as the
//! parsing half, so both ends of the wire share one definition.

use std::time::Duration;

use parley_core::{ChatMessage, FileDescriptor, NodeError, UserProfile};
use serde::{Deserialize, Serialize};

// ── Wire envelopes ────────────────────────────────────────────────────────────

/// Body of `POST /connect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub user: UserProfile,
}

/// Reply to `POST /connect` — the remote instance introduces itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub success: bool,
    pub user: UserProfile,
}

/// Reply to `POST /ping`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub pong: bool,
    pub timestamp: u64,
}

/// Text payload inside a `receive-message` push. The receiver recomputes
/// the message id from these fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    pub sender_nickname: String,
    pub content: String,
    pub timestamp: u64,
}

/// Body of `POST /receive-message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveMessageRequest {
    pub sender_id: String,
    pub message: IncomingMessage,
}

/// Body of `POST /receive-file`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveFileRequest {
    pub sender_id: String,
    pub file_info: FileDescriptor,
}

/// Nickname/avatar pair pushed on profile changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInfo {
    pub nickname: String,
    pub avatar: String,
}

/// Body of `POST /user-info-update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    pub user_id: String,
    pub user_info: ProfileInfo,
}

// ── Client ────────────────────────────────────────────────────────────────────

/// Delivery budget for message and file pushes.
const PUSH_TIMEOUT: Duration = Duration::from_secs(10);
/// Budget for best-effort profile fan-out.
const PROFILE_TIMEOUT: Duration = Duration::from_secs(5);

/// Thin reqwest wrapper with per-request timeouts and cause-classified
/// errors. Cheap to clone; all peer-directed calls go through here.
#[derive(Clone, Default)]
pub struct PeerClient {
    http: reqwest::Client,
}

impl PeerClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// `POST /connect` handshake. Returns the remote profile.
    pub async fn connect(
        &self,
        ip: &str,
        port: u16,
        own: &UserProfile,
        timeout: Duration,
    ) -> Result<UserProfile, NodeError> {
        let addr = format!("{ip}:{port}");
        let resp = self
            .http
            .post(format!("http://{addr}/connect"))
            .timeout(timeout)
            .json(&ConnectRequest { user: own.clone() })
            .send()
            .await
            .map_err(|e| unreachable(&addr, e))?;

        if !resp.status().is_success() {
            return Err(NodeError::Protocol {
                addr,
                detail: format!("status {}", resp.status().as_u16()),
            });
        }

        let body: ConnectResponse = resp.json().await.map_err(|e| NodeError::Protocol {
            addr: addr.clone(),
            detail: format!("bad handshake body: {e}"),
        })?;
        if !body.success {
            return Err(NodeError::Protocol {
                addr,
                detail: "handshake refused".to_string(),
            });
        }
        Ok(body.user)
    }

    /// `POST /ping` liveness probe. Any failure counts as down.
    pub async fn ping(&self, ip: &str, port: u16, timeout: Duration) -> bool {
        match self
            .http
            .post(format!("http://{ip}:{port}/ping"))
            .timeout(timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// `GET /history/{own_id}` — pull what the peer has recorded of our
    /// conversation.
    pub async fn fetch_history(
        &self,
        ip: &str,
        port: u16,
        own_id: &str,
        timeout: Duration,
    ) -> Result<Vec<ChatMessage>, NodeError> {
        let addr = format!("{ip}:{port}");
        let resp = self
            .http
            .get(format!("http://{addr}/history/{own_id}"))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| unreachable(&addr, e))?;

        if !resp.status().is_success() {
            return Err(NodeError::Protocol {
                addr,
                detail: format!("status {}", resp.status().as_u16()),
            });
        }
        resp.json().await.map_err(|e| NodeError::Protocol {
            addr,
            detail: format!("bad history body: {e}"),
        })
    }

    /// `POST /receive-message` — deliver a text message.
    pub async fn push_message(
        &self,
        ip: &str,
        port: u16,
        req: &ReceiveMessageRequest,
    ) -> Result<(), NodeError> {
        self.post_ok(ip, port, "receive-message", req, PUSH_TIMEOUT)
            .await
    }

    /// `POST /receive-file` — deliver a file notification.
    pub async fn push_file(
        &self,
        ip: &str,
        port: u16,
        req: &ReceiveFileRequest,
    ) -> Result<(), NodeError> {
        self.post_ok(ip, port, "receive-file", req, PUSH_TIMEOUT)
            .await
    }

    /// `POST /user-info-update` — push a profile change.
    pub async fn push_profile(
        &self,
        ip: &str,
        port: u16,
        req: &ProfileUpdateRequest,
    ) -> Result<(), NodeError> {
        self.post_ok(ip, port, "user-info-update", req, PROFILE_TIMEOUT)
            .await
    }

    async fn post_ok<T: Serialize>(
        &self,
        ip: &str,
        port: u16,
        route: &str,
        body: &T,
        timeout: Duration,
    ) -> Result<(), NodeError> {
        let addr = format!("{ip}:{port}");
        let resp = self
            .http
            .post(format!("http://{addr}/{route}"))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| unreachable(&addr, e))?;

        if !resp.status().is_success() {
            return Err(NodeError::Protocol {
                addr,
                detail: format!("status {}", resp.status().as_u16()),
            });
        }
        Ok(())
    }
}

/// Map a transport failure to `Unreachable` with a human-readable cause.
fn unreachable(addr: &str, err: reqwest::Error) -> NodeError {
    let reason = if err.is_timeout() {
        "connection timed out".to_string()
    } else if err.is_connect() {
        "connection refused or host unreachable".to_string()
    } else {
        err.to_string()
    };
    NodeError::Unreachable {
        addr: addr.to_string(),
        reason,
    }
}
