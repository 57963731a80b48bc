//! HTTP handlers — the peer protocol plus the local control surface.

pub mod control;
pub mod directory;
pub mod files;
pub mod messages;

use axum::http::StatusCode;
use axum::Json;
use parley_core::NodeError;
use parley_services::Node;
use serde::Serialize;

#[derive(Clone)]
pub struct ApiState {
    pub node: Node,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Structured error body every failing endpoint answers with.
#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

/// Map a typed core error to its HTTP status by cause.
fn map_node_error(err: NodeError) -> ApiError {
    let status = match &err {
        NodeError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
        NodeError::PeerNotFound(_) | NodeError::FileNotFound(_) => StatusCode::NOT_FOUND,
        NodeError::Unreachable { .. } | NodeError::Protocol { .. } => StatusCode::BAD_GATEWAY,
        NodeError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, err.to_string())
}

/// Answer for endpoints with nothing better to report.
#[derive(Serialize)]
pub struct OkResponse {
    pub success: bool,
}

// Re-export handler functions for use in router setup.
pub use control::{
    handle_peer_connect, handle_peers, handle_peers_reset, handle_peers_sweep, handle_scan,
    handle_sync_profile,
};
pub use directory::{
    handle_connect, handle_get_user, handle_peers_cleanup, handle_ping, handle_recent_peers,
    handle_status, handle_update_user, handle_user_info_update,
};
pub use files::{handle_download, handle_receive_file, handle_send_file, handle_upload};
pub use messages::{handle_history, handle_receive_message, handle_send_message};
