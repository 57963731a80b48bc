//! Local control handlers — the surface `parley-ctl` drives. These never
//! face other peers; they stand in for the original's in-process shell.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use parley_core::PeerRecord;
use parley_services::ScanHit;
use serde::{Deserialize, Serialize};

use super::{api_error, map_node_error, ApiError, ApiState};

// ── /peers (GET) ──────────────────────────────────────────────────────────────

pub async fn handle_peers(State(state): State<ApiState>) -> Json<Vec<PeerRecord>> {
    Json(state.node.all_peers())
}

// ── /peers/connect (POST) ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct PeerConnectBody {
    pub ip: String,
    pub port: u16,
}

pub async fn handle_peer_connect(
    State(state): State<ApiState>,
    Json(body): Json<PeerConnectBody>,
) -> Result<Json<PeerRecord>, ApiError> {
    if body.ip.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "missing ip"));
    }

    state
        .node
        .connect_to_peer(&body.ip, body.port)
        .await
        .map(Json)
        .map_err(map_node_error)
}

// ── /peers/sweep, /peers/reset (POST) ─────────────────────────────────────────

#[derive(Serialize)]
pub struct RemovedResponse {
    pub removed: Vec<String>,
}

pub async fn handle_peers_sweep(State(state): State<ApiState>) -> Json<RemovedResponse> {
    Json(RemovedResponse {
        removed: state.node.sweep_stale(),
    })
}

pub async fn handle_peers_reset(State(state): State<ApiState>) -> Json<RemovedResponse> {
    Json(RemovedResponse {
        removed: state.node.force_reset(),
    })
}

// ── /scan (POST) ──────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub struct ScanBody {
    #[serde(default)]
    pub base: Option<String>,
}

pub async fn handle_scan(
    State(state): State<ApiState>,
    Json(body): Json<ScanBody>,
) -> Result<Json<Vec<ScanHit>>, ApiError> {
    state
        .node
        .scan_network(body.base)
        .await
        .map(Json)
        .map_err(map_node_error)
}

// ── /sync-profile (POST) ──────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct SyncProfileResponse {
    pub delivered: usize,
}

pub async fn handle_sync_profile(State(state): State<ApiState>) -> Json<SyncProfileResponse> {
    let profile = state.node.profile().await;
    let delivered = state.node.push_profile_to_peers(&profile).await;
    Json(SyncProfileResponse { delivered })
}
