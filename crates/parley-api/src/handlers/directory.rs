//! /connect, /ping, /status, /user, /user-info-update, /recent-peers,
//! /peers/cleanup handlers — the directory side of the peer protocol.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use parley_core::{now_ms, PeerRecord, UserProfile};
use parley_services::client::{ConnectRequest, ConnectResponse, PingResponse, ProfileUpdateRequest};
use parley_services::{NodeStatus, ProfilePatch};
use serde::{Deserialize, Serialize};

use super::{api_error, map_node_error, ApiError, ApiState, OkResponse};

// ── /connect ──────────────────────────────────────────────────────────────────

pub async fn handle_connect(
    State(state): State<ApiState>,
    Json(req): Json<ConnectRequest>,
) -> Result<Json<ConnectResponse>, ApiError> {
    if req.user.id.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "missing user id"));
    }

    let own = state.node.handle_connect(req.user).await;
    Ok(Json(ConnectResponse {
        success: true,
        user: own,
    }))
}

// ── /ping ─────────────────────────────────────────────────────────────────────

pub async fn handle_ping() -> Json<PingResponse> {
    Json(PingResponse {
        pong: true,
        timestamp: now_ms(),
    })
}

// ── /status ───────────────────────────────────────────────────────────────────

pub async fn handle_status(State(state): State<ApiState>) -> Json<NodeStatus> {
    Json(state.node.status().await)
}

// ── /user ─────────────────────────────────────────────────────────────────────

pub async fn handle_get_user(State(state): State<ApiState>) -> Json<UserProfile> {
    Json(state.node.profile().await)
}

pub async fn handle_update_user(
    State(state): State<ApiState>,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<UserProfile>, ApiError> {
    state
        .node
        .update_profile(patch)
        .await
        .map(Json)
        .map_err(map_node_error)
}

// ── /user-info-update ─────────────────────────────────────────────────────────

pub async fn handle_user_info_update(
    State(state): State<ApiState>,
    Json(req): Json<ProfileUpdateRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    if req.user_id.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "missing user id"));
    }

    state
        .node
        .apply_peer_profile(&req.user_id, &req.user_info.nickname, &req.user_info.avatar);
    Ok(Json(OkResponse { success: true }))
}

// ── /recent-peers ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

pub async fn handle_recent_peers(
    State(state): State<ApiState>,
    Query(query): Query<RecentQuery>,
) -> Json<Vec<PeerRecord>> {
    Json(state.node.recent_peers(query.limit.unwrap_or(10)))
}

// ── /peers/cleanup ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CleanupQuery {
    pub days: Option<u32>,
}

#[derive(Serialize)]
pub struct CleanupResponse {
    pub removed: usize,
}

pub async fn handle_peers_cleanup(
    State(state): State<ApiState>,
    Query(query): Query<CleanupQuery>,
) -> Json<CleanupResponse> {
    let removed = state.node.retire_peers(query.days.unwrap_or(30));
    Json(CleanupResponse {
        removed: removed.len(),
    })
}
