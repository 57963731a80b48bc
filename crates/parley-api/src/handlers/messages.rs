//! /history, /receive-message, /messages/send handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use parley_core::ChatMessage;
use parley_services::client::ReceiveMessageRequest;
use serde::Deserialize;

use super::{api_error, map_node_error, ApiError, ApiState, OkResponse};

// ── /history/{peer_id} (GET) ──────────────────────────────────────────────────

pub async fn handle_history(
    State(state): State<ApiState>,
    Path(peer_id): Path<String>,
) -> Json<Vec<ChatMessage>> {
    Json(state.node.history(&peer_id))
}

// ── /receive-message (POST) ───────────────────────────────────────────────────

pub async fn handle_receive_message(
    State(state): State<ApiState>,
    Json(req): Json<ReceiveMessageRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    if req.sender_id.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "missing sender id"));
    }

    state.node.record_incoming_message(&req.sender_id, req.message);
    Ok(Json(OkResponse { success: true }))
}

// ── /messages/send (POST) ─────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody {
    pub peer_id: String,
    pub content: String,
}

pub async fn handle_send_message(
    State(state): State<ApiState>,
    Json(body): Json<SendMessageBody>,
) -> Result<Json<ChatMessage>, ApiError> {
    if body.peer_id.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "missing peer id"));
    }
    if body.content.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "empty message"));
    }

    state
        .node
        .send_message(&body.peer_id, &body.content)
        .await
        .map(Json)
        .map_err(map_node_error)
}
