//! /receive-file, /download, /upload, /files/send handlers.

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use parley_core::{ChatMessage, FileDescriptor};
use parley_services::client::ReceiveFileRequest;
use serde::Deserialize;

use super::{api_error, map_node_error, ApiError, ApiState, OkResponse};

// ── /receive-file (POST) ──────────────────────────────────────────────────────

pub async fn handle_receive_file(
    State(state): State<ApiState>,
    Json(req): Json<ReceiveFileRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    if req.sender_id.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "missing sender id"));
    }
    if req.file_info.file_id.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "missing file id"));
    }

    state.node.record_incoming_file(&req.sender_id, req.file_info);
    Ok(Json(OkResponse { success: true }))
}

// ── /download/{file_id} (GET) ─────────────────────────────────────────────────

pub async fn handle_download(
    State(state): State<ApiState>,
    Path(file_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (path, original_name) = state.node.resolve_file(&file_id).map_err(map_node_error)?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    tracing::debug!(file_id = %file_id, name = %original_name, size = bytes.len(), "file served");
    let disposition = format!("attachment; filename=\"{}\"", original_name.replace('"', "_"));
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

// ── /upload (POST multipart) ──────────────────────────────────────────────────

pub async fn handle_upload(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> Result<Json<FileDescriptor>, ApiError> {
    let mut staged = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
        if data.is_empty() {
            return Err(api_error(StatusCode::BAD_REQUEST, "no file data"));
        }
        staged = Some(state.node.stage_bytes(&name, data).map_err(map_node_error)?);
        break;
    }

    let Some(staged) = staged else {
        return Err(api_error(StatusCode::BAD_REQUEST, "no file field"));
    };

    let own = state.node.profile().await;
    Ok(Json(FileDescriptor {
        download_url: format!(
            "http://{}:{}/download/{}",
            own.ip, own.port, staged.file_id
        ),
        file_id: staged.file_id,
        original_name: staged.original_name,
        size: staged.size,
        upload_time: staged.upload_time,
        sender_nickname: Some(own.nickname),
    }))
}

// ── /files/send (POST) ────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendFileBody {
    pub peer_id: String,
    pub path: String,
}

pub async fn handle_send_file(
    State(state): State<ApiState>,
    Json(body): Json<SendFileBody>,
) -> Result<Json<ChatMessage>, ApiError> {
    if body.peer_id.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "missing peer id"));
    }
    if body.path.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "missing path"));
    }

    state
        .node
        .send_file(&body.peer_id, std::path::Path::new(&body.path))
        .await
        .map(Json)
        .map_err(map_node_error)
}
