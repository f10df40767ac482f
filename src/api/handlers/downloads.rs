use axum::{
    extract::State,
    response::Response,
};
use std::sync::Arc;

use super::{audio_response, Disposition};
use crate::api::extract::{Json, Path, Query};
use crate::api::routes::AppState;
use crate::api::{
    DeleteDownloadRequest, DownloadFileQuery, DownloadsResponse, LimitQuery, MessageResponse,
};
use crate::db::clamp_limit;
use crate::error::AppError;

pub async fn downloads_for_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<DownloadsResponse>, AppError> {
    let downloads = state
        .db
        .list_downloads(user_id, clamp_limit(query.limit))
        .await?;

    Ok(Json(DownloadsResponse {
        success: true,
        total: downloads.len(),
        downloads,
    }))
}

pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(download_id): Path<i64>,
    Query(query): Query<DownloadFileQuery>,
) -> Result<Response, AppError> {
    let user_id = query
        .user_id
        .ok_or_else(|| AppError::BadRequest("User ID is required".into()))?;

    let download = state
        .db
        .get_download(download_id, Some(user_id))
        .await?
        .ok_or_else(|| AppError::NotFound("Download not found".into()))?;

    let bytes = state.audio.read(&download.file_path).await?;
    state.db.record_download(download.id).await?;

    audio_response(
        bytes,
        download.mime_type.as_deref().unwrap_or("audio/wav"),
        &download.original_filename,
        Disposition::Attachment,
    )
}

pub async fn delete_download(
    State(state): State<Arc<AppState>>,
    Path(download_id): Path<i64>,
    Json(request): Json<DeleteDownloadRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let user_id = request
        .user_id
        .ok_or_else(|| AppError::BadRequest("User ID is required".into()))?;

    let download = state
        .db
        .delete_download(download_id, Some(user_id))
        .await?
        .ok_or_else(|| AppError::NotFound("Download not found".into()))?;

    state.audio.remove(&download.file_path).await;
    Ok(Json(MessageResponse::ok("Download deleted successfully")))
}
