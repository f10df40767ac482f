use axum::extract::State;
use std::sync::Arc;

use crate::api::extract::{Json, Path, Query};
use crate::api::routes::AppState;
use crate::api::{
    lowercase_or, required, DeleteHistoryRequest, HistoryListResponse, HistoryRequest,
    HistorySaved, LimitQuery, MessageResponse,
};
use crate::db::{clamp_limit, NewHistory};
use crate::error::AppError;

pub async fn save_history(
    State(state): State<Arc<AppState>>,
    Json(request): Json<HistoryRequest>,
) -> Result<Json<HistorySaved>, AppError> {
    let user_id = request
        .user_id
        .ok_or_else(|| AppError::BadRequest("User ID is required".into()))?;
    let original_text = required(&request.original_text, "Original text")?;

    if state.db.get_user(user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".into()));
    }

    let history_id = state
        .db
        .save_history(&NewHistory {
            user_id,
            original_text,
            rewritten_text: request.rewritten_text.as_deref().unwrap_or(""),
            tone: &lowercase_or(&request.tone, "neutral"),
            voice: &lowercase_or(&request.voice, "david"),
        })
        .await?;

    Ok(Json(HistorySaved {
        success: true,
        history_id,
        message: "History saved successfully".to_string(),
    }))
}

pub async fn history_for_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<HistoryListResponse>, AppError> {
    let history = state
        .db
        .list_history(user_id, clamp_limit(query.limit))
        .await?;

    Ok(Json(HistoryListResponse {
        success: true,
        total: history.len(),
        history,
    }))
}

pub async fn delete_history(
    State(state): State<Arc<AppState>>,
    Path(history_id): Path<i64>,
    Json(request): Json<DeleteHistoryRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = required(&request.user_email, "User email")?;
    let user = state
        .db
        .get_user_by_email(email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let entry = state
        .db
        .delete_history(user.id, history_id)
        .await?
        .ok_or_else(|| AppError::NotFound("History item not found".into()))?;

    if let Some(path) = &entry.audio_file_path {
        state.audio.remove(path).await;
    }

    Ok(Json(MessageResponse::ok("History item deleted successfully")))
}
