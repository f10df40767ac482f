use axum::{
    extract::State,
    http::StatusCode,
};
use std::sync::Arc;

use super::name_from_email;
use crate::api::extract::{Json, Path, Query};
use crate::api::routes::AppState;
use crate::api::{
    required, HistoryListResponse, LimitQuery, MessageResponse, UserPayload, UserProfile,
    UserProfileResponse,
};
use crate::db::{clamp_limit, User};
use crate::error::AppError;

async fn load_profile(state: &AppState, user: User) -> Result<UserProfile, AppError> {
    let lists = state.db.profile_lists(user.id).await?;
    Ok(UserProfile { user, lists })
}

async fn find_user(state: &AppState, email: &str) -> Result<User, AppError> {
    state
        .db
        .get_user_by_email(email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

async fn apply_lists(state: &AppState, user_id: i64, payload: &UserPayload) -> Result<(), AppError> {
    state
        .db
        .apply_profile_lists(
            user_id,
            payload.skills.as_deref(),
            payload.interests.as_deref(),
            payload.achievements.as_deref(),
            payload.projects.as_deref(),
        )
        .await
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UserPayload>,
) -> Result<(StatusCode, Json<UserProfileResponse>), AppError> {
    let email = required(&payload.email, "Email")?;
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from)
        .unwrap_or_else(|| name_from_email(email));

    let id = state
        .db
        .create_user(&name, email, None, &payload.profile)
        .await?;
    apply_lists(&state, id, &payload).await?;

    let user = find_user(&state, email).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserProfileResponse {
            success: true,
            user_id: Some(id),
            user: load_profile(&state, user).await?,
        }),
    ))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<UserProfileResponse>, AppError> {
    let user = find_user(&state, &email).await?;
    Ok(Json(UserProfileResponse {
        success: true,
        user_id: None,
        user: load_profile(&state, user).await?,
    }))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
    Json(payload): Json<UserPayload>,
) -> Result<Json<UserProfileResponse>, AppError> {
    let user = find_user(&state, &email).await?;

    let name = payload.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    state.db.update_user(user.id, name, &payload.profile).await?;
    apply_lists(&state, user.id, &payload).await?;

    let updated = find_user(&state, &email).await?;
    Ok(Json(UserProfileResponse {
        success: true,
        user_id: None,
        user: load_profile(&state, updated).await?,
    }))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let user = find_user(&state, &email).await?;
    let paths = state.db.user_audio_paths(user.id).await?;

    state.db.delete_user(user.id).await?;
    for path in &paths {
        state.audio.remove(path).await;
    }

    tracing::info!("Deleted user {} and {} audio files", user.id, paths.len());
    Ok(Json(MessageResponse::ok("User deleted successfully")))
}

pub async fn user_history(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<HistoryListResponse>, AppError> {
    let user = find_user(&state, &email).await?;
    let history = state
        .db
        .list_history(user.id, clamp_limit(query.limit))
        .await?;

    Ok(Json(HistoryListResponse {
        success: true,
        total: history.len(),
        history,
    }))
}
