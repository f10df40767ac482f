use axum::{
    extract::State,
    http::StatusCode,
};
use std::sync::Arc;

use crate::api::extract::{Json, Query};
use crate::api::routes::AppState;
use crate::api::{required, AuthResponse, LoginRequest, MeQuery, RegisterRequest, UserResponse};
use crate::auth::{hash_password, verify_password};
use crate::error::AppError;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let name = required(&request.name, "name")?;
    let email = required(&request.email, "email")?;
    // Passwords are kept verbatim, surrounding whitespace included
    let password = request
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("password is required".into()))?;

    let hash = hash_password(password)?;
    let id = state
        .db
        .create_user(name, email, Some(&hash), &request.profile)
        .await?;

    let user = state
        .db
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("User {} vanished after insert", id)))?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".to_string(),
            user,
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let (Some(email), Some(password)) = (request.email.as_deref(), request.password.as_deref())
    else {
        return Err(AppError::BadRequest("Email and password are required".into()));
    };

    let user = state
        .db
        .get_user_by_email(email.trim())
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.into()))?;

    let hash = user.password_hash.as_deref().unwrap_or("");
    if !verify_password(password, hash) {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    if user.is_suspended {
        return Err(AppError::Forbidden("Account is suspended".into()));
    }

    state.db.record_user_login(user.id).await?;
    tracing::info!("User {} logged in", user.id);

    let user = state.db.get_user(user.id).await?.unwrap_or(user);
    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        user,
    }))
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MeQuery>,
) -> Result<Json<UserResponse>, AppError> {
    let user_id = query
        .user_id
        .ok_or_else(|| AppError::BadRequest("User ID is required".into()))?;

    let user = state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(Json(UserResponse { user }))
}
