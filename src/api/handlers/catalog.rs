use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::routes::AppState;
use crate::api::{TonesResponse, VoicesResponse};
use crate::error::AppError;

pub async fn list_tones(State(state): State<Arc<AppState>>) -> Result<Json<TonesResponse>, AppError> {
    let tones = state.db.active_tones().await?;
    Ok(Json(TonesResponse {
        tones: tones.into_iter().map(Into::into).collect(),
    }))
}

pub async fn list_voices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<VoicesResponse>, AppError> {
    let voices = state.db.listed_voices().await?;
    Ok(Json(VoicesResponse {
        voices: voices.into_iter().map(Into::into).collect(),
    }))
}
