use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::routes::AppState;
use crate::api::{HealthResponse, ProvidersStatus};

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = state.db.ping().await;
    if !database {
        tracing::error!("Health check could not reach the database");
    }

    Json(HealthResponse {
        status: if database { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Local::now().to_rfc3339(),
        database,
        providers: ProvidersStatus {
            rewrite: state.rewriter.provider_names(),
            speech: state.speech.provider_names(),
        },
    })
}
