use axum::{
    http::{header, HeaderName, Method},
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use super::handlers;
use crate::db::Database;
use crate::rewrite::RewriteService;
use crate::speech::{AudioStore, SpeechService};

pub const HISTORY_ID_HEADER: &str = "x-history-id";
pub const DOWNLOAD_ID_HEADER: &str = "x-download-id";

/// Request-independent settings the handlers consult.
#[derive(Debug, Clone)]
pub struct Settings {
    pub default_user_email: String,
    pub admin_session_hours: i64,
    pub static_dir: PathBuf,
}

pub struct AppState {
    pub db: Database,
    pub rewriter: RewriteService,
    pub speech: SpeechService,
    pub audio: AudioStore,
    pub settings: Settings,
    pub started_at: Instant,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([
            header::CONTENT_DISPOSITION,
            HeaderName::from_static(HISTORY_ID_HEADER),
            HeaderName::from_static(DOWNLOAD_ID_HEADER),
        ]);

    let admin_routes = Router::new()
        .route("/login", post(handlers::admin::login))
        .route("/metrics", get(handlers::admin::metrics))
        .route("/recent-users", get(handlers::admin::recent_users))
        .route("/system-health", get(handlers::admin::system_health))
        .route("/actions/suspend-user", post(handlers::admin::suspend_user));

    let api_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/me", get(handlers::auth::me))
        .route("/tones", get(handlers::catalog::list_tones))
        .route("/voices", get(handlers::catalog::list_voices))
        .route("/rewrite", post(handlers::speech::rewrite))
        .route("/synthesize", post(handlers::speech::synthesize))
        .route("/audio/:history_id", get(handlers::speech::audio))
        .route("/story/analyze", post(handlers::story::analyze))
        .route("/story/segment-audio", post(handlers::story::segment_audio))
        .route("/story/merged", post(handlers::story::merged))
        .route("/story/audio/:filename", get(handlers::story::story_audio))
        .route("/users", post(handlers::users::create_user))
        .route(
            "/users/:email",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route("/users/:email/history", get(handlers::users::user_history))
        .route("/history", post(handlers::history::save_history))
        .route(
            "/history/:id",
            get(handlers::history::history_for_user).delete(handlers::history::delete_history),
        )
        .route(
            "/downloads/:id",
            get(handlers::downloads::downloads_for_user)
                .delete(handlers::downloads::delete_download),
        )
        .route(
            "/downloads/file/:download_id",
            get(handlers::downloads::download_file),
        )
        .nest("/admin", admin_routes)
        .fallback(handlers::api_not_found);

    let static_files =
        ServeDir::new(&state.settings.static_dir).append_index_html_on_directories(true);

    Router::new()
        .nest("/api", api_routes)
        .fallback_service(static_files)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
