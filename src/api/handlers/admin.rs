use axum::extract::State;
use std::sync::Arc;

use crate::api::extract::{Json, Query};
use crate::api::routes::AppState;
use crate::api::{
    required, AdminLoginRequest, AdminLoginResponse, LimitQuery, MessageResponse,
    RecentUsersResponse, SuspendRequest, SystemHealth,
};
use crate::auth::{verify_password, AdminSession};
use crate::db::{clamp_limit, AdminMetrics};
use crate::error::AppError;

/// Users listed by `recent-users` when no limit is given.
const RECENT_USERS: i64 = 20;

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AdminLoginRequest>,
) -> Result<Json<AdminLoginResponse>, AppError> {
    let email = required(&request.email, "Email")?;
    let password = request
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("Password is required".into()))?;

    let admin = match state.db.find_active_admin(email).await? {
        Some(admin) if verify_password(password, &admin.password_hash) => admin,
        _ => return Err(AppError::Unauthorized("Invalid credentials".into())),
    };

    state.db.record_admin_login(admin.id).await?;
    let purged = state.db.purge_expired_sessions().await?;
    if purged > 0 {
        tracing::debug!("Purged {} expired admin sessions", purged);
    }

    let session = state
        .db
        .create_admin_session(admin.id, state.settings.admin_session_hours)
        .await?;
    tracing::info!("Admin {} logged in", admin.email);

    Ok(Json(AdminLoginResponse {
        success: true,
        token: session.token,
        expires_at: session.expires_at,
        admin,
    }))
}

pub async fn metrics(
    AdminSession(_admin): AdminSession,
    State(state): State<Arc<AppState>>,
) -> Result<Json<AdminMetrics>, AppError> {
    Ok(Json(state.db.admin_metrics().await?))
}

pub async fn recent_users(
    AdminSession(_admin): AdminSession,
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<RecentUsersResponse>, AppError> {
    let limit = clamp_limit(Some(query.limit.unwrap_or(RECENT_USERS)));
    let users = state.db.recent_users(limit).await?;
    Ok(Json(RecentUsersResponse { users }))
}

pub async fn system_health(
    AdminSession(_admin): AdminSession,
    State(state): State<Arc<AppState>>,
) -> Result<Json<SystemHealth>, AppError> {
    Ok(Json(SystemHealth {
        database_ok: state.db.ping().await,
        storage_bytes: state.audio.usage_bytes().await?,
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

pub async fn suspend_user(
    AdminSession(admin): AdminSession,
    State(state): State<Arc<AppState>>,
    Json(request): Json<SuspendRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let user_id = request
        .user_id
        .ok_or_else(|| AppError::BadRequest("User ID is required".into()))?;

    if !state.db.set_user_suspended(user_id, request.suspended).await? {
        return Err(AppError::NotFound("User not found".into()));
    }

    let message = if request.suspended {
        "User suspended"
    } else {
        "User reinstated"
    };
    tracing::info!("{} (user {}, by admin {})", message, user_id, admin.email);
    Ok(Json(MessageResponse::ok(message)))
}

#[cfg(test)]
mod tests {
    use crate::api::handlers::testing::{test_app, TestApp};
    use crate::auth::hash_password;
    use crate::db::ProfileFields;
    use axum::http::StatusCode;
    use serde_json::json;

    async fn admin_token(app: &TestApp) -> String {
        let hash = hash_password("s3cret").unwrap();
        app.state
            .db
            .create_admin("Root", "root@example.com", &hash, "admin")
            .await
            .unwrap();

        let (status, body) = app
            .json(
                "POST",
                "/api/admin/login",
                Some(json!({"email": "root@example.com", "password": "s3cret"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["admin"].get("password_hash").is_none());
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_login_rejects_bad_password() {
        let app = test_app().await;
        admin_token(&app).await;

        let (status, body) = app
            .json(
                "POST",
                "/api/admin/login",
                Some(json!({"email": "root@example.com", "password": "wrong"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");

        let (status, _) = app
            .json("POST", "/api/admin/login", Some(json!({"email": "root@example.com"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_endpoints_require_token() {
        let app = test_app().await;
        for uri in ["/api/admin/metrics", "/api/admin/recent-users", "/api/admin/system-health"] {
            let (status, _) = app.json("GET", uri, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);

            let (status, _) = app.json_with_token("GET", uri, None, Some("bogus")).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_metrics_and_recent_users() {
        let app = test_app().await;
        let token = admin_token(&app).await;
        for email in ["a@example.com", "b@example.com"] {
            app.state
                .db
                .create_user("U", email, None, &ProfileFields::default())
                .await
                .unwrap();
        }

        let (status, body) = app
            .json_with_token("GET", "/api/admin/metrics", None, Some(&token))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["usersCount"], 2);
        assert_eq!(body["newSignupsToday"], 2);
        assert_eq!(body["suspendedUsers"], 0);

        let (status, body) = app
            .json_with_token("GET", "/api/admin/recent-users?limit=1", None, Some(&token))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["users"].as_array().unwrap().len(), 1);

        let (status, body) = app
            .json_with_token("GET", "/api/admin/system-health", None, Some(&token))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["databaseOk"], true);
    }

    #[tokio::test]
    async fn test_suspend_blocks_login() {
        let app = test_app().await;
        let token = admin_token(&app).await;
        let (_, body) = app
            .json(
                "POST",
                "/api/auth/register",
                Some(json!({"name": "Ann", "email": "ann@example.com", "password": "pw"})),
            )
            .await;
        let user_id = body["user"]["id"].as_i64().unwrap();

        let (status, body) = app
            .json_with_token(
                "POST",
                "/api/admin/actions/suspend-user",
                Some(json!({"user_id": user_id})),
                Some(&token),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User suspended");

        let (status, _) = app
            .json(
                "POST",
                "/api/auth/login",
                Some(json!({"email": "ann@example.com", "password": "pw"})),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .json_with_token(
                "POST",
                "/api/admin/actions/suspend-user",
                Some(json!({"user_id": 9999})),
                Some(&token),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
