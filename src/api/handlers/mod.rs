pub mod admin;
pub mod auth;
pub mod catalog;
pub mod downloads;
pub mod health;
pub mod history;
pub mod speech;
pub mod story;
pub mod users;

use axum::{
    http::{header, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
};

use crate::error::AppError;

/// How a served audio file should be presented by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

/// Audio bytes with content type and disposition headers.
pub fn audio_response(
    bytes: Vec<u8>,
    mime_type: &str,
    filename: &str,
    disposition: Disposition,
) -> Result<Response, AppError> {
    let kind = match disposition {
        Disposition::Inline => "inline",
        Disposition::Attachment => "attachment",
    };
    let disposition = HeaderValue::from_str(&format!("{}; filename=\"{}\"", kind, filename))
        .map_err(|e| AppError::Internal(format!("Invalid download name: {}", e)))?;
    let content_type = HeaderValue::from_str(mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Unknown paths under `/api` answer with the usual JSON error body.
pub async fn api_not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No endpoint at {}", uri.path()))
}

/// Display name derived from the local part of an email: `jane.doe@x` becomes `Jane.doe`.
pub fn name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or(email);
    let mut chars = local.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "User".to_string(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::time::Instant;

    use axum::{
        body::Body,
        http::{HeaderMap, Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::api::routes::{create_router, AppState, Settings};
    use crate::db::Database;
    use crate::rewrite::RewriteService;
    use crate::speech::{AudioStore, PlaceholderSpeech, SpeechService};

    pub struct TestApp {
        pub router: Router,
        pub state: Arc<AppState>,
        _audio_dir: tempfile::TempDir,
    }

    /// Router over an in-memory database, no rewrite providers and placeholder speech.
    pub async fn test_app() -> TestApp {
        test_app_with_speech(SpeechService::new(vec![Box::new(PlaceholderSpeech)])).await
    }

    pub async fn test_app_with_speech(speech: SpeechService) -> TestApp {
        let audio_dir = tempfile::tempdir().unwrap();
        let state = Arc::new(AppState {
            db: Database::in_memory().await.unwrap(),
            rewriter: RewriteService::new(Vec::new()),
            speech,
            audio: AudioStore::new(audio_dir.path()),
            settings: Settings {
                default_user_email: "guest@tonecast.local".into(),
                admin_session_hours: 24,
                static_dir: audio_dir.path().join("static"),
            },
            started_at: Instant::now(),
        });

        TestApp {
            router: create_router(Arc::clone(&state)),
            state,
            _audio_dir: audio_dir,
        }
    }

    impl TestApp {
        pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
            (status, headers, body)
        }

        pub async fn json(
            &self,
            method: &str,
            uri: &str,
            body: Option<serde_json::Value>,
        ) -> (StatusCode, serde_json::Value) {
            self.json_with_token(method, uri, body, None).await
        }

        pub async fn json_with_token(
            &self,
            method: &str,
            uri: &str,
            body: Option<serde_json::Value>,
            token: Option<&str>,
        ) -> (StatusCode, serde_json::Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header("authorization", format!("Bearer {}", token));
            }
            let request = match body {
                Some(body) => builder
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let (status, _, bytes) = self.send(request).await;
            let value = if bytes.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
            };
            (status, value)
        }
    }
}
