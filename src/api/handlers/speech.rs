use axum::{
    extract::State,
    http::HeaderValue,
    response::Response,
};
use std::sync::Arc;

use super::{audio_response, name_from_email, Disposition};
use crate::api::extract::{Json, Path};
use crate::api::routes::{AppState, DOWNLOAD_ID_HEADER, HISTORY_ID_HEADER};
use crate::api::{lowercase_or, validate_text, RewriteRequest, RewriteResponse, SynthesizeRequest};
use crate::db::{NewDownload, NewHistory, ProcessingStatus};
use crate::error::AppError;
use crate::speech::store::StoredAudio;
use crate::speech::{mime_for_path, SpeechAudio, SpeechRequest};

const DEFAULT_TONE: &str = "neutral";
const DEFAULT_REWRITE_VOICE: &str = "allison";
const DEFAULT_SPEECH_VOICE: &str = "david";

pub async fn rewrite(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RewriteRequest>,
) -> Result<Json<RewriteResponse>, AppError> {
    let text = validate_text(&request.text)?;
    let tone_id = lowercase_or(&request.tone, DEFAULT_TONE);
    let voice = lowercase_or(&request.voice, DEFAULT_REWRITE_VOICE);

    let Some(tone) = state.db.get_tone(&tone_id).await? else {
        let available: Vec<String> = state
            .db
            .active_tones()
            .await?
            .into_iter()
            .map(|t| t.tone_id)
            .collect();
        return Err(AppError::BadRequest(format!(
            "Invalid tone. Available tones: {}",
            available.join(", ")
        )));
    };

    let email = request
        .user_email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(&state.settings.default_user_email);
    let user = state
        .db
        .get_or_create_user(email, &name_from_email(email))
        .await?;

    tracing::info!("Rewriting text for user {} with tone {}", user.id, tone.tone_id);
    let outcome = state
        .rewriter
        .rewrite(text, &tone.tone_id, &tone.prompt_template)
        .await;

    let history_id = state
        .db
        .save_history(&NewHistory {
            user_id: user.id,
            original_text: text,
            rewritten_text: &outcome.text,
            tone: &tone.tone_id,
            voice: &voice,
        })
        .await?;

    Ok(Json(RewriteResponse {
        success: true,
        original_text: text.to_string(),
        rewritten_text: outcome.text,
        tone: tone.tone_id,
        provider: outcome.provider,
        history_id,
        timestamp: chrono::Local::now().to_rfc3339(),
    }))
}

pub async fn synthesize(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SynthesizeRequest>,
) -> Result<Response, AppError> {
    let text = validate_text(&request.text)?;
    let voice_id = lowercase_or(&request.voice, DEFAULT_SPEECH_VOICE);
    let tone = lowercase_or(&request.tone, DEFAULT_TONE);

    let voice = state
        .db
        .get_voice(&voice_id)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("Invalid voice '{}'", voice_id)))?;

    let user_id = request
        .user_id
        .ok_or_else(|| AppError::BadRequest("User ID is required".into()))?;
    let user = state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let history_id = match request.history_id {
        Some(id) => {
            let entry = state.db.get_history(id).await?;
            match entry {
                Some(entry) if entry.user_id == user.id => id,
                _ => return Err(AppError::NotFound("History entry not found".into())),
            }
        }
        None => {
            state
                .db
                .save_history(&NewHistory {
                    user_id: user.id,
                    original_text: text,
                    rewritten_text: text,
                    tone: &tone,
                    voice: &voice.voice_id,
                })
                .await?
        }
    };

    state
        .db
        .set_history_status(history_id, ProcessingStatus::Processing, None)
        .await?;

    let speech_request = SpeechRequest {
        text,
        voice: &voice.voice_id,
        provider_voice: &voice.provider_voice_id,
    };

    let recorded = synthesize_for_history(&state, user.id, history_id, &speech_request, |stored| {
        format!("audiobook_{}", stored.timestamp)
    })
    .await?;

    tracing::info!(
        "Synthesized history {} with {} into {}",
        history_id,
        recorded.audio.provider,
        recorded.stored.filename
    );

    let extension = recorded.audio.extension();
    let filename = format!(
        "tonecast_{}_{}.{}",
        speech_request.voice, recorded.stored.timestamp, extension
    );
    let mut response = audio_response(
        recorded.audio.bytes,
        &recorded.audio.mime_type,
        &filename,
        Disposition::Attachment,
    )?;
    let headers = response.headers_mut();
    headers.insert(HISTORY_ID_HEADER, HeaderValue::from(history_id));
    headers.insert(DOWNLOAD_ID_HEADER, HeaderValue::from(recorded.download_id));
    Ok(response)
}

/// Audio synthesized for a history entry, kept on disk and registered as a download.
pub(super) struct RecordedAudio {
    pub audio: SpeechAudio,
    pub stored: StoredAudio,
    pub download_id: i64,
}

/// Synthesize audio for a history entry in `processing`. The entry ends up
/// completed, or failed with no file left behind. `download_stem` names the
/// download offered to the user, without extension.
pub(super) async fn synthesize_for_history(
    state: &AppState,
    user_id: i64,
    history_id: i64,
    request: &SpeechRequest<'_>,
    download_stem: impl FnOnce(&StoredAudio) -> String,
) -> Result<RecordedAudio, AppError> {
    let audio = match state.speech.synthesize(request).await {
        Ok(audio) => audio,
        Err(e) => {
            mark_failed(state, history_id).await;
            return Err(e);
        }
    };

    let extension = audio.extension();
    let stored = match state
        .audio
        .save(user_id, request.voice, extension, &audio.bytes)
        .await
    {
        Ok(stored) => stored,
        Err(e) => {
            mark_failed(state, history_id).await;
            return Err(e);
        }
    };

    let original_filename = format!("{}.{}", download_stem(&stored), extension);
    let download_id = keep_audio(
        state,
        user_id,
        history_id,
        &stored,
        &audio.mime_type,
        &original_filename,
    )
    .await?;

    Ok(RecordedAudio {
        audio,
        stored,
        download_id,
    })
}

/// Complete the history entry with `stored` and register the download. On
/// failure the file is removed and the entry marked failed.
pub(super) async fn keep_audio(
    state: &AppState,
    user_id: i64,
    history_id: i64,
    stored: &StoredAudio,
    mime_type: &str,
    original_filename: &str,
) -> Result<i64, AppError> {
    let path = stored.path.to_string_lossy().to_string();
    let download = NewDownload {
        user_id,
        history_id,
        original_filename,
        stored_filename: &stored.filename,
        file_path: &path,
        file_size: stored.size,
        mime_type,
    };

    match record_audio(state, &download).await {
        Ok(id) => Ok(id),
        Err(e) => {
            state.audio.remove(&stored.path).await;
            mark_failed(state, history_id).await;
            Err(e)
        }
    }
}

/// Mark the history entry completed and register the download.
async fn record_audio(state: &AppState, download: &NewDownload<'_>) -> Result<i64, AppError> {
    state
        .db
        .set_history_status(
            download.history_id,
            ProcessingStatus::Completed,
            Some(download.file_path),
        )
        .await?;
    state.db.save_download(download).await
}

pub(super) async fn mark_failed(state: &AppState, history_id: i64) {
    if let Err(e) = state
        .db
        .set_history_status(history_id, ProcessingStatus::Failed, None)
        .await
    {
        tracing::error!("Could not mark history {} failed: {}", history_id, e);
    }
}

pub async fn audio(
    State(state): State<Arc<AppState>>,
    Path(history_id): Path<i64>,
) -> Result<Response, AppError> {
    let entry = state
        .db
        .get_history(history_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Audio file not found".into()))?;

    let path = entry
        .audio_file_path
        .ok_or_else(|| AppError::NotFound("Audio file not found".into()))?;

    let bytes = state.audio.read(&path).await?;
    let mime_type = mime_for_path(&path);
    let extension = crate::speech::extension_for(&mime_type);

    audio_response(
        bytes,
        &mime_type,
        &format!("tonecast_audio_{}.{}", history_id, extension),
        Disposition::Inline,
    )
}

#[cfg(test)]
mod tests {
    use crate::api::handlers::testing::{test_app, test_app_with_speech};
    use crate::db::{ProcessingStatus, ProfileFields};
    use crate::speech::SpeechService;
    use axum::{body::Body, http::Request, http::StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_rewrite_passthrough_creates_guest_history() {
        let app = test_app().await;
        let (status, body) = app
            .json("POST", "/api/rewrite", Some(json!({"text": "  Hello world  ", "tone": "Calm"})))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rewritten_text"], "Hello world");
        assert_eq!(body["provider"], "passthrough");
        assert_eq!(body["tone"], "calm");

        let guest = app
            .state
            .db
            .get_user_by_email("guest@tonecast.local")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(guest.name, "Guest");

        let history_id = body["history_id"].as_i64().unwrap();
        let entry = app.state.db.get_history(history_id).await.unwrap().unwrap();
        assert_eq!(entry.user_id, guest.id);
        assert_eq!(entry.voice, "allison");
    }

    #[tokio::test]
    async fn test_rewrite_validation() {
        let app = test_app().await;

        let (status, _) = app.json("POST", "/api/rewrite", Some(json!({"text": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .json("POST", "/api/rewrite", Some(json!({"text": "hi", "tone": "sarcastic"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("neutral"));

        let long = "x".repeat(10001);
        let (status, _) = app.json("POST", "/api/rewrite", Some(json!({"text": long}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_synthesize_stores_audio_and_download() {
        let app = test_app().await;
        let user = app
            .state
            .db
            .create_user("A", "a@example.com", None, &ProfileFields::default())
            .await
            .unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/api/synthesize")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"text": "Read me", "voice": "Lisa", "user_id": user}).to_string(),
            ))
            .unwrap();
        let (status, headers, body) = app.send(request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["content-type"], "audio/wav");
        assert!(headers["content-disposition"]
            .to_str()
            .unwrap()
            .starts_with("attachment; filename=\"tonecast_lisa_"));
        assert!(body.starts_with(b"RIFF"));

        let history_id: i64 = headers["x-history-id"].to_str().unwrap().parse().unwrap();
        let entry = app.state.db.get_history(history_id).await.unwrap().unwrap();
        assert_eq!(entry.processing_status, ProcessingStatus::Completed);
        assert!(entry.audio_generated);

        let download_id: i64 = headers["x-download-id"].to_str().unwrap().parse().unwrap();
        let download = app
            .state
            .db
            .get_download(download_id, Some(user))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(download.file_size, Some(body.len() as i64));

        let audio = Request::builder()
            .uri(format!("/api/audio/{}", history_id))
            .body(Body::empty())
            .unwrap();
        let (status, headers, served) = app.send(audio).await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers["content-disposition"].to_str().unwrap().starts_with("inline"));
        assert_eq!(served, body);
    }

    #[tokio::test]
    async fn test_synthesize_rejects_bad_input() {
        let app = test_app().await;
        let user = app
            .state
            .db
            .create_user("A", "a@example.com", None, &ProfileFields::default())
            .await
            .unwrap();

        let (status, _) = app
            .json("POST", "/api/synthesize", Some(json!({"text": "hi", "voice": "robot", "user_id": user})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .json("POST", "/api/synthesize", Some(json!({"text": "hi"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .json("POST", "/api/synthesize", Some(json!({"text": "hi", "user_id": user + 10})))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .json("POST", "/api/synthesize", Some(json!({"text": "hi", "user_id": user, "history_id": 999})))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failed_synthesis_marks_history() {
        let app = test_app_with_speech(SpeechService::new(Vec::new())).await;
        let user = app
            .state
            .db
            .create_user("A", "a@example.com", None, &ProfileFields::default())
            .await
            .unwrap();

        let (status, body) = app
            .json("POST", "/api/synthesize", Some(json!({"text": "hi", "user_id": user})))
            .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "SERVICE_UNAVAILABLE");

        let history = app.state.db.list_history(user, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].processing_status, ProcessingStatus::Failed);
        assert_eq!(app.state.db.count_downloads().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unrecorded_download_leaves_no_file() {
        let app = test_app().await;
        let user = app
            .state
            .db
            .create_user("A", "a@example.com", None, &ProfileFields::default())
            .await
            .unwrap();
        sqlx::query("DROP TABLE downloads")
            .execute(app.state.db.pool())
            .await
            .unwrap();

        let (status, _) = app
            .json("POST", "/api/synthesize", Some(json!({"text": "hi", "user_id": user})))
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let history = app.state.db.list_history(user, 10).await.unwrap();
        assert_eq!(history[0].processing_status, ProcessingStatus::Failed);
        assert!(!history[0].audio_generated);
        assert!(history[0].audio_file_path.is_none());
        assert_eq!(app.state.audio.usage_bytes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_audio_missing_file_is_404() {
        let app = test_app().await;
        let (status, _) = app.json("GET", "/api/audio/12345", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
