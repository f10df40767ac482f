use axum::{extract::State, response::Response};
use std::sync::Arc;

use super::speech::{keep_audio, mark_failed, synthesize_for_history};
use super::{audio_response, Disposition};
use crate::api::extract::{Json, Path};
use crate::api::routes::AppState;
use crate::api::{
    lowercase_or, validate_text, MergedStoryResponse, SegmentAudioRequest, SegmentAudioResponse,
    StoryAnalysisResponse, StoryRequest,
};
use crate::db::{NewHistory, ProcessingStatus, User};
use crate::error::AppError;
use crate::narration::{analyze_story, voices_and_tones, STORY_VOICES};
use crate::speech::merge::{encode_clip, join_clips, Clip, CLIP_PAUSE_SECS};
use crate::speech::{mime_for_path, SpeechRequest};

const MERGED_LABEL: &str = "multiple";
const MERGED_TITLE: &str = "Story Narration (Merged)";

fn audio_url(filename: &str) -> String {
    format!("/api/story/audio/{}", filename)
}

async fn story_user(state: &AppState, user_id: Option<i64>) -> Result<User, AppError> {
    let user_id = user_id.ok_or_else(|| AppError::BadRequest("User ID is required".into()))?;
    state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StoryRequest>,
) -> Result<Json<StoryAnalysisResponse>, AppError> {
    let text = validate_text(&request.text)?;
    let user = story_user(&state, request.user_id).await?;

    let segments = analyze_story(text);
    let (voices_used, tones_used) = voices_and_tones(&segments);
    tracing::info!(
        "Analyzed story for user {} into {} segments",
        user.id,
        segments.len()
    );

    Ok(Json(StoryAnalysisResponse {
        success: true,
        total_segments: segments.len(),
        segments,
        voices_used,
        tones_used,
    }))
}

pub async fn segment_audio(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SegmentAudioRequest>,
) -> Result<Json<SegmentAudioResponse>, AppError> {
    let text = validate_text(&request.text)?;
    let voice_id = lowercase_or(&request.voice, STORY_VOICES[0]);
    let tone = lowercase_or(&request.tone, "neutral");

    let voice = state
        .db
        .get_voice(&voice_id)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("Invalid voice '{}'", voice_id)))?;
    let user = story_user(&state, request.user_id).await?;

    let history_id = state
        .db
        .save_history(&NewHistory {
            user_id: user.id,
            original_text: text,
            rewritten_text: text,
            tone: &tone,
            voice: &voice.voice_id,
        })
        .await?;
    state
        .db
        .set_history_status(history_id, ProcessingStatus::Processing, None)
        .await?;

    let speech_request = SpeechRequest {
        text,
        voice: &voice.voice_id,
        provider_voice: &voice.provider_voice_id,
    };
    let segment_id = request.segment_id;
    let recorded = synthesize_for_history(&state, user.id, history_id, &speech_request, |_| {
        format!("story_segment_{}", segment_id)
    })
    .await?;

    Ok(Json(SegmentAudioResponse {
        success: true,
        audio_url: audio_url(&recorded.stored.filename),
        filename: recorded.stored.filename,
        file_size: recorded.stored.size,
        voice: voice.voice_id,
        tone,
        segment_id,
        history_id,
        download_id: recorded.download_id,
    }))
}

/// Narrate every segment and join the clips into one WAV. Segments that fail
/// to synthesize or decode, or whose sample rate differs from the first clip,
/// are left out.
pub async fn merged(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StoryRequest>,
) -> Result<Json<MergedStoryResponse>, AppError> {
    let text = validate_text(&request.text)?;
    let user = story_user(&state, request.user_id).await?;

    let segments = analyze_story(text);
    if segments.is_empty() {
        return Err(AppError::BadRequest("No story segments found".into()));
    }

    let history_id = state
        .db
        .save_history(&NewHistory {
            user_id: user.id,
            original_text: text,
            rewritten_text: MERGED_TITLE,
            tone: MERGED_LABEL,
            voice: MERGED_LABEL,
        })
        .await?;
    state
        .db
        .set_history_status(history_id, ProcessingStatus::Processing, None)
        .await?;

    let mut clips: Vec<Clip> = Vec::with_capacity(segments.len());
    for (index, segment) in segments.iter().enumerate() {
        let voice = match state.db.get_voice(segment.voice).await {
            Ok(Some(voice)) => voice,
            Ok(None) => {
                tracing::warn!("Segment {} skipped: voice {} unknown", index, segment.voice);
                continue;
            }
            Err(e) => {
                tracing::warn!("Segment {} skipped: {}", index, e);
                continue;
            }
        };

        let speech_request = SpeechRequest {
            text: &segment.text,
            voice: &voice.voice_id,
            provider_voice: &voice.provider_voice_id,
        };
        let clip = match state.speech.synthesize(&speech_request).await {
            Ok(audio) => Clip::decode(&audio.bytes).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match clip {
            Ok(clip) if clips.first().map_or(true, |c| c.sample_rate == clip.sample_rate) => {
                clips.push(clip)
            }
            Ok(clip) => tracing::warn!(
                "Segment {} skipped: {} Hz does not match the story",
                index,
                clip.sample_rate
            ),
            Err(e) => tracing::warn!("Segment {} skipped: {}", index, e),
        }
    }

    if clips.is_empty() {
        mark_failed(&state, history_id).await;
        return Err(AppError::ServiceUnavailable(
            "Failed to generate any audio segments".into(),
        ));
    }

    let encoded = join_clips(&clips, CLIP_PAUSE_SECS).and_then(|joined| {
        let duration = joined.duration_secs();
        encode_clip(&joined).map(|bytes| (bytes, duration))
    });
    let (bytes, duration_seconds) = match encoded {
        Ok(encoded) => encoded,
        Err(e) => {
            mark_failed(&state, history_id).await;
            return Err(AppError::Internal(format!("Could not merge story audio: {}", e)));
        }
    };

    let stored = match state.audio.save(user.id, "story", "wav", &bytes).await {
        Ok(stored) => stored,
        Err(e) => {
            mark_failed(&state, history_id).await;
            return Err(e);
        }
    };
    let download_id = keep_audio(
        &state,
        user.id,
        history_id,
        &stored,
        "audio/wav",
        "story_merged.wav",
    )
    .await?;

    tracing::info!(
        "Merged {} of {} story segments into {} ({:.1}s)",
        clips.len(),
        segments.len(),
        stored.filename,
        duration_seconds
    );

    Ok(Json(MergedStoryResponse {
        success: true,
        audio_url: audio_url(&stored.filename),
        filename: stored.filename,
        file_size: stored.size,
        segments_count: segments.len(),
        segments_rendered: clips.len(),
        duration_seconds,
        history_id,
        download_id,
    }))
}

pub async fn story_audio(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let path = state
        .audio
        .resolve(&filename)
        .ok_or_else(|| AppError::BadRequest("Invalid filename".into()))?;
    let bytes = state.audio.read(&path).await?;
    let mime_type = mime_for_path(&filename);
    audio_response(bytes, &mime_type, &filename, Disposition::Inline)
}

#[cfg(test)]
mod tests {
    use crate::api::handlers::testing::{test_app, TestApp};
    use crate::db::{ProcessingStatus, ProfileFields};
    use crate::speech::merge::Clip;
    use axum::{body::Body, http::Request, http::StatusCode};
    use serde_json::json;

    async fn user(app: &TestApp) -> i64 {
        app.state
            .db
            .create_user("Teller", "teller@example.com", None, &ProfileFields::default())
            .await
            .unwrap()
    }

    async fn fetch(app: &TestApp, url: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder().uri(url).body(Body::empty()).unwrap();
        let (status, _, body) = app.send(request).await;
        (status, body)
    }

    #[tokio::test]
    async fn test_analyze_returns_segments() {
        let app = test_app().await;
        let user = user(&app).await;
        let story = "It was late.\nMara (scared): \"Who's there?\"\nTom (calm): Only me.";

        let (status, body) = app
            .json("POST", "/api/story/analyze", Some(json!({"text": story, "user_id": user})))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_segments"], 3);
        assert_eq!(body["segments"][0]["character"], "Narrator");
        assert_eq!(body["segments"][1]["character"], "Mara");
        assert_eq!(body["segments"][1]["tone"], "suspenseful");
        assert_eq!(body["voices_used"], json!(["david", "heera", "zira"]));
    }

    #[tokio::test]
    async fn test_story_requires_known_user() {
        let app = test_app().await;

        let (status, _) = app
            .json("POST", "/api/story/analyze", Some(json!({"text": "Once."})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .json("POST", "/api/story/merged", Some(json!({"text": "Once.", "user_id": 99})))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_segment_audio_is_stored_and_served() {
        let app = test_app().await;
        let user = user(&app).await;

        let (status, body) = app
            .json(
                "POST",
                "/api/story/segment-audio",
                Some(json!({"text": "Only me.", "voice": "Zira", "tone": "calm", "user_id": user, "segment_id": 2})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["voice"], "zira");
        assert_eq!(body["segment_id"], 2);

        let download_id = body["download_id"].as_i64().unwrap();
        let download = app
            .state
            .db
            .get_download(download_id, Some(user))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(download.original_filename, "story_segment_2.wav");

        let (status, served) = fetch(&app, body["audio_url"].as_str().unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(served.starts_with(b"RIFF"));
        assert_eq!(served.len() as i64, body["file_size"].as_i64().unwrap());
    }

    #[tokio::test]
    async fn test_segment_audio_rejects_unknown_voice() {
        let app = test_app().await;
        let user = user(&app).await;
        let (status, _) = app
            .json(
                "POST",
                "/api/story/segment-audio",
                Some(json!({"text": "Hi.", "voice": "robot", "user_id": user})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_merged_story_joins_segments_with_pauses() {
        let app = test_app().await;
        let user = user(&app).await;

        let (status, body) = app
            .json(
                "POST",
                "/api/story/merged",
                Some(json!({"text": "The door creaked.\nAnn (happy): Hello!", "user_id": user})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["segments_count"], 2);
        assert_eq!(body["segments_rendered"], 2);
        assert!((body["duration_seconds"].as_f64().unwrap() - 4.5).abs() < 1e-6);

        let history_id = body["history_id"].as_i64().unwrap();
        let entry = app.state.db.get_history(history_id).await.unwrap().unwrap();
        assert_eq!(entry.processing_status, ProcessingStatus::Completed);
        assert_eq!(entry.voice, "multiple");
        assert_eq!(entry.rewritten_text, "Story Narration (Merged)");

        let (status, served) = fetch(&app, body["audio_url"].as_str().unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        let clip = Clip::decode(&served).unwrap();
        assert_eq!(clip.sample_rate, 22050);
        assert!((clip.duration_secs() - 4.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_merged_story_without_segments_is_bad_request() {
        let app = test_app().await;
        let user = user(&app).await;
        let (status, body) = app
            .json(
                "POST",
                "/api/story/merged",
                Some(json!({"text": "Bob (sad): \"\"", "user_id": user})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No story segments found");
    }

    #[tokio::test]
    async fn test_story_audio_refuses_bad_names() {
        let app = test_app().await;

        let (status, _) = fetch(&app, "/api/story/audio/..%2Fsecret.wav").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = fetch(&app, "/api/story/audio/missing.wav").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
