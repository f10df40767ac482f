pub mod extract;
pub mod handlers;
pub mod routes;

use serde::{Deserialize, Serialize};

use crate::db::{
    Admin, AudioHistory, DownloadSummary, ProfileFields, ProfileLists, Project, RecentUser, Tone,
    User, Voice,
};
use crate::error::AppError;
use crate::narration::StorySegment;

/// Longest text accepted for rewriting or synthesis, in characters.
pub const MAX_TEXT_CHARS: usize = 10000;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub database: bool,
    pub providers: ProvidersStatus,
}

#[derive(Debug, Serialize)]
pub struct ProvidersStatus {
    pub rewrite: Vec<&'static str>,
    pub speech: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

// Auth

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct MeQuery {
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

// Catalog

#[derive(Debug, Serialize)]
pub struct ToneInfo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

impl From<Tone> for ToneInfo {
    fn from(tone: Tone) -> Self {
        Self {
            id: tone.tone_id,
            name: tone.tone_name,
            description: tone.description,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TonesResponse {
    pub tones: Vec<ToneInfo>,
}

#[derive(Debug, Serialize)]
pub struct VoiceInfo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub gender: Option<String>,
}

impl From<Voice> for VoiceInfo {
    fn from(voice: Voice) -> Self {
        Self {
            id: voice.voice_id,
            name: voice.voice_name,
            description: voice.description,
            gender: voice.gender,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub voices: Vec<VoiceInfo>,
}

// Rewrite and synthesis

#[derive(Debug, Deserialize)]
pub struct RewriteRequest {
    pub text: Option<String>,
    pub tone: Option<String>,
    pub voice: Option<String>,
    pub user_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RewriteResponse {
    pub success: bool,
    pub original_text: String,
    pub rewritten_text: String,
    pub tone: String,
    pub provider: String,
    pub history_id: i64,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: Option<String>,
    pub voice: Option<String>,
    pub tone: Option<String>,
    pub user_id: Option<i64>,
    pub history_id: Option<i64>,
}

// Story narration

#[derive(Debug, Deserialize)]
pub struct StoryRequest {
    pub text: Option<String>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct StoryAnalysisResponse {
    pub success: bool,
    pub segments: Vec<StorySegment>,
    pub total_segments: usize,
    pub voices_used: Vec<&'static str>,
    pub tones_used: Vec<&'static str>,
}

/// Body of `POST /story/segment-audio`: one segment as returned by analysis.
#[derive(Debug, Deserialize)]
pub struct SegmentAudioRequest {
    pub text: Option<String>,
    pub voice: Option<String>,
    pub tone: Option<String>,
    pub user_id: Option<i64>,
    #[serde(default)]
    pub segment_id: u32,
}

#[derive(Debug, Serialize)]
pub struct SegmentAudioResponse {
    pub success: bool,
    pub audio_url: String,
    pub filename: String,
    pub file_size: i64,
    pub voice: String,
    pub tone: String,
    pub segment_id: u32,
    pub history_id: i64,
    pub download_id: i64,
}

#[derive(Debug, Serialize)]
pub struct MergedStoryResponse {
    pub success: bool,
    pub audio_url: String,
    pub filename: String,
    pub file_size: i64,
    pub segments_count: usize,
    pub segments_rendered: usize,
    pub duration_seconds: f64,
    pub history_id: i64,
    pub download_id: i64,
}

// Users

/// Body of `POST /users` and `PUT /users/:email`.
#[derive(Debug, Default, Deserialize)]
pub struct UserPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileFields,
    pub skills: Option<Vec<String>>,
    pub interests: Option<Vec<String>>,
    pub achievements: Option<Vec<String>>,
    pub projects: Option<Vec<Project>>,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    #[serde(flatten)]
    pub lists: ProfileLists,
}

#[derive(Debug, Serialize)]
pub struct UserProfileResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub user: UserProfile,
}

// History and downloads

#[derive(Debug, Deserialize)]
pub struct HistoryRequest {
    pub user_id: Option<i64>,
    pub original_text: Option<String>,
    pub rewritten_text: Option<String>,
    pub tone: Option<String>,
    pub voice: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistorySaved {
    pub success: bool,
    pub history_id: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryListResponse {
    pub success: bool,
    pub history: Vec<AudioHistory>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct DeleteHistoryRequest {
    pub user_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DownloadsResponse {
    pub success: bool,
    pub downloads: Vec<DownloadSummary>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct DownloadFileQuery {
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteDownloadRequest {
    pub user_id: Option<i64>,
}

// Admin

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: String,
    pub admin: Admin,
}

#[derive(Debug, Serialize)]
pub struct RecentUsersResponse {
    pub users: Vec<RecentUser>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub database_ok: bool,
    pub storage_bytes: u64,
    pub uptime_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct SuspendRequest {
    pub user_id: Option<i64>,
    #[serde(default = "default_suspended")]
    pub suspended: bool,
}

fn default_suspended() -> bool {
    true
}

/// Trimmed, non-empty value of an optional field.
pub(crate) fn required<'a>(
    value: &'a Option<String>,
    field: &str,
) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{} is required", field)))
}

/// Lowercased value of an optional field, or `default`.
pub(crate) fn lowercase_or(value: &Option<String>, default: &str) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_lowercase()
}

/// Reject text that is empty or longer than `MAX_TEXT_CHARS`.
pub(crate) fn validate_text(text: &Option<String>) -> Result<&str, AppError> {
    let text = required(text, "Text")?;
    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(AppError::BadRequest(format!(
            "Text too long (max {} chars)",
            MAX_TEXT_CHARS
        )));
    }
    Ok(text)
}
