use serde::Serialize;

use super::Database;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Tone {
    pub tone_id: String,
    pub tone_name: String,
    pub description: Option<String>,
    #[serde(skip_serializing)]
    pub prompt_template: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Voice {
    pub voice_id: String,
    pub voice_name: String,
    pub description: Option<String>,
    pub gender: Option<String>,
    pub provider_voice_id: String,
    pub alias_of: Option<String>,
}

impl Database {
    pub async fn active_tones(&self) -> Result<Vec<Tone>, AppError> {
        let tones = sqlx::query_as::<_, Tone>(
            "SELECT tone_id, tone_name, description, prompt_template
             FROM tones WHERE is_active ORDER BY id",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(tones)
    }

    pub async fn get_tone(&self, tone_id: &str) -> Result<Option<Tone>, AppError> {
        let tone = sqlx::query_as::<_, Tone>(
            "SELECT tone_id, tone_name, description, prompt_template
             FROM tones WHERE tone_id = ? AND is_active",
        )
        .bind(tone_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(tone)
    }

    /// Voices offered to clients; legacy aliases are left out.
    pub async fn listed_voices(&self) -> Result<Vec<Voice>, AppError> {
        let voices = sqlx::query_as::<_, Voice>(
            "SELECT voice_id, voice_name, description, gender, provider_voice_id, alias_of
             FROM voices WHERE is_active AND alias_of IS NULL ORDER BY id",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(voices)
    }

    /// Any active voice, aliases included.
    pub async fn get_voice(&self, voice_id: &str) -> Result<Option<Voice>, AppError> {
        let voice = sqlx::query_as::<_, Voice>(
            "SELECT voice_id, voice_name, description, gender, provider_voice_id, alias_of
             FROM voices WHERE voice_id = ? AND is_active",
        )
        .bind(voice_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(voice)
    }
}
