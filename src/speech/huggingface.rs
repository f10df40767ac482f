use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::Serialize;

use super::{SpeechAudio, SpeechProvider, SpeechRequest};
use crate::provider::{check_status, ProviderError};

/// Bodies at least this large are taken to be audio whatever their content type.
const MIN_AUDIO_BYTES: usize = 1000;

#[derive(Serialize)]
struct TtsRequest<'a> {
    inputs: &'a str,
    options: TtsOptions,
}

#[derive(Serialize)]
struct TtsOptions {
    use_cache: bool,
    wait_for_model: bool,
}

/// Speech through Hugging Face hosted TTS models, tried in configured order.
pub struct HuggingFaceSpeech {
    client: Client,
    base_url: String,
    models: Vec<String>,
    api_token: String,
}

impl HuggingFaceSpeech {
    pub fn new(client: Client, base_url: &str, models: Vec<String>, api_token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            models,
            api_token: api_token.to_string(),
        }
    }

    async fn try_model(&self, model: &str, text: &str) -> Result<SpeechAudio, ProviderError> {
        let body = TtsRequest {
            inputs: text,
            options: TtsOptions {
                use_cache: false,
                wait_for_model: true,
            },
        };

        let response = self
            .client
            .post(format!("{}/{}", self.base_url, model))
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let bytes = response.bytes().await?;

        let is_audio = content_type.starts_with("audio/");
        if !is_audio && bytes.len() <= MIN_AUDIO_BYTES {
            // Usually a JSON note that the model is still loading
            return Err(ProviderError::InvalidResponse(format!(
                "{} returned {} bytes of {}",
                model,
                bytes.len(),
                content_type
            )));
        }

        Ok(SpeechAudio {
            bytes: bytes.to_vec(),
            mime_type: if is_audio {
                content_type
            } else {
                "audio/wav".to_string()
            },
            provider: "huggingface",
        })
    }
}

#[async_trait]
impl SpeechProvider for HuggingFaceSpeech {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    async fn synthesize(&self, request: &SpeechRequest<'_>) -> Result<SpeechAudio, ProviderError> {
        let mut last_error = ProviderError::InvalidResponse("no TTS models configured".into());

        for model in &self.models {
            match self.try_model(model, request.text).await {
                Ok(audio) => return Ok(audio),
                Err(e) => {
                    tracing::debug!("TTS model {} failed: {}", model, e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}
