pub mod huggingface;
pub mod merge;
pub mod placeholder;
pub mod store;
pub mod watson;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::AppError;
use crate::provider::{http_client, ProviderError};

pub use huggingface::HuggingFaceSpeech;
pub use placeholder::PlaceholderSpeech;
pub use store::AudioStore;
pub use watson::WatsonSpeech;

#[derive(Debug, Clone)]
pub struct SpeechRequest<'a> {
    pub text: &'a str,
    pub voice: &'a str,
    /// Voice name understood by the upstream service.
    pub provider_voice: &'a str,
}

#[derive(Debug, Clone)]
pub struct SpeechAudio {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub provider: &'static str,
}

impl SpeechAudio {
    pub fn extension(&self) -> &'static str {
        extension_for(&self.mime_type)
    }
}

/// Extensions preferred when a content type maps to several.
const PREFERRED_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "ogg"];

/// File extension for an audio content type, ignoring parameters such as `;rate=22050`.
/// Anything unknown or not audio is stored as `wav`.
pub fn extension_for(mime_type: &str) -> &'static str {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    if !essence.starts_with("audio/") {
        return "wav";
    }

    let Some(extensions) = mime_guess::get_mime_extensions_str(&essence) else {
        return "wav";
    };
    extensions
        .iter()
        .find(|ext| PREFERRED_EXTENSIONS.contains(ext))
        .or_else(|| extensions.first())
        .copied()
        .unwrap_or("wav")
}

/// Content type for a stored audio file, judged by its extension.
pub fn mime_for_path(path: &str) -> String {
    mime_guess::from_path(path).first_or_octet_stream().to_string()
}

#[async_trait]
pub trait SpeechProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn synthesize(&self, request: &SpeechRequest<'_>) -> Result<SpeechAudio, ProviderError>;
}

/// Tries each provider in order; the first audio produced wins.
pub struct SpeechService {
    providers: Vec<Box<dyn SpeechProvider>>,
}

impl SpeechService {
    pub fn new(providers: Vec<Box<dyn SpeechProvider>>) -> Self {
        Self { providers }
    }

    pub fn from_config(config: &Config) -> Self {
        let client = http_client(config.provider_timeout);
        let mut providers: Vec<Box<dyn SpeechProvider>> = Vec::new();

        if let Some(token) = &config.huggingface.api_token {
            if !config.huggingface.tts_models.is_empty() {
                providers.push(Box::new(HuggingFaceSpeech::new(
                    client.clone(),
                    &config.huggingface.base_url,
                    config.huggingface.tts_models.clone(),
                    token,
                )));
            }
        }

        if let (Some(key), Some(url)) = (&config.watson_tts.api_key, &config.watson_tts.url) {
            providers.push(Box::new(WatsonSpeech::new(client, url, key)));
        }

        if config.speech_placeholder {
            providers.push(Box::new(PlaceholderSpeech::default()));
        }

        if providers.is_empty() {
            tracing::warn!("No speech provider configured, synthesis requests will fail");
        }

        Self::new(providers)
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn synthesize(&self, request: &SpeechRequest<'_>) -> Result<SpeechAudio, AppError> {
        for provider in &self.providers {
            match provider.synthesize(request).await {
                Ok(audio) => {
                    tracing::info!(
                        "Synthesized {} bytes with {} (voice: {})",
                        audio.bytes.len(),
                        provider.name(),
                        request.voice
                    );
                    return Ok(audio);
                }
                Err(e) => {
                    tracing::warn!("Speech synthesis with {} failed: {}", provider.name(), e);
                }
            }
        }

        Err(AppError::ServiceUnavailable(
            "Text-to-speech service not available".into(),
        ))
    }
}
