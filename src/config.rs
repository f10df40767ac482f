use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_HF_BASE_URL: &str = "https://api-inference.huggingface.co/models";
const DEFAULT_HF_TEXT_MODEL: &str = "ibm-granite/granite-3.3-8b-instruct";
const DEFAULT_HF_TTS_MODELS: &str =
    "microsoft/speecht5_tts,espnet/kan-bayashi_ljspeech_vits,facebook/mms-tts-eng";
const DEFAULT_WATSONX_MODEL: &str = "ibm/granite-13b-chat-v2";
const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com/identity/token";

/// Runtime configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub audio_dir: PathBuf,
    pub static_dir: PathBuf,
    pub default_user_email: String,
    pub admin_session_hours: i64,
    pub provider_timeout: Duration,
    pub huggingface: HuggingFaceConfig,
    pub watsonx: WatsonxConfig,
    pub watson_tts: WatsonTtsConfig,
    pub speech_placeholder: bool,
}

#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub api_token: Option<String>,
    pub base_url: String,
    pub text_model: String,
    pub tts_models: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct WatsonxConfig {
    pub api_key: Option<String>,
    pub url: Option<String>,
    pub project_id: Option<String>,
    pub model: String,
    pub iam_url: String,
}

#[derive(Debug, Clone)]
pub struct WatsonTtsConfig {
    pub api_key: Option<String>,
    pub url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let port = match var("PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| format!("PORT must be a number, got '{}'", p))?,
            None => 3000,
        };

        let admin_session_hours = match var("ADMIN_SESSION_HOURS") {
            Some(h) => h
                .parse()
                .map_err(|_| format!("ADMIN_SESSION_HOURS must be a number, got '{}'", h))?,
            None => 24,
        };

        let timeout_secs: u64 = match var("PROVIDER_TIMEOUT_SECS") {
            Some(t) => t
                .parse()
                .map_err(|_| format!("PROVIDER_TIMEOUT_SECS must be a number, got '{}'", t))?,
            None => 30,
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://data/tonecast.db".to_string()),
            audio_dir: var("AUDIO_DIR")
                .unwrap_or_else(|| "./audio_files".to_string())
                .into(),
            static_dir: var("STATIC_DIR").unwrap_or_else(|| "static".to_string()).into(),
            default_user_email: var("DEFAULT_USER_EMAIL")
                .unwrap_or_else(|| "guest@tonecast.local".to_string()),
            admin_session_hours,
            provider_timeout: Duration::from_secs(timeout_secs),
            huggingface: HuggingFaceConfig {
                api_token: secret("HUGGINGFACE_API_TOKEN"),
                base_url: var("HUGGINGFACE_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_HF_BASE_URL.to_string()),
                text_model: var("HUGGINGFACE_TEXT_MODEL")
                    .unwrap_or_else(|| DEFAULT_HF_TEXT_MODEL.to_string()),
                tts_models: split_list(
                    &var("HUGGINGFACE_TTS_MODELS")
                        .unwrap_or_else(|| DEFAULT_HF_TTS_MODELS.to_string()),
                ),
            },
            watsonx: WatsonxConfig {
                api_key: secret("WATSONX_API_KEY"),
                url: secret("WATSONX_URL"),
                project_id: secret("WATSONX_PROJECT_ID"),
                model: var("WATSONX_MODEL").unwrap_or_else(|| DEFAULT_WATSONX_MODEL.to_string()),
                iam_url: var("IBM_IAM_URL").unwrap_or_else(|| DEFAULT_IAM_URL.to_string()),
            },
            watson_tts: WatsonTtsConfig {
                api_key: secret("TTS_API_KEY"),
                url: secret("TTS_URL"),
            },
            speech_placeholder: var("SPEECH_PLACEHOLDER")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Like `var`, but template values copied from sample env files count as unset.
fn secret(key: &str) -> Option<String> {
    var(key).filter(|v| !is_placeholder(v))
}

pub fn is_placeholder(value: &str) -> bool {
    let upper = value.to_ascii_uppercase();
    upper.starts_with("YOUR_") || upper.starts_with("HF_YOUR_") || upper.contains("CHANGE-ME")
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_detection() {
        assert!(is_placeholder("YOUR_TTS_API_KEY"));
        assert!(is_placeholder("hf_your_token_here"));
        assert!(!is_placeholder("hf_abc123"));
    }

    #[test]
    fn test_split_list_skips_blanks() {
        assert_eq!(split_list("a, b,,c "), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("off"));
        assert!(!parse_flag("FALSE"));
    }
}
