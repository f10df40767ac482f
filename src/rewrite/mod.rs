pub mod huggingface;
pub mod watsonx;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::config::Config;
use crate::provider::{http_client, ProviderError};

pub use huggingface::HuggingFaceRewriter;
pub use watsonx::WatsonxRewriter;

/// Provider name reported when the text comes back unchanged.
pub const PASSTHROUGH: &str = "passthrough";

lazy_static! {
    static ref TONE_MARKER: Regex =
        Regex::new(r"(?i)^\s*\[\s*([a-z]+)(\s+tone)?\s*\]\s*").unwrap();
}

/// A language model able to rewrite a prepared prompt.
#[async_trait]
pub trait RewriteProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn rewrite(&self, prompt: &str) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct RewriteOutcome {
    pub text: String,
    pub provider: String,
}

pub fn build_prompt(template: &str, text: &str) -> String {
    format!("{}\n\nOriginal text: {}\n\nRewritten text:", template, text)
}

/// Strip a leading `[CALM TONE]` or `[CALM]` style marker for `tone`.
pub fn clean_tone_prefix(text: &str, tone: &str) -> String {
    if let Some(caps) = TONE_MARKER.captures(text) {
        let word_is_tone = caps
            .get(1)
            .map(|m| m.as_str().eq_ignore_ascii_case(tone))
            .unwrap_or(false);
        if word_is_tone {
            let end = caps.get(0).map(|m| m.end()).unwrap_or(0);
            return text[end..].trim().to_string();
        }
    }
    text.trim().to_string()
}

/// Tries each provider in order and never fails: with no usable provider the
/// original text is returned.
pub struct RewriteService {
    providers: Vec<Box<dyn RewriteProvider>>,
}

impl RewriteService {
    pub fn new(providers: Vec<Box<dyn RewriteProvider>>) -> Self {
        Self { providers }
    }

    pub fn from_config(config: &Config) -> Self {
        let client = http_client(config.provider_timeout);
        let mut providers: Vec<Box<dyn RewriteProvider>> = Vec::new();

        if let Some(token) = &config.huggingface.api_token {
            providers.push(Box::new(HuggingFaceRewriter::new(
                client.clone(),
                &config.huggingface.base_url,
                &config.huggingface.text_model,
                token,
            )));
        }

        if let (Some(key), Some(url)) = (&config.watsonx.api_key, &config.watsonx.url) {
            providers.push(Box::new(WatsonxRewriter::new(
                client,
                url,
                key,
                config.watsonx.project_id.clone(),
                &config.watsonx.model,
                &config.watsonx.iam_url,
            )));
        }

        if providers.is_empty() {
            tracing::warn!("No rewrite provider configured, text will pass through unchanged");
        }

        Self::new(providers)
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn rewrite(&self, text: &str, tone: &str, template: &str) -> RewriteOutcome {
        let prompt = build_prompt(template, text);

        for provider in &self.providers {
            match provider.rewrite(&prompt).await {
                Ok(output) => {
                    let cleaned = clean_tone_prefix(&output, tone);
                    if cleaned.is_empty() {
                        tracing::warn!("{} returned an empty rewrite", provider.name());
                        continue;
                    }
                    tracing::info!("Rewrote text with {} (tone: {})", provider.name(), tone);
                    return RewriteOutcome {
                        text: cleaned,
                        provider: provider.name().to_string(),
                    };
                }
                Err(e) => {
                    tracing::warn!("Rewrite with {} failed: {}", provider.name(), e);
                }
            }
        }

        RewriteOutcome {
            text: text.to_string(),
            provider: PASSTHROUGH.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, Result<&'static str, ()>);

    #[async_trait]
    impl RewriteProvider for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn rewrite(&self, _prompt: &str) -> Result<String, ProviderError> {
            self.1
                .map(String::from)
                .map_err(|_| ProviderError::InvalidResponse("boom".into()))
        }
    }

    #[test]
    fn test_prompt_layout() {
        assert_eq!(
            build_prompt("Be calm:", "hi"),
            "Be calm:\n\nOriginal text: hi\n\nRewritten text:"
        );
    }

    #[test]
    fn test_clean_tone_prefix() {
        assert_eq!(clean_tone_prefix("[CALM TONE] Hello", "calm"), "Hello");
        assert_eq!(clean_tone_prefix("  [calm]  Hello ", "calm"), "Hello");
        assert_eq!(clean_tone_prefix("[Note] Hello", "calm"), "[Note] Hello");
        assert_eq!(clean_tone_prefix("Hello [CALM]", "calm"), "Hello [CALM]");
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let service = RewriteService::new(vec![
            Box::new(Fixed("broken", Err(()))),
            Box::new(Fixed("good", Ok("[SAD TONE] It rained."))),
            Box::new(Fixed("unused", Ok("never"))),
        ]);

        let outcome = service.rewrite("rain", "sad", "Be sad:").await;
        assert_eq!(outcome.provider, "good");
        assert_eq!(outcome.text, "It rained.");
    }

    #[tokio::test]
    async fn test_empty_output_falls_through() {
        let service = RewriteService::new(vec![Box::new(Fixed("blank", Ok("[CALM]  ")))]);
        let outcome = service.rewrite("stay", "calm", "Be calm:").await;
        assert_eq!(outcome.provider, PASSTHROUGH);
        assert_eq!(outcome.text, "stay");
    }

    #[tokio::test]
    async fn test_no_providers_passes_through() {
        let service = RewriteService::new(Vec::new());
        assert!(service.provider_names().is_empty());
        let outcome = service.rewrite("unchanged", "neutral", "x").await;
        assert_eq!(outcome.text, "unchanged");
        assert_eq!(outcome.provider, PASSTHROUGH);
    }
}
