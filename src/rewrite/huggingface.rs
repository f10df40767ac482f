use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::RewriteProvider;
use crate::provider::{check_status, ProviderError};

#[derive(Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    temperature: f32,
    do_sample: bool,
}

#[derive(Deserialize)]
struct Generation {
    #[serde(default)]
    generated_text: String,
}

/// Text generation through the Hugging Face Inference API.
pub struct HuggingFaceRewriter {
    client: Client,
    endpoint: String,
    api_token: String,
}

impl HuggingFaceRewriter {
    pub fn new(client: Client, base_url: &str, model: &str, api_token: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/{}", base_url.trim_end_matches('/'), model),
            api_token: api_token.to_string(),
        }
    }
}

#[async_trait]
impl RewriteProvider for HuggingFaceRewriter {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    async fn rewrite(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = GenerationRequest {
            inputs: prompt,
            parameters: GenerationParameters {
                max_new_tokens: 150,
                temperature: 0.7,
                do_sample: true,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await?;

        let generations: Vec<Generation> = check_status(response).await?.json().await?;
        let generated = generations
            .into_iter()
            .next()
            .map(|g| g.generated_text)
            .ok_or_else(|| ProviderError::InvalidResponse("no generations returned".into()))?;

        // The model may echo the prompt before its continuation
        let text = generated.replace(prompt, "").trim().to_string();
        if text.is_empty() {
            return Err(ProviderError::InvalidResponse("empty generation".into()));
        }
        Ok(text)
    }
}
