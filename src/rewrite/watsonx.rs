use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::RewriteProvider;
use crate::provider::{check_status, ProviderError};

const API_VERSION: &str = "2023-05-29";
const IAM_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";
/// Refresh this long before the IAM token actually expires.
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct GenerationRequest<'a> {
    input: &'a str,
    parameters: GenerationParameters,
    model_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_id: Option<&'a str>,
}

#[derive(Serialize)]
struct GenerationParameters {
    decoding_method: &'static str,
    max_new_tokens: u32,
    temperature: f32,
    repetition_penalty: f32,
}

#[derive(Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    results: Vec<GenerationResult>,
}

#[derive(Deserialize)]
struct GenerationResult {
    generated_text: String,
}

#[derive(Deserialize)]
struct IamToken {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Text generation on IBM watsonx.ai, authenticated with an IAM bearer token.
pub struct WatsonxRewriter {
    client: Client,
    url: String,
    api_key: String,
    project_id: Option<String>,
    model: String,
    iam_url: String,
    token: RwLock<Option<CachedToken>>,
}

impl WatsonxRewriter {
    pub fn new(
        client: Client,
        url: &str,
        api_key: &str,
        project_id: Option<String>,
        model: &str,
        iam_url: &str,
    ) -> Self {
        Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            project_id,
            model: model.to_string(),
            iam_url: iam_url.to_string(),
            token: RwLock::new(None),
        }
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if Instant::now() < token.refresh_at {
                    return Ok(token.value.clone());
                }
            }
        }

        let response = self
            .client
            .post(&self.iam_url)
            .form(&[("grant_type", IAM_GRANT_TYPE), ("apikey", self.api_key.as_str())])
            .send()
            .await?;

        let token: IamToken = check_status(response)
            .await
            .map_err(|e| ProviderError::Auth(e.to_string()))?
            .json()
            .await?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_MARGIN);
        tracing::debug!("Fetched IAM token valid for {:?}", lifetime);

        let mut cached = self.token.write().await;
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }
}

#[async_trait]
impl RewriteProvider for WatsonxRewriter {
    fn name(&self) -> &'static str {
        "watsonx"
    }

    async fn rewrite(&self, prompt: &str) -> Result<String, ProviderError> {
        let token = self.access_token().await?;

        let body = GenerationRequest {
            input: prompt,
            parameters: GenerationParameters {
                decoding_method: "greedy",
                max_new_tokens: 500,
                temperature: 0.7,
                repetition_penalty: 1.1,
            },
            model_id: &self.model,
            project_id: self.project_id.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/ml/v1/text/generation", self.url))
            .query(&[("version", API_VERSION)])
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let generation: GenerationResponse = check_status(response).await?.json().await?;
        generation
            .results
            .into_iter()
            .next()
            .map(|r| r.generated_text.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("no generated text".into()))
    }
}
