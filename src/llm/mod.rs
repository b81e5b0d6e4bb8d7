//! Generation backend — the hosted LLM that answers chat turns.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::AppConfig;
use crate::core::errors::ApiError;

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Run one generation over the assembled prompt and return the
    /// model's text output verbatim.
    async fn generate(&self, prompt: &str) -> Result<String, ApiError>;
}

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiProvider {
    /// A missing API key is fatal here, at construction, not at the
    /// first chat turn.
    pub fn new(config: &AppConfig) -> Result<Self, ApiError> {
        let api_key = config.gemini_api_key.clone().ok_or_else(|| {
            ApiError::Configuration("GEMINI_API_KEY not found in environment".to_string())
        })?;

        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            api_key,
            model: config.gemini_model.clone(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            client,
        })
    }

}

#[async_trait]
impl GenerationBackend for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let res = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("generation error: {}", text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;

        let content = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        Ok(content)
    }
}
