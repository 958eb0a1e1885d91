//! Client for the OpenAI-compatible vision chat API.
//!
//! Every generation endpoint funnels through [`VisionClient::json_for_image`]:
//! one image-grounded chat completion constrained to a JSON object response.
//! Exactly one attempt per call; retrying is the user's decision, not ours.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_endpoint: String,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("OpenAI API key not configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("model returned no content")]
    EmptyChoices,

    #[error("model returned invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Clone)]
pub struct VisionClient {
    config: VisionConfig,
    client: reqwest::Client,
}

impl VisionClient {
    pub fn from_env() -> Self {
        let api_key = env_string("OPENAI_API_KEY");
        let model = env_string("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_endpoint =
            env_string("LLM_API_ENDPOINT").unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());
        let timeout = Duration::from_millis(
            env_string("LLM_TIMEOUT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_MS),
        );

        Self::with_config(VisionConfig {
            api_key,
            model,
            api_endpoint,
            timeout,
        })
    }

    pub fn with_config(config: VisionConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { config, client }
    }

    pub fn is_available(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty())
    }

    /// Sends one multimodal prompt (text plus image) and decodes the JSON
    /// object the model was instructed to produce.
    pub async fn json_for_image(
        &self,
        system: &str,
        prompt: &str,
        image_url: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<serde_json::Value, VisionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or(VisionError::NotConfigured)?;

        let url = format!(
            "{}/chat/completions",
            self.config.api_endpoint.trim_end_matches('/')
        );
        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "system",
                    "content": system
                },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": prompt },
                        {
                            "type": "image_url",
                            "image_url": { "url": image_url, "detail": "high" }
                        }
                    ]
                }
            ],
            "response_format": { "type": "json_object" },
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::HttpStatus { status, body });
        }

        let decoded: ChatResponse = response.json().await?;
        let content = decoded
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .ok_or(VisionError::EmptyChoices)?;

        Ok(serde_json::from_str(content)?)
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
