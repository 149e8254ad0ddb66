//! Claude provider using Anthropic's Messages API.
//!
//! The wire contract differs from Chat Completions: system prompt is a
//! top-level field, auth uses `x-api-key`, and content comes back as a
//! list of typed blocks.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::chat_api::key_from_env;
use crate::error::{LlmError, Result};
use crate::provider::Provider;
use crate::types::{CompletionRequest, LlmResponse, Usage};

const API_BASE: &str = "https://api.anthropic.com/v1";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const API_VERSION: &str = "2023-06-01";

/// Claude (Anthropic) adapter.
pub struct ClaudeProvider {
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct MessagesResponseRaw {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<UsageRaw>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct UsageRaw {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl ClaudeProvider {
    /// Create a provider with an explicit API key.
    pub fn new(api_key: SecretString) -> Self {
        Self::with_key(Some(api_key))
    }

    /// Create a provider reading `ANTHROPIC_API_KEY` from the environment.
    pub fn from_env() -> Self {
        Self::with_key(key_from_env(&["ANTHROPIC_API_KEY"]))
    }

    fn with_key(api_key: Option<SecretString>) -> Self {
        Self {
            base_url: API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key,
            http: Client::new(),
        }
    }

    /// Override the model id.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl Provider for ClaudeProvider {
    fn name(&self) -> &str {
        "claude"
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| LlmError::Config("claude: API key not configured".into()))?;

        let mut body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": request.prompt}],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if let Some(system) = &request.system {
            body["system"] = json!(system);
        }

        debug!(model = %self.model, "claude messages request");
        let start = Instant::now();

        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "claude request failed");
                LlmError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, "claude API error");
            return Err(LlmError::Api {
                provider: "claude".to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let raw: MessagesResponseRaw = response
            .json()
            .await
            .map_err(|e| LlmError::Response(e.to_string()))?;

        let latency_ms = start.elapsed().as_millis() as u64;

        let content: String = raw
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .map(|b| b.text.as_str())
            .collect();

        let usage = raw
            .usage
            .map(|u| Usage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: raw.model.unwrap_or_else(|| self.model.clone()),
            provider: "claude".to_string(),
            usage,
            latency_ms,
        })
    }
}
