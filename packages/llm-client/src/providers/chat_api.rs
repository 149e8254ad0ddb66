//! Shared call logic for Chat-Completions-shaped APIs.
//!
//! DeepSeek, Qwen (DashScope compatible mode) and OpenAI all speak the same
//! wire contract; only base URL, model and credentials differ.

use std::time::Instant;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{LlmError, Result};
use crate::types::{CompletionRequest, LlmResponse, Usage};

/// One configured Chat-Completions endpoint.
pub(crate) struct ChatCompletionsApi {
    pub(crate) provider: &'static str,
    pub(crate) base_url: String,
    pub(crate) model: String,
    pub(crate) api_key: Option<SecretString>,
    pub(crate) http: Client,
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<UsageRaw>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct UsageRaw {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl ChatCompletionsApi {
    pub(crate) fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    pub(crate) async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| LlmError::Config(format!("{}: API key not configured", self.provider)))?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": request.prompt}));

        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        debug!(provider = self.provider, model = %self.model, "chat completion request");
        let start = Instant::now();

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key.expose_secret()))
            .header("Content-Type", "application/json")
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(provider = self.provider, error = %e, "request failed");
                LlmError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(provider = self.provider, status = %status, "API error");
            return Err(LlmError::Api {
                provider: self.provider.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| LlmError::Response(e.to_string()))?;

        let latency_ms = start.elapsed().as_millis() as u64;

        let content = raw
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                LlmError::Response(format!("{}: response contained no choices", self.provider))
            })?;

        let usage = raw
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: raw.model.unwrap_or_else(|| self.model.clone()),
            provider: self.provider.to_string(),
            usage,
            latency_ms,
        })
    }
}

/// Read an API key from the first set environment variable.
pub(crate) fn key_from_env(vars: &[&str]) -> Option<SecretString> {
    vars.iter()
        .find_map(|v| std::env::var(v).ok())
        .filter(|k| !k.is_empty())
        .map(SecretString::from)
}
