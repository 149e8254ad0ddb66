//! Qwen provider via the DashScope OpenAI-compatible endpoint.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;

use super::chat_api::{key_from_env, ChatCompletionsApi};
use crate::error::Result;
use crate::provider::Provider;
use crate::types::{CompletionRequest, LlmResponse};

const API_BASE: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
const DEFAULT_MODEL: &str = "qwen-plus";

/// Qwen (DashScope) adapter.
pub struct QwenProvider {
    api: ChatCompletionsApi,
}

impl QwenProvider {
    /// Create a provider with an explicit API key.
    pub fn new(api_key: SecretString) -> Self {
        Self::with_key(Some(api_key))
    }

    /// Create a provider reading `QWEN_API_KEY` or `DASHSCOPE_API_KEY`.
    pub fn from_env() -> Self {
        Self::with_key(key_from_env(&["QWEN_API_KEY", "DASHSCOPE_API_KEY"]))
    }

    fn with_key(api_key: Option<SecretString>) -> Self {
        Self {
            api: ChatCompletionsApi {
                provider: "qwen",
                base_url: API_BASE.to_string(),
                model: DEFAULT_MODEL.to_string(),
                api_key,
                http: Client::new(),
            },
        }
    }

    /// Override the model id.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.api.model = model.into();
        self
    }

    /// Override the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api.base_url = url.into();
        self
    }
}

#[async_trait]
impl Provider for QwenProvider {
    fn name(&self) -> &str {
        "qwen"
    }

    fn is_available(&self) -> bool {
        self.api.is_available()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse> {
        self.api.complete(request).await
    }
}
