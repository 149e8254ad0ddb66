//! DeepSeek provider (Chat-Completions-shaped API).

use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;

use super::chat_api::{key_from_env, ChatCompletionsApi};
use crate::error::Result;
use crate::provider::Provider;
use crate::types::{CompletionRequest, LlmResponse};

const API_BASE: &str = "https://api.deepseek.com/v1";
const DEFAULT_MODEL: &str = "deepseek-chat";

/// DeepSeek adapter.
pub struct DeepSeekProvider {
    api: ChatCompletionsApi,
}

impl DeepSeekProvider {
    /// Create a provider with an explicit API key.
    pub fn new(api_key: SecretString) -> Self {
        Self::with_key(Some(api_key))
    }

    /// Create a provider reading `DEEPSEEK_API_KEY` from the environment.
    ///
    /// A missing key is not an error: the provider reports itself
    /// unavailable and the client skips it.
    pub fn from_env() -> Self {
        Self::with_key(key_from_env(&["DEEPSEEK_API_KEY"]))
    }

    fn with_key(api_key: Option<SecretString>) -> Self {
        Self {
            api: ChatCompletionsApi {
                provider: "deepseek",
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

    /// Override the base URL (proxies, self-hosted gateways).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api.base_url = url.into();
        self
    }
}

#[async_trait]
impl Provider for DeepSeekProvider {
    fn name(&self) -> &str {
        "deepseek"
    }

    fn is_available(&self) -> bool {
        self.api.is_available()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse> {
        self.api.complete(request).await
    }
}
