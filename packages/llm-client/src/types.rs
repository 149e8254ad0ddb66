//! Request and response types shared by all providers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A completion request, provider-agnostic.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// User prompt
    pub prompt: String,

    /// Optional system prompt
    pub system: Option<String>,

    /// Sampling temperature (0.0 to 2.0)
    pub temperature: f32,

    /// Maximum tokens in the completion
    pub max_tokens: u32,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for CompletionRequest {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            system: None,
            temperature: 0.7,
            max_tokens: 4096,
            timeout: Duration::from_secs(60),
        }
    }
}

impl CompletionRequest {
    /// Create a request with the given user prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Set the system prompt.
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum completion tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A completed response from one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Completion text
    pub content: String,

    /// Model that produced the completion
    pub model: String,

    /// Name of the provider that answered
    pub provider: String,

    /// Token usage statistics
    pub usage: Usage,

    /// Wall-clock latency of the HTTP exchange
    pub latency_ms: u64,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u32,

    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_chains() {
        let req = CompletionRequest::new("hello")
            .system("be terse")
            .temperature(0.3)
            .max_tokens(512)
            .timeout(Duration::from_secs(10));

        assert_eq!(req.prompt, "hello");
        assert_eq!(req.system.as_deref(), Some("be terse"));
        assert_eq!(req.temperature, 0.3);
        assert_eq!(req.max_tokens, 512);
        assert_eq!(req.timeout, Duration::from_secs(10));
    }
}
