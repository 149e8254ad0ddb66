//! Error types for the LLM client.

use thiserror::Error;

/// Result type for LLM client operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// LLM client errors.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Configuration error (missing API key, unknown provider)
    #[error("configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("network error: {0}")]
    Network(String),

    /// API error (non-2xx response, rate limit, invalid request)
    #[error("API error from {provider} ({status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    /// Response shape did not match the provider's documented contract
    #[error("response parse error: {0}")]
    Response(String),

    /// Every provider in the fallback chain failed.
    ///
    /// Carries each provider's underlying error so callers can see
    /// exactly why the chain was exhausted.
    #[error("all LLM providers failed: {}", failed_provider_names(.0))]
    AllProvidersFailed(Vec<(String, LlmError)>),

    /// The model's output could not be parsed as JSON.
    ///
    /// Distinct from [`LlmError::Response`]: the HTTP exchange succeeded
    /// but the completion text was not valid JSON.
    #[error("failed to parse model output as JSON: {message}")]
    JsonParse {
        message: String,
        /// The (possibly de-fenced) content that failed to parse, truncated.
        content: String,
    },
}

fn failed_provider_names(errors: &[(String, LlmError)]) -> String {
    if errors.is_empty() {
        return "no providers available".to_string();
    }
    errors
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_error_lists_providers() {
        let err = LlmError::AllProvidersFailed(vec![
            ("deepseek".into(), LlmError::Network("refused".into())),
            ("qwen".into(), LlmError::Config("no key".into())),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("deepseek"));
        assert!(msg.contains("qwen"));
    }

    #[test]
    fn aggregate_error_with_no_providers() {
        let err = LlmError::AllProvidersFailed(Vec::new());
        assert!(err.to_string().contains("no providers available"));
    }
}
