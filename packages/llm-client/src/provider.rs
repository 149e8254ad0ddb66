//! Provider trait - the seam between the client and concrete APIs.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CompletionRequest, LlmResponse};

/// A single LLM provider adapter.
///
/// Implementations wrap one HTTPS JSON API (Chat-Completions-shaped or
/// Messages-shaped) and report whether they are usable at all
/// (i.e. an API key is configured).
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable provider name used for fallback ordering and breaker state.
    fn name(&self) -> &str;

    /// Whether the provider is configured (API key present).
    fn is_available(&self) -> bool;

    /// Execute a completion request.
    async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse>;
}
