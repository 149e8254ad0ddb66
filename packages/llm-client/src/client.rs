//! Unified client with ordered fallback and per-provider circuit breaking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{LlmError, Result};
use crate::provider::Provider;
use crate::types::{CompletionRequest, LlmResponse};

/// Default fallback priority.
pub const DEFAULT_FALLBACK_ORDER: &[&str] = &["deepseek", "qwen", "claude", "openai"];

/// Consecutive failures before a provider's breaker opens.
const FAILURE_THRESHOLD: u32 = 5;

static JSON_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap());
static ANY_FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```\s*(.*?)\s*```").unwrap());

#[derive(Default)]
struct BreakerState {
    consecutive_failures: u32,
    open: bool,
}

/// Per-call options for [`LlmClient::complete`].
#[derive(Debug, Clone, Default)]
pub struct CompleteOptions {
    /// Pin the call to one provider instead of walking the fallback order.
    pub provider: Option<String>,

    /// When false, stop after the first provider failure instead of
    /// falling back. Defaults to true.
    pub retry_on_failure: Option<bool>,
}

impl CompleteOptions {
    /// Pin to a single provider.
    pub fn pinned(provider: impl Into<String>) -> Self {
        Self {
            provider: Some(provider.into()),
            retry_on_failure: None,
        }
    }

    /// Disable fallback to subsequent providers.
    pub fn no_retry() -> Self {
        Self {
            provider: None,
            retry_on_failure: Some(false),
        }
    }
}

/// Provider-agnostic completion client.
///
/// Holds an ordered list of provider adapters. `complete` walks them in
/// priority order, skipping unconfigured or circuit-broken providers, and
/// falls back on failure. Breaker state is mutated under a mutex so one
/// client can be shared across concurrent refine sessions.
pub struct LlmClient {
    providers: Vec<Arc<dyn Provider>>,
    fallback_order: Vec<String>,
    breakers: Mutex<HashMap<String, BreakerState>>,
}

impl LlmClient {
    /// Create a client with the default fallback order.
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        let order = DEFAULT_FALLBACK_ORDER.iter().map(|s| s.to_string()).collect();
        Self::with_fallback_order(providers, order)
    }

    /// Create a client with an explicit fallback order.
    ///
    /// Providers not named in the order are appended at the end in their
    /// registration order.
    pub fn with_fallback_order(
        providers: Vec<Arc<dyn Provider>>,
        mut fallback_order: Vec<String>,
    ) -> Self {
        for p in &providers {
            if !fallback_order.iter().any(|n| n == p.name()) {
                fallback_order.push(p.name().to_string());
            }
        }
        let breakers = providers
            .iter()
            .map(|p| (p.name().to_string(), BreakerState::default()))
            .collect();
        Self {
            providers,
            fallback_order,
            breakers: Mutex::new(breakers),
        }
    }

    fn provider_by_name(&self, name: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    fn is_circuit_open(&self, name: &str) -> bool {
        self.breakers
            .lock()
            .expect("breaker mutex poisoned")
            .get(name)
            .map(|b| b.open)
            .unwrap_or(false)
    }

    /// Consecutive-failure count for one provider (for observability/tests).
    pub fn failure_count(&self, name: &str) -> u32 {
        self.breakers
            .lock()
            .expect("breaker mutex poisoned")
            .get(name)
            .map(|b| b.consecutive_failures)
            .unwrap_or(0)
    }

    fn record_success(&self, name: &str) {
        let mut breakers = self.breakers.lock().expect("breaker mutex poisoned");
        if let Some(state) = breakers.get_mut(name) {
            state.consecutive_failures = 0;
        }
    }

    fn record_failure(&self, name: &str) {
        let mut breakers = self.breakers.lock().expect("breaker mutex poisoned");
        let state = breakers.entry(name.to_string()).or_default();
        state.consecutive_failures += 1;
        if state.consecutive_failures >= FAILURE_THRESHOLD && !state.open {
            state.open = true;
            warn!(
                provider = name,
                failures = state.consecutive_failures,
                "circuit breaker opened"
            );
        }
    }

    /// Reset one provider's breaker, or all breakers when `provider` is None.
    pub fn reset_circuit_breaker(&self, provider: Option<&str>) {
        let mut breakers = self.breakers.lock().expect("breaker mutex poisoned");
        match provider {
            Some(name) => {
                if let Some(state) = breakers.get_mut(name) {
                    state.open = false;
                    state.consecutive_failures = 0;
                }
            }
            None => {
                for state in breakers.values_mut() {
                    state.open = false;
                    state.consecutive_failures = 0;
                }
            }
        }
    }

    /// Providers that are configured and not circuit-broken, in fallback order.
    pub fn available_providers(&self) -> Vec<String> {
        self.fallback_order
            .iter()
            .filter(|name| {
                self.provider_by_name(name)
                    .map(|p| p.is_available() && !self.is_circuit_open(name))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Execute a completion, falling back through providers on failure.
    ///
    /// Returns [`LlmError::AllProvidersFailed`] carrying every provider's
    /// error when the chain is exhausted.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
        options: &CompleteOptions,
    ) -> Result<LlmResponse> {
        let retry_on_failure = options.retry_on_failure.unwrap_or(true);

        let to_try: Vec<String> = match &options.provider {
            Some(pinned) => vec![pinned.clone()],
            None => self.available_providers(),
        };

        let mut errors: Vec<(String, LlmError)> = Vec::new();

        for name in &to_try {
            let Some(provider) = self.provider_by_name(name) else {
                errors.push((name.clone(), LlmError::Config(format!("unknown provider: {name}"))));
                continue;
            };
            if !provider.is_available() {
                continue;
            }

            debug!(provider = %name, "trying provider");
            match provider.complete(request).await {
                Ok(response) => {
                    self.record_success(name);
                    return Ok(response);
                }
                Err(e) => {
                    warn!(provider = %name, error = %e, "provider failed");
                    self.record_failure(name);
                    errors.push((name.clone(), e));
                    if !retry_on_failure {
                        break;
                    }
                }
            }
        }

        Err(LlmError::AllProvidersFailed(errors))
    }

    /// Execute a completion and parse the output as JSON.
    ///
    /// Fenced ```json blocks (or any fenced block) are unwrapped before
    /// parsing. Low temperature is advisable for JSON output; this helper
    /// does not override the request's settings.
    pub async fn complete_json(
        &self,
        request: &CompletionRequest,
        options: &CompleteOptions,
    ) -> Result<serde_json::Value> {
        let response = self.complete(request, options).await?;
        let content = extract_json_block(&response.content);

        serde_json::from_str(content.trim()).map_err(|e| LlmError::JsonParse {
            message: e.to_string(),
            content: content.chars().take(500).collect(),
        })
    }
}

/// Unwrap a fenced code block, preferring ```json fences.
pub fn extract_json_block(content: &str) -> &str {
    if let Some(m) = JSON_FENCE_RE.captures(content).and_then(|c| c.get(1)) {
        return m.as_str();
    }
    if let Some(m) = ANY_FENCE_RE.captures(content).and_then(|c| c.get(1)) {
        return m.as_str();
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;
    use crate::types::Usage;

    fn ok_response(provider: &str, content: &str) -> LlmResponse {
        LlmResponse {
            content: content.to_string(),
            model: "test-model".to_string(),
            provider: provider.to_string(),
            usage: Usage::default(),
            latency_ms: 1,
        }
    }

    fn client_with(providers: Vec<Arc<dyn Provider>>) -> LlmClient {
        let order = providers.iter().map(|p| p.name().to_string()).collect();
        LlmClient::with_fallback_order(providers, order)
    }

    #[tokio::test]
    async fn fallback_uses_second_provider_and_counts_first_failure() {
        let failing = Arc::new(ScriptedProvider::always_failing("first"));
        let working =
            Arc::new(ScriptedProvider::new("second").with_response(ok_response("second", "hi")));
        let client = client_with(vec![failing.clone(), working.clone()]);

        let response = client
            .complete(&CompletionRequest::new("ping"), &CompleteOptions::default())
            .await
            .unwrap();

        assert_eq!(response.provider, "second");
        assert_eq!(client.failure_count("first"), 1);
        assert_eq!(client.failure_count("second"), 0);
        assert_eq!(failing.call_count(), 1);
        assert_eq!(working.call_count(), 1);
    }

    #[tokio::test]
    async fn all_providers_failed_carries_every_error() {
        let a = Arc::new(ScriptedProvider::always_failing("a"));
        let b = Arc::new(ScriptedProvider::always_failing("b"));
        let client = client_with(vec![a, b]);

        let err = client
            .complete(&CompletionRequest::new("ping"), &CompleteOptions::default())
            .await
            .unwrap_err();

        match err {
            LlmError::AllProvidersFailed(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].0, "a");
                assert_eq!(errors[1].0, "b");
            }
            other => panic!("expected AllProvidersFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_retry_stops_after_first_failure() {
        let a = Arc::new(ScriptedProvider::always_failing("a"));
        let b = Arc::new(ScriptedProvider::new("b").with_response(ok_response("b", "hi")));
        let client = client_with(vec![a, b.clone()]);

        let err = client
            .complete(&CompletionRequest::new("ping"), &CompleteOptions::no_retry())
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::AllProvidersFailed(errors) if errors.len() == 1));
        assert_eq!(b.call_count(), 0);
    }

    #[tokio::test]
    async fn breaker_opens_after_five_consecutive_failures() {
        let flaky = Arc::new(ScriptedProvider::always_failing("flaky"));
        let client = client_with(vec![flaky]);

        for _ in 0..5 {
            let _ = client
                .complete(&CompletionRequest::new("ping"), &CompleteOptions::default())
                .await;
        }

        assert!(client.available_providers().is_empty());

        client.reset_circuit_breaker(Some("flaky"));
        assert_eq!(client.available_providers(), vec!["flaky".to_string()]);
        assert_eq!(client.failure_count("flaky"), 0);
    }

    #[tokio::test]
    async fn success_resets_failure_counter() {
        let provider = Arc::new(
            ScriptedProvider::new("p")
                .with_failure(LlmError::Network("boom".into()))
                .with_failure(LlmError::Network("boom".into()))
                .with_response(ok_response("p", "ok")),
        );
        let client = client_with(vec![provider]);

        // Two failed rounds, then one that succeeds.
        let _ = client
            .complete(&CompletionRequest::new("x"), &CompleteOptions::default())
            .await;
        let _ = client
            .complete(&CompletionRequest::new("x"), &CompleteOptions::default())
            .await;
        assert_eq!(client.failure_count("p"), 2);

        client
            .complete(&CompletionRequest::new("x"), &CompleteOptions::default())
            .await
            .unwrap();
        assert_eq!(client.failure_count("p"), 0);
    }

    #[tokio::test]
    async fn pinned_provider_bypasses_fallback_order() {
        let a = Arc::new(ScriptedProvider::new("a").with_response(ok_response("a", "from a")));
        let b = Arc::new(ScriptedProvider::new("b").with_response(ok_response("b", "from b")));
        let client = client_with(vec![a, b]);

        let response = client
            .complete(&CompletionRequest::new("x"), &CompleteOptions::pinned("b"))
            .await
            .unwrap();
        assert_eq!(response.provider, "b");
    }

    #[tokio::test]
    async fn complete_json_unwraps_fenced_block() {
        let provider = Arc::new(ScriptedProvider::new("p").with_response(ok_response(
            "p",
            "Here you go:\n```json\n{\"total_score\": 85}\n```",
        )));
        let client = client_with(vec![provider]);

        let value = client
            .complete_json(&CompletionRequest::new("x"), &CompleteOptions::default())
            .await
            .unwrap();
        assert_eq!(value["total_score"], 85);
    }

    #[tokio::test]
    async fn complete_json_reports_parse_error_kind() {
        let provider =
            Arc::new(ScriptedProvider::new("p").with_response(ok_response("p", "not json at all")));
        let client = client_with(vec![provider]);

        let err = client
            .complete_json(&CompletionRequest::new("x"), &CompleteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::JsonParse { .. }));
    }

    #[test]
    fn extract_json_block_variants() {
        assert_eq!(extract_json_block("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(extract_json_block("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(extract_json_block("```\n{\"a\":1}\n```"), "{\"a\":1}");
        // json fence wins over a later bare fence
        let mixed = "```json\n{\"a\":1}\n```\n```\nother\n```";
        assert_eq!(extract_json_block(mixed), "{\"a\":1}");
    }
}
