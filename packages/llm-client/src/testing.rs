//! Test doubles for provider-dependent code.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{LlmError, Result};
use crate::provider::Provider;
use crate::types::{CompletionRequest, LlmResponse, Usage};

/// Provider double that replays a queue of scripted outcomes.
///
/// Each call to `complete` pops the next queued result. An exhausted queue
/// fails with a network error unless the provider was built with
/// [`ScriptedProvider::always_failing`], which fails every call.
pub struct ScriptedProvider {
    name: String,
    script: Mutex<VecDeque<Result<LlmResponse>>>,
    always_fail: bool,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            always_fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// A provider whose every call fails with a network error.
    pub fn always_failing(name: impl Into<String>) -> Self {
        Self {
            always_fail: true,
            ..Self::new(name)
        }
    }

    /// Queue a successful response.
    pub fn with_response(self, response: LlmResponse) -> Self {
        self.script
            .lock()
            .expect("script mutex poisoned")
            .push_back(Ok(response));
        self
    }

    /// Queue a successful response with the given content.
    pub fn with_content(self, content: impl Into<String>) -> Self {
        let response = LlmResponse {
            content: content.into(),
            model: "scripted-model".to_string(),
            provider: self.name.clone(),
            usage: Usage::default(),
            latency_ms: 0,
        };
        self.with_response(response)
    }

    /// Queue a failure.
    pub fn with_failure(self, error: LlmError) -> Self {
        self.script
            .lock()
            .expect("script mutex poisoned")
            .push_back(Err(error));
        self
    }

    /// Number of `complete` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.always_fail {
            return Err(LlmError::Network(format!("{}: scripted failure", self.name)));
        }
        self.script
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::Network(format!("{}: script exhausted", self.name)))
            })
    }
}
