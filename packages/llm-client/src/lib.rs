//! Multi-provider LLM completion client
//!
//! A thin client over several chat-completion APIs (DeepSeek, Qwen, Claude,
//! OpenAI) with ordered fallback and per-provider circuit breaking. No
//! domain logic lives here; callers hand it prompts and get text or parsed
//! JSON back.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use llm_client::{CompleteOptions, CompletionRequest, LlmClient};
//! use llm_client::providers::{ClaudeProvider, DeepSeekProvider, OpenAiProvider, QwenProvider};
//!
//! let client = LlmClient::new(vec![
//!     Arc::new(DeepSeekProvider::from_env()),
//!     Arc::new(QwenProvider::from_env()),
//!     Arc::new(ClaudeProvider::from_env()),
//!     Arc::new(OpenAiProvider::from_env()),
//! ]);
//!
//! let request = CompletionRequest::new("Summarize this section")
//!     .temperature(0.2);
//! let response = client.complete(&request, &CompleteOptions::default()).await?;
//!
//! // Structured output: fenced ```json blocks are unwrapped automatically.
//! let value = client.complete_json(&request, &CompleteOptions::default()).await?;
//! ```

pub mod client;
pub mod error;
pub mod provider;
pub mod providers;
pub mod testing;
pub mod types;

pub use client::{extract_json_block, CompleteOptions, LlmClient, DEFAULT_FALLBACK_ORDER};
pub use error::{LlmError, Result};
pub use provider::Provider;
pub use types::{CompletionRequest, LlmResponse, Usage};
