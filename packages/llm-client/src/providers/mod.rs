//! Concrete provider adapters.

mod chat_api;
mod claude;
mod deepseek;
mod openai;
mod qwen;

pub use claude::ClaudeProvider;
pub use deepseek::DeepSeekProvider;
pub use openai::OpenAiProvider;
pub use qwen::QwenProvider;
