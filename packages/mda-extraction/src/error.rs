//! Typed errors for the MD&A extraction library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.
//!
//! Note that "no MD&A section found" is NOT an error: candidate
//! generation returns `Ok(None)` and the pipeline persists a flagged
//! record instead.

use thiserror::Error;

/// Errors that can occur during MD&A extraction operations.
#[derive(Debug, Error)]
pub enum MdaError {
    /// Document has no pages at all (malformed input, fail fast)
    #[error("page set is empty")]
    EmptyPageSet,

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// LLM call failed (evaluation or refinement)
    #[error("LLM error: {0}")]
    Llm(#[from] llm_client::LlmError),

    /// JSON parsing error (learning store files, LLM payloads)
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Learning store file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, MdaError>;
