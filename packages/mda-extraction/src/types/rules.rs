//! Per-document extraction rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a rule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSource {
    /// Hand-written by an operator
    Custom,
    /// Produced by the self-refine loop
    LlmLearned,
}

/// A persisted boundary rule for one (entity, year) document.
///
/// Patterns are literal heading substrings, matched only against lines
/// that pass the heading filter. An absent end pattern means "run to the
/// page/char limits".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRule {
    pub entity_id: String,
    pub year: i32,
    pub start_pattern: String,
    pub end_pattern: Option<String>,
    pub source: RuleSource,
    pub updated_at: DateTime<Utc>,
}

impl ExtractionRule {
    pub fn new(
        entity_id: impl Into<String>,
        year: i32,
        start_pattern: impl Into<String>,
        source: RuleSource,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            year,
            start_pattern: start_pattern.into(),
            end_pattern: None,
            source,
            updated_at: Utc::now(),
        }
    }

    pub fn with_end_pattern(mut self, end_pattern: impl Into<String>) -> Self {
        self.end_pattern = Some(end_pattern.into());
        self
    }
}
