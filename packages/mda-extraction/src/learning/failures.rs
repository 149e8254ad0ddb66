//! Failure pattern learning: classify extraction failures, count
//! recurrences, and turn curated exclusion rules into negative prompts.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;

const STORE_VERSION: &str = "1.0";

/// Default recurrence floor for "frequent" patterns.
pub const FREQUENT_MIN_OCCURRENCES: u32 = 3;

/// Structured matching conditions for a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConditions {
    pub error_type: String,
}

/// One recurring failure mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailurePattern {
    pub pattern_id: String,
    pub description: String,
    pub match_conditions: MatchConditions,

    /// Curated "avoid this" rule; empty until an analysis pass fills it
    pub exclusion_rule: String,

    pub occurrences: u32,
}

/// Aggregate stats for dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct FailureStats {
    pub total_patterns: usize,
    pub total_occurrences: u32,
    /// Up to five (pattern_id, occurrences) pairs, most frequent first
    pub top_patterns: Vec<(String, u32)>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: String,
    patterns: Vec<FailurePattern>,
}

/// Classify a failure into a stable pattern id.
///
/// Ordered substring checks; the first match wins. Unclassifiable
/// failures get a per-error-type bucket.
pub fn classify_failure(error_type: &str, error_message: &str) -> String {
    let lower = error_message.to_lowercase();

    if error_message.contains("目录") || lower.contains("toc") {
        return "TOC_PARSE_FAILED".to_string();
    }
    if error_message.contains("边界") || lower.contains("boundary") {
        return "BOUNDARY_DETECTION_FAILED".to_string();
    }
    if error_message.contains('空') || lower.contains("empty") {
        return "EMPTY_RESULT".to_string();
    }
    if error_message.contains("乱码") || lower.contains("garbled") {
        return "ENCODING_ERROR".to_string();
    }
    if error_message.contains("超时") || lower.contains("timeout") {
        return "TIMEOUT_ERROR".to_string();
    }
    if lower.contains("api") || lower.contains("rate") {
        return "API_ERROR".to_string();
    }
    format!("OTHER_{error_type}")
}

/// In-memory pattern store with JSON persistence.
#[derive(Debug, Clone, Default)]
pub struct FailurePatternStore {
    patterns: Vec<FailurePattern>,
}

impl FailurePatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file; a missing or malformed file starts empty.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let raw = std::fs::read_to_string(path)?;
        match serde_json::from_str::<StoreFile>(&raw) {
            Ok(file) => {
                info!(count = file.patterns.len(), "loaded failure patterns");
                Ok(Self {
                    patterns: file.patterns,
                })
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failure patterns unreadable, resetting");
                Ok(Self::new())
            }
        }
    }

    /// Persist as `{version, patterns}`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = StoreFile {
            version: STORE_VERSION.to_string(),
            patterns: self.patterns.clone(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    /// Record a failure: bump an existing pattern or open a new one.
    pub fn record_failure(&mut self, error_type: &str, error_message: &str) -> String {
        let pattern_id = classify_failure(error_type, error_message);

        if let Some(pattern) = self.patterns.iter_mut().find(|p| p.pattern_id == pattern_id) {
            pattern.occurrences += 1;
            debug!(pattern = %pattern_id, occurrences = pattern.occurrences, "failure recurrence");
            return pattern_id;
        }

        let description: String = {
            let truncated: String = error_message.chars().take(100).collect();
            format!("{error_type}: {truncated}")
        };
        info!(pattern = %pattern_id, "new failure pattern");
        self.patterns.push(FailurePattern {
            pattern_id: pattern_id.clone(),
            description,
            match_conditions: MatchConditions {
                error_type: error_type.to_string(),
            },
            exclusion_rule: String::new(),
            occurrences: 1,
        });
        pattern_id
    }

    /// "避免: ..." lines for patterns frequent enough to act on.
    pub fn exclusion_prompts(&self, min_occurrences: u32) -> Vec<String> {
        self.patterns
            .iter()
            .filter(|p| !p.exclusion_rule.is_empty() && p.occurrences >= min_occurrences)
            .map(|p| format!("避免: {}", p.exclusion_rule))
            .collect()
    }

    /// Patterns seen at least `min_occurrences` times.
    pub fn frequent_patterns(&self, min_occurrences: u32) -> Vec<&FailurePattern> {
        self.patterns
            .iter()
            .filter(|p| p.occurrences >= min_occurrences)
            .collect()
    }

    /// Attach a curated exclusion rule; false when the id is unknown.
    pub fn update_exclusion_rule(&mut self, pattern_id: &str, rule: impl Into<String>) -> bool {
        match self.patterns.iter_mut().find(|p| p.pattern_id == pattern_id) {
            Some(pattern) => {
                pattern.exclusion_rule = rule.into();
                true
            }
            None => false,
        }
    }

    pub fn stats_summary(&self) -> FailureStats {
        let mut top: Vec<(String, u32)> = self
            .patterns
            .iter()
            .map(|p| (p.pattern_id.clone(), p.occurrences))
            .collect();
        top.sort_by(|a, b| b.1.cmp(&a.1));
        top.truncate(5);

        FailureStats {
            total_patterns: self.patterns.len(),
            total_occurrences: self.patterns.iter().map(|p| p.occurrences).sum(),
            top_patterns: top,
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
