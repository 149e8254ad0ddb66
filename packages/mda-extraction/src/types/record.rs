//! Persisted record types: section split and the upsert record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::extraction::ExtractionResult;
use crate::types::quality::QualityScore;

/// Minimum extracted length (chars) for a record to count as successful.
///
/// Below this the extraction is kept for diagnostics but does not satisfy
/// the incremental-skip check.
pub const SUCCESS_CHAR_COUNT_MIN: usize = 500;

/// MD&A text split into operating review and future outlook.
///
/// `outlook` is only present when the split left a substantial review
/// (≥ 500 chars) and a substantial outlook (≥ 200 chars); otherwise the
/// whole text stays in `review`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdaSections {
    pub review: String,
    pub outlook: Option<String>,

    /// The heading text that triggered the split
    pub split_keyword: Option<String>,
    /// Character offset of the split point in the original text
    pub split_offset: Option<usize>,
}

impl MdaSections {
    /// An unsplit result: everything is review.
    pub fn unsplit(text: impl Into<String>) -> Self {
        Self {
            review: text.into(),
            outlook: None,
            split_keyword: None,
            split_offset: None,
        }
    }

    pub fn is_split(&self) -> bool {
        self.outlook.is_some()
    }
}

/// The unit of persistence: one extraction attempt for one document.
///
/// Keyed by (entity_id, year, content_hash); re-running the same source
/// document overwrites in place. `extraction` is `None` when no candidate
/// was produced (the record then carries `FLAG_EXTRACT_FAILED`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdaRecord {
    pub entity_id: String,
    pub year: i32,

    /// SHA-256 of the source pages (idempotency key component)
    pub content_hash: String,

    pub extraction: Option<ExtractionResult>,
    pub quality: QualityScore,
    pub sections: Option<MdaSections>,

    pub extracted_at: DateTime<Utc>,
}

impl MdaRecord {
    /// Whether this record satisfies the incremental-skip check.
    pub fn is_successful(&self) -> bool {
        self.extraction
            .as_ref()
            .map(|e| e.char_count() >= SUCCESS_CHAR_COUNT_MIN)
            .unwrap_or(false)
    }
}
