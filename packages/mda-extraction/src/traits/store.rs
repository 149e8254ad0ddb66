//! Storage traits for rules and extraction records.
//!
//! The pipeline only needs two narrow capabilities from its backing
//! store: look up per-document rules, and upsert/inspect extraction
//! records. Implementations decide durability.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ExtractionRule, MdaRecord};

/// Per-document boundary rules.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Fetch the rule for one (entity, year), if any.
    async fn get_rule(&self, entity_id: &str, year: i32) -> Result<Option<ExtractionRule>>;

    /// Insert or replace the rule for the rule's (entity, year).
    async fn upsert_rule(&self, rule: &ExtractionRule) -> Result<()>;
}

/// Extraction records, keyed by (entity, year, content hash).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or replace the record under its idempotency key.
    async fn upsert_record(&self, record: &MdaRecord) -> Result<()>;

    /// Whether a successful record already exists for this exact source
    /// document (the incremental-skip check).
    async fn has_successful_record(
        &self,
        entity_id: &str,
        year: i32,
        content_hash: &str,
    ) -> Result<bool>;

    /// Extracted text of the prior year's record, for the YoY check.
    ///
    /// Only successful records count; a flagged or undersized prior
    /// extraction is no baseline.
    async fn prior_year_text(&self, entity_id: &str, year: i32) -> Result<Option<String>>;
}
