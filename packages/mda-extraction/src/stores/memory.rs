//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Result;
use crate::traits::store::{RecordStore, RuleStore};
use crate::types::{ExtractionRule, MdaRecord};

/// In-memory storage for rules and extraction records.
///
/// Useful for testing and development. Not suitable for production
/// as data is lost on restart.
pub struct MemoryStore {
    rules: RwLock<HashMap<(String, i32), ExtractionRule>>,
    records: RwLock<HashMap<(String, i32, String), MdaRecord>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        self.rules.write().unwrap().clear();
        self.records.write().unwrap().clear();
    }

    /// Get the number of stored records.
    pub fn record_count(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Get the number of stored rules.
    pub fn rule_count(&self) -> usize {
        self.rules.read().unwrap().len()
    }

    /// Fetch a record by its full key (for assertions in tests).
    pub fn get_record(&self, entity_id: &str, year: i32, content_hash: &str) -> Option<MdaRecord> {
        self.records
            .read()
            .unwrap()
            .get(&(entity_id.to_string(), year, content_hash.to_string()))
            .cloned()
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn get_rule(&self, entity_id: &str, year: i32) -> Result<Option<ExtractionRule>> {
        Ok(self
            .rules
            .read()
            .unwrap()
            .get(&(entity_id.to_string(), year))
            .cloned())
    }

    async fn upsert_rule(&self, rule: &ExtractionRule) -> Result<()> {
        self.rules
            .write()
            .unwrap()
            .insert((rule.entity_id.clone(), rule.year), rule.clone());
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn upsert_record(&self, record: &MdaRecord) -> Result<()> {
        self.records.write().unwrap().insert(
            (
                record.entity_id.clone(),
                record.year,
                record.content_hash.clone(),
            ),
            record.clone(),
        );
        Ok(())
    }

    async fn has_successful_record(
        &self,
        entity_id: &str,
        year: i32,
        content_hash: &str,
    ) -> Result<bool> {
        Ok(self
            .records
            .read()
            .unwrap()
            .get(&(entity_id.to_string(), year, content_hash.to_string()))
            .map(|r| r.is_successful())
            .unwrap_or(false))
    }

    async fn prior_year_text(&self, entity_id: &str, year: i32) -> Result<Option<String>> {
        let records = self.records.read().unwrap();
        Ok(records
            .values()
            .filter(|r| r.entity_id == entity_id && r.year == year - 1 && r.is_successful())
            .filter_map(|r| r.extraction.as_ref())
            .map(|e| e.text.clone())
            .next())
    }
}
