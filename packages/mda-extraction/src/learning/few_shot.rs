//! Few-shot sample store: successful extractions reused as prompt
//! examples for similar documents.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;

const STORE_VERSION: &str = "1.0";

/// A successful extraction kept as a prompt example.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FewShotSample {
    pub entity_id: String,
    pub year: i32,

    /// Business category (industry) of the entity
    pub category: String,

    /// Hash of the document's TOC structure; same signature means the
    /// report template is likely identical
    pub structural_signature: String,

    pub start_pattern: String,
    pub end_pattern: String,

    /// Keywords describing the document, for Jaccard matching
    pub keywords: Vec<String>,

    pub quality_score: f64,
    pub char_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: String,
    samples: Vec<FewShotSample>,
}

/// In-memory sample library with JSON persistence.
#[derive(Debug, Clone, Default)]
pub struct FewShotStore {
    samples: Vec<FewShotSample>,
}

impl FewShotStore {
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
                info!(count = file.samples.len(), "loaded few-shot samples");
                Ok(Self {
                    samples: file.samples,
                })
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "few-shot store unreadable, resetting");
                Ok(Self::new())
            }
        }
    }

    /// Persist as `{version, samples}`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = StoreFile {
            version: STORE_VERSION.to_string(),
            samples: self.samples.clone(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
        info!(count = self.samples.len(), "saved few-shot samples");
        Ok(())
    }

    /// Insert a sample; an existing (entity, year) entry is replaced.
    pub fn add(&mut self, sample: FewShotSample) {
        if let Some(existing) = self
            .samples
            .iter_mut()
            .find(|s| s.entity_id == sample.entity_id && s.year == sample.year)
        {
            debug!(entity = %sample.entity_id, year = sample.year, "updating sample");
            *existing = sample;
            return;
        }
        debug!(entity = %sample.entity_id, year = sample.year, "adding sample");
        self.samples.push(sample);
    }

    /// Rank samples by keyword Jaccard weighted by quality, with bonuses
    /// for a matching category (+0.2) and structural signature (+0.3).
    pub fn find_similar(
        &self,
        keywords: &[String],
        category: Option<&str>,
        structural_signature: Option<&str>,
        top_k: usize,
    ) -> Vec<&FewShotSample> {
        if self.samples.is_empty() {
            return Vec::new();
        }

        let target: HashSet<&str> = keywords.iter().map(String::as_str).collect();

        let mut scored: Vec<(f64, &FewShotSample)> = self
            .samples
            .iter()
            .map(|sample| {
                let sample_set: HashSet<&str> =
                    sample.keywords.iter().map(String::as_str).collect();
                let intersection = target.intersection(&sample_set).count();
                let union = target.union(&sample_set).count();
                let jaccard = if union > 0 {
                    intersection as f64 / union as f64
                } else {
                    0.0
                };

                let category_bonus = match category {
                    Some(c) if sample.category == c => 0.2,
                    _ => 0.0,
                };
                let signature_bonus = match structural_signature {
                    Some(sig) if sample.structural_signature == sig => 0.3,
                    _ => 0.0,
                };

                let quality_weight = sample.quality_score / 100.0;
                (jaccard * quality_weight + category_bonus + signature_bonus, sample)
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().take(top_k).map(|(_, s)| s).collect()
    }

    /// Render samples as a few-shot prompt block.
    pub fn format_prompt(samples: &[&FewShotSample]) -> String {
        if samples.is_empty() {
            return String::new();
        }

        let mut lines = vec!["以下是相似年报的成功提取案例：\n".to_string()];
        for (i, sample) in samples.iter().enumerate() {
            lines.push(format!(
                "### 案例 {}: {} ({})",
                i + 1,
                sample.entity_id,
                sample.year
            ));
            lines.push(format!("- 行业: {}", sample.category));
            lines.push(format!("- 起始标题: `{}`", sample.start_pattern));
            lines.push(format!("- 结束标题: `{}`", sample.end_pattern));
            lines.push(format!("- 提取字数: {}", sample.char_count));
            lines.push(format!("- 质量评分: {}\n", sample.quality_score));
        }
        lines.join("\n")
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(entity: &str, year: i32, category: &str, keywords: &[&str], quality: f64) -> FewShotSample {
        FewShotSample {
            entity_id: entity.to_string(),
            year,
            category: category.to_string(),
            structural_signature: format!("sig-{entity}"),
            start_pattern: "第四节 管理层讨论与分析".to_string(),
            end_pattern: "第五节 监事会报告".to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            quality_score: quality,
            char_count: 12_000,
        }
    }

    #[test]
    fn add_upserts_by_entity_and_year() {
        let mut store = FewShotStore::new();
        store.add(sample("600000", 2022, "银行", &["收入"], 80.0));
        store.add(sample("600000", 2022, "银行", &["收入"], 95.0));
        store.add(sample("600000", 2023, "银行", &["收入"], 90.0));

        assert_eq!(store.len(), 2);
        let found = store.find_similar(&["收入".to_string()], None, None, 10);
        assert!(found.iter().any(|s| (s.quality_score - 95.0).abs() < 1e-9));
    }

    #[test]
    fn find_similar_prefers_matching_category_and_signature() {
        let mut store = FewShotStore::new();
        store.add(sample("600000", 2022, "银行", &["收入", "利息"], 90.0));
        store.add(sample("000001", 2022, "制造", &["收入", "利息"], 90.0));

        let found = store.find_similar(
            &["收入".to_string(), "利息".to_string()],
            Some("制造"),
            Some("sig-000001"),
            1,
        );
        assert_eq!(found[0].entity_id, "000001");
    }

    #[test]
    fn quality_weights_the_jaccard_score() {
        let mut store = FewShotStore::new();
        store.add(sample("A", 2022, "制造", &["收入", "展望"], 40.0));
        store.add(sample("B", 2022, "制造", &["收入", "展望"], 100.0));

        let found = store.find_similar(&["收入".to_string(), "展望".to_string()], None, None, 2);
        assert_eq!(found[0].entity_id, "B");
    }

    #[test]
    fn empty_store_finds_nothing() {
        let store = FewShotStore::new();
        assert!(store.find_similar(&["收入".to_string()], None, None, 3).is_empty());
    }

    #[test]
    fn prompt_block_lists_each_sample() {
        let s1 = sample("600000", 2022, "银行", &["收入"], 88.0);
        let s2 = sample("000001", 2023, "制造", &["展望"], 92.0);
        let block = FewShotStore::format_prompt(&[&s1, &s2]);
        assert!(block.contains("案例 1: 600000 (2022)"));
        assert!(block.contains("案例 2: 000001 (2023)"));
        assert!(block.contains("第四节 管理层讨论与分析"));
        assert!(FewShotStore::format_prompt(&[]).is_empty());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.json");

        let mut store = FewShotStore::new();
        store.add(sample("600000", 2022, "银行", &["收入"], 88.0));
        store.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"version\""));

        let loaded = FewShotStore::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
    }
}
