//! End-to-end document processing: incremental skip, rule lookup,
//! extraction, quality gating, section split, and persistence.

use std::sync::Mutex;

use chrono::Utc;
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::learning::weights::{StrategySummary, StrategyWeights};
use crate::pipeline::consistency::{detect_yoy_change, YOY_SIMILARITY_THRESHOLD};
use crate::pipeline::splitter::split_mda_sections;
use crate::pipeline::strategy::{extract, ExtractOptions};
use crate::scoring::quality::calculate_quality_score;
use crate::traits::{RecordStore, RuleStore};
use crate::types::{
    MdaRecord, PageSet, Penalty, QualityFlag, QualityScore, RuleSource, Strategy,
};

/// Pipeline knobs.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub extract: ExtractOptions,

    /// Skip documents that already have a successful record for the same
    /// content hash.
    pub incremental: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            extract: ExtractOptions::default(),
            incremental: true,
        }
    }
}

/// What happened to one document.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// Already processed successfully; nothing written.
    Skipped,
    /// A record was written (successful or not).
    Processed(MdaRecord),
}

impl ProcessOutcome {
    pub fn record(&self) -> Option<&MdaRecord> {
        match self {
            ProcessOutcome::Skipped => None,
            ProcessOutcome::Processed(record) => Some(record),
        }
    }
}

/// Document processor bound to one store.
///
/// Every attempt is persisted, failures included, so reruns and audits
/// can see what happened. Strategy outcomes feed the weight bandit.
pub struct MdaPipeline<S> {
    store: S,
    options: PipelineOptions,
    weights: Mutex<StrategyWeights>,
}

impl<S> MdaPipeline<S>
where
    S: RuleStore + RecordStore,
{
    pub fn new(store: S) -> Self {
        Self::with_options(store, PipelineOptions::default())
    }

    pub fn with_options(store: S, options: PipelineOptions) -> Self {
        Self {
            store,
            options,
            weights: Mutex::new(StrategyWeights::new()),
        }
    }

    pub fn with_weights(mut self, weights: StrategyWeights) -> Self {
        self.weights = Mutex::new(weights);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Per-strategy attempt/success summary accumulated so far.
    pub fn strategy_stats(&self) -> IndexMap<String, StrategySummary> {
        self.weights.lock().unwrap().stats_summary()
    }

    /// Snapshot of the weight table, e.g. for persisting between runs.
    pub fn weights_snapshot(&self) -> StrategyWeights {
        self.weights.lock().unwrap().clone()
    }

    /// Process one document end to end.
    pub async fn process(
        &self,
        entity_id: &str,
        year: i32,
        page_set: &PageSet,
    ) -> Result<ProcessOutcome> {
        let content_hash = page_set.content_hash();

        if self.options.incremental
            && self
                .store
                .has_successful_record(entity_id, year, &content_hash)
                .await?
        {
            info!(entity = entity_id, year, "already processed, skipping");
            return Ok(ProcessOutcome::Skipped);
        }

        let rule = self.store.get_rule(entity_id, year).await?;
        if let Some(rule) = &rule {
            debug!(entity = entity_id, year, source = ?rule.source, "rule found");
        }

        let extraction = extract(page_set, rule.as_ref(), &self.options.extract)?;

        let Some(mut extraction) = extraction else {
            warn!(entity = entity_id, year, "no acceptable candidate");
            let record = MdaRecord {
                entity_id: entity_id.to_string(),
                year,
                content_hash,
                extraction: None,
                quality: QualityScore {
                    score: 0,
                    needs_review: true,
                    penalties: vec![Penalty::new(
                        QualityFlag::ExtractFailed.as_str(),
                        QualityFlag::ExtractFailed.penalty(),
                    )],
                },
                sections: None,
                extracted_at: Utc::now(),
            };
            self.store.upsert_record(&record).await?;
            // Attribute the failure to the strategy that would have run.
            let attempted = match &rule {
                Some(rule) => strategy_key_for_rule(rule.source),
                None => Strategy::Generic.as_str(),
            };
            self.weights.lock().unwrap().record(attempted, false);
            return Ok(ProcessOutcome::Processed(record));
        };

        let previous = self.store.prior_year_text(entity_id, year).await?;
        let (yoy_abnormal, similarity) = detect_yoy_change(
            &extraction.text,
            previous.as_deref(),
            YOY_SIMILARITY_THRESHOLD,
        );
        if yoy_abnormal {
            warn!(entity = entity_id, year, similarity, "large year-over-year change");
            extraction.quality_flags.push(QualityFlag::YoyChangeHigh);
            extraction.quality_detail.note = Some(format!("yoy_similarity={similarity:.3}"));
        }

        let quality = calculate_quality_score(
            &extraction.text,
            &extraction.quality_flags,
            Some(&extraction.score_detail),
        );
        let sections = split_mda_sections(&extraction.text);

        let strategy_key = match extraction.strategy {
            Strategy::Custom => rule
                .as_ref()
                .map(|r| strategy_key_for_rule(r.source))
                .unwrap_or(Strategy::Custom.as_str()),
            other => other.as_str(),
        };

        let record = MdaRecord {
            entity_id: entity_id.to_string(),
            year,
            content_hash,
            extraction: Some(extraction),
            quality,
            sections: Some(sections),
            extracted_at: Utc::now(),
        };

        self.store.upsert_record(&record).await?;
        self.weights
            .lock()
            .unwrap()
            .record(strategy_key, record.is_successful());

        info!(
            entity = entity_id,
            year,
            quality = record.quality.score,
            needs_review = record.quality.needs_review,
            "document processed"
        );
        Ok(ProcessOutcome::Processed(record))
    }
}

/// Operator-written rules count as `custom`, refine-loop rules as
/// `llm_learned`.
fn strategy_key_for_rule(source: RuleSource) -> &'static str {
    match source {
        RuleSource::Custom => "custom",
        RuleSource::LlmLearned => "llm_learned",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use crate::testing::sample_report;
    use crate::types::{ExtractionRule, PageBreakKind};

    #[tokio::test]
    async fn processing_persists_a_record() {
        let pipeline = MdaPipeline::new(MemoryStore::new());
        let report = sample_report();

        let outcome = pipeline.process("600000", 2023, &report).await.unwrap();
        let record = outcome.record().expect("processed");

        assert!(record.is_successful());
        assert!(record.extraction.is_some());
        assert!(record.sections.is_some());
        assert_eq!(pipeline.store().record_count(), 1);
    }

    #[tokio::test]
    async fn incremental_rerun_is_skipped() {
        let pipeline = MdaPipeline::new(MemoryStore::new());
        let report = sample_report();

        pipeline.process("600000", 2023, &report).await.unwrap();
        let second = pipeline.process("600000", 2023, &report).await.unwrap();
        assert!(matches!(second, ProcessOutcome::Skipped));
        assert_eq!(pipeline.store().record_count(), 1);
    }

    #[tokio::test]
    async fn changed_content_is_reprocessed() {
        let pipeline = MdaPipeline::new(MemoryStore::new());
        let report = sample_report();
        pipeline.process("600000", 2023, &report).await.unwrap();

        let mut changed = report.clone();
        changed.pages.push("补充页".to_string());
        let outcome = pipeline.process("600000", 2023, &changed).await.unwrap();
        assert!(matches!(outcome, ProcessOutcome::Processed(_)));
        assert_eq!(pipeline.store().record_count(), 2);
    }

    #[tokio::test]
    async fn failed_extraction_still_writes_a_record() {
        let pipeline = MdaPipeline::new(MemoryStore::new());
        let pages: Vec<String> = (0..3).map(|i| format!("无关内容第{i}页")).collect();
        let set = PageSet::new(pages, PageBreakKind::FormFeed);

        let outcome = pipeline.process("600000", 2023, &set).await.unwrap();
        let record = outcome.record().expect("processed");

        assert!(!record.is_successful());
        assert!(record.extraction.is_none());
        assert_eq!(record.quality.score, 0);
        assert!(record.quality.needs_review);
        assert_eq!(pipeline.strategy_stats()["generic"].attempts, 1);
        assert_eq!(pipeline.strategy_stats()["generic"].successes, 0);
    }

    #[tokio::test]
    async fn failed_rerun_is_not_skipped() {
        let pipeline = MdaPipeline::new(MemoryStore::new());
        let set = PageSet::new(vec!["无关内容".to_string()], PageBreakKind::FormFeed);

        pipeline.process("600000", 2023, &set).await.unwrap();
        let second = pipeline.process("600000", 2023, &set).await.unwrap();
        // Failure records never satisfy the incremental check.
        assert!(matches!(second, ProcessOutcome::Processed(_)));
    }

    #[tokio::test]
    async fn llm_learned_rule_attributes_to_its_own_key() {
        let store = MemoryStore::new();
        let rule = ExtractionRule::new(
            "600000",
            2023,
            "管理层讨论与分析",
            RuleSource::LlmLearned,
        );
        store.upsert_rule(&rule).await.unwrap();

        let pipeline = MdaPipeline::new(store);
        pipeline
            .process("600000", 2023, &sample_report())
            .await
            .unwrap();

        let stats = pipeline.strategy_stats();
        assert_eq!(stats["llm_learned"].attempts, 1);
        assert_eq!(stats["llm_learned"].successes, 1);
        assert_eq!(stats["custom"].attempts, 0);
    }

    #[tokio::test]
    async fn identical_prior_year_text_raises_no_yoy_flag() {
        let pipeline = MdaPipeline::new(MemoryStore::new());

        pipeline
            .process("600000", 2022, &sample_report())
            .await
            .unwrap();
        let processed = pipeline
            .process("600000", 2023, &sample_report())
            .await
            .unwrap();

        let record = processed.record().expect("processed");
        assert!(!record
            .extraction
            .as_ref()
            .unwrap()
            .quality_flags
            .contains(&QualityFlag::YoyChangeHigh));
    }
}
