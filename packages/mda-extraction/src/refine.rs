//! Self-refine loop: extract, have an LLM grade the result, and repair
//! the boundary patterns until the grade clears the threshold or the
//! iteration budget runs out.

use std::sync::Arc;

use llm_client::{CompleteOptions, CompletionRequest, LlmClient, LlmError};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::pipeline::strategy::{extract, ExtractOptions};
use crate::prompts::{format_evaluate_prompt, format_refine_prompt, SYSTEM_PROMPT};
use crate::types::{ExtractionResult, ExtractionRule, PageSet, RuleSource};

/// Default iteration budget.
pub const MAX_ITERATIONS_DEFAULT: usize = 3;
/// Default rubric score (out of 100) that counts as good enough.
pub const SCORE_THRESHOLD_DEFAULT: f64 = 70.0;

/// Chars of each boundary page shown in the refinement context.
const CONTEXT_PAGE_CHARS: usize = 1000;

/// One evaluate/refine round.
#[derive(Debug, Clone)]
pub struct RefineIteration {
    /// 1-based iteration number
    pub iteration: usize,
    /// Rubric total score the evaluator returned
    pub score: f64,
    pub issues: Vec<String>,
    /// Pattern overrides in effect during this iteration
    pub start_pattern: Option<String>,
    pub end_pattern: Option<String>,
}

/// Outcome of a refine run. Partial progress is always kept: a failed
/// run still carries its last extraction and the full history.
#[derive(Debug, Clone)]
pub struct RefineResult {
    pub success: bool,
    pub extraction: Option<ExtractionResult>,
    pub iterations: usize,
    pub final_score: f64,
    pub history: Vec<RefineIteration>,
}

#[derive(Debug, Default, Deserialize)]
struct Evaluation {
    #[serde(default)]
    total_score: f64,
    #[serde(default)]
    issues: Vec<String>,
    #[serde(default)]
    suggestions: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Refinement {
    refined_start_pattern: Option<String>,
    refined_end_pattern: Option<String>,
}

/// Iterative extract-evaluate-refine controller.
pub struct SelfRefineLoop {
    llm: Arc<LlmClient>,
    llm_options: CompleteOptions,
    max_iterations: usize,
    score_threshold: f64,
    extract_options: ExtractOptions,
}

impl SelfRefineLoop {
    pub fn new(llm: Arc<LlmClient>) -> Self {
        Self {
            llm,
            llm_options: CompleteOptions::default(),
            max_iterations: MAX_ITERATIONS_DEFAULT,
            score_threshold: SCORE_THRESHOLD_DEFAULT,
            extract_options: ExtractOptions::default(),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_score_threshold(mut self, score_threshold: f64) -> Self {
        self.score_threshold = score_threshold;
        self
    }

    pub fn with_llm_options(mut self, options: CompleteOptions) -> Self {
        self.llm_options = options;
        self
    }

    /// Run the loop for one document.
    ///
    /// Each round extracts (with the current pattern overrides), asks the
    /// evaluator for a rubric score, and either stops at the threshold or
    /// asks for repaired patterns. An unparseable evaluation degrades to
    /// score 0 and the loop continues; an unparseable refinement aborts
    /// early, preserving history.
    pub async fn refine(
        &self,
        page_set: &PageSet,
        entity_id: &str,
        year: i32,
        initial_extraction: Option<ExtractionResult>,
    ) -> Result<RefineResult> {
        let mut history: Vec<RefineIteration> = Vec::new();
        let mut current = initial_extraction;
        let mut start_pattern: Option<String> = None;
        let mut end_pattern: Option<String> = None;

        for iteration in 0..self.max_iterations {
            if current.is_none() {
                let rule = start_pattern.as_ref().map(|sp| {
                    let mut rule =
                        ExtractionRule::new(entity_id, year, sp.clone(), RuleSource::LlmLearned);
                    if let Some(ep) = &end_pattern {
                        rule = rule.with_end_pattern(ep.clone());
                    }
                    rule
                });
                current = extract(page_set, rule.as_ref(), &self.extract_options)?;
            }

            let Some(extraction) = current.as_ref() else {
                warn!(entity = entity_id, year, "nothing to refine, extraction failed");
                return Ok(RefineResult {
                    success: false,
                    extraction: None,
                    iterations: iteration + 1,
                    final_score: 0.0,
                    history,
                });
            };

            let evaluation = self.evaluate(entity_id, year, extraction).await?;
            let score = evaluation.total_score;

            history.push(RefineIteration {
                iteration: iteration + 1,
                score,
                issues: evaluation.issues.clone(),
                start_pattern: start_pattern.clone(),
                end_pattern: end_pattern.clone(),
            });

            if score >= self.score_threshold {
                info!(entity = entity_id, year, iteration = iteration + 1, score, "refine passed");
                return Ok(RefineResult {
                    success: true,
                    extraction: current,
                    iterations: iteration + 1,
                    final_score: score,
                    history,
                });
            }

            if iteration < self.max_iterations - 1 {
                match self.request_refinement(extraction, &evaluation, page_set).await? {
                    Some(refinement) => {
                        debug!(
                            entity = entity_id,
                            year,
                            start = ?refinement.refined_start_pattern,
                            "applying refined patterns"
                        );
                        start_pattern = refinement.refined_start_pattern;
                        end_pattern = refinement.refined_end_pattern;
                        current = None; // re-extract next round
                    }
                    None => break, // refinement unusable, keep what we have
                }
            }
        }

        let final_score = history.last().map(|h| h.score).unwrap_or(0.0);
        Ok(RefineResult {
            success: false,
            extraction: current,
            iterations: self.max_iterations,
            final_score,
            history,
        })
    }

    /// Rubric evaluation; degraded (score 0) when the LLM output is
    /// unparseable or every provider failed.
    async fn evaluate(
        &self,
        entity_id: &str,
        year: i32,
        extraction: &ExtractionResult,
    ) -> Result<Evaluation> {
        let request = CompletionRequest::new(format_evaluate_prompt(entity_id, year, extraction))
            .system(SYSTEM_PROMPT)
            .temperature(0.3);

        match self.llm.complete_json(&request, &self.llm_options).await {
            Ok(value) => Ok(parse_evaluation(value)),
            Err(e @ (LlmError::JsonParse { .. } | LlmError::AllProvidersFailed(_))) => {
                warn!(error = %e, "evaluation degraded");
                Ok(Evaluation {
                    total_score: 0.0,
                    issues: vec!["评估失败".to_string()],
                    suggestions: Vec::new(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Ask for repaired patterns; `Ok(None)` when the answer is
    /// unusable and the loop should stop early.
    async fn request_refinement(
        &self,
        extraction: &ExtractionResult,
        evaluation: &Evaluation,
        page_set: &PageSet,
    ) -> Result<Option<Refinement>> {
        let context = context_snippet(&page_set.pages, extraction);
        let prompt = format_refine_prompt(
            extraction,
            evaluation.total_score,
            &evaluation.issues,
            &evaluation.suggestions,
            &context,
        );
        let request = CompletionRequest::new(prompt)
            .system(SYSTEM_PROMPT)
            .temperature(0.5);

        match self.llm.complete_json(&request, &self.llm_options).await {
            Ok(value) => Ok(Some(
                serde_json::from_value(value).unwrap_or_default(),
            )),
            Err(e @ (LlmError::JsonParse { .. } | LlmError::AllProvidersFailed(_))) => {
                warn!(error = %e, "refinement unusable, aborting loop");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn parse_evaluation(value: Value) -> Evaluation {
    serde_json::from_value(value).unwrap_or_default()
}

fn head_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn tail_chars(text: &str, max: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(max)).collect()
}

/// Boundary context shown to the refiner: heads of the first pages of
/// the span and tails of the last ones, with the middle elided.
fn context_snippet(pages: &[String], extraction: &ExtractionResult) -> String {
    let start_idx = extraction.page_index_start.saturating_sub(1);
    let end_idx = pages.len().min(extraction.page_index_end + 1);

    let mut parts: Vec<String> = Vec::new();

    for i in start_idx..(start_idx + 2).min(pages.len()) {
        parts.push(format!(
            "=== 第 {} 页 ===\n{}",
            i + 1,
            head_chars(&pages[i], CONTEXT_PAGE_CHARS)
        ));
    }

    if end_idx.saturating_sub(start_idx) > 4 {
        parts.push("... [中间内容省略] ...".to_string());
    }

    let tail_from = (start_idx + 2).max(end_idx.saturating_sub(2));
    for i in tail_from..end_idx {
        if i < pages.len() {
            parts.push(format!(
                "=== 第 {} 页 ===\n{}",
                i + 1,
                tail_chars(&pages[i], CONTEXT_PAGE_CHARS)
            ));
        }
    }

    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_report;
    use llm_client::testing::ScriptedProvider;
    use llm_client::Provider;

    fn loop_with(providers: Vec<Arc<dyn Provider>>) -> SelfRefineLoop {
        SelfRefineLoop::new(Arc::new(LlmClient::new(providers)))
    }

    fn eval_json(score: u32) -> String {
        format!(
            "```json\n{{\"total_score\": {score}, \"issues\": [\"边界不准\"], \"suggestions\": [\"调整结束标题\"]}}\n```"
        )
    }

    #[tokio::test]
    async fn passes_first_iteration_on_high_score() {
        let provider = Arc::new(ScriptedProvider::new("deepseek").with_content(eval_json(85)));
        let refine = loop_with(vec![provider]);

        let result = refine
            .refine(&sample_report(), "600000", 2023, None)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.final_score, 85.0);
        assert!(result.extraction.is_some());
        assert_eq!(result.history.len(), 1);
    }

    #[tokio::test]
    async fn low_score_triggers_refinement_round() {
        let provider = Arc::new(
            ScriptedProvider::new("deepseek")
                .with_content(eval_json(40))
                .with_content(
                    "```json\n{\"refined_start_pattern\": \"管理层讨论与分析\", \"refined_end_pattern\": \"监事会报告\"}\n```",
                )
                .with_content(eval_json(90)),
        );
        let refine = loop_with(vec![provider]);

        let result = refine
            .refine(&sample_report(), "600000", 2023, None)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.iterations, 2);
        assert_eq!(result.history.len(), 2);
        assert_eq!(
            result.history[1].start_pattern.as_deref(),
            Some("管理层讨论与分析")
        );
    }

    #[tokio::test]
    async fn unparseable_evaluation_degrades_and_continues() {
        let provider = Arc::new(
            ScriptedProvider::new("deepseek")
                .with_content("I cannot answer in JSON")
                .with_content(
                    "```json\n{\"refined_start_pattern\": \"管理层讨论与分析\"}\n```",
                )
                .with_content(eval_json(75)),
        );
        let refine = loop_with(vec![provider]);

        let result = refine
            .refine(&sample_report(), "600000", 2023, None)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.history[0].score, 0.0);
        assert_eq!(result.history[0].issues, vec!["评估失败".to_string()]);
    }

    #[tokio::test]
    async fn unparseable_refinement_aborts_keeping_history() {
        let provider = Arc::new(
            ScriptedProvider::new("deepseek")
                .with_content(eval_json(40))
                .with_content("no json here"),
        );
        let refine = loop_with(vec![provider]);

        let result = refine
            .refine(&sample_report(), "600000", 2023, None)
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.history.len(), 1);
        assert_eq!(result.final_score, 40.0);
        assert!(result.extraction.is_some());
    }

    #[tokio::test]
    async fn all_providers_down_degrades_every_round() {
        let provider = Arc::new(ScriptedProvider::always_failing("deepseek"));
        let refine = loop_with(vec![provider]);

        let result = refine
            .refine(&sample_report(), "600000", 2023, None)
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.final_score, 0.0);
        assert!(!result.history.is_empty());
    }
}
