//! Prompt templates for LLM evaluation and refinement.

use crate::types::ExtractionResult;

/// Chars of extracted text shown to the evaluator.
pub const EVALUATION_PREVIEW_CHARS: usize = 5000;

/// System prompt shared by all MD&A analysis calls.
pub const SYSTEM_PROMPT: &str = "你是一个专业的中国上市公司年报分析助手。你的任务是帮助识别和提取年报中的\"管理层讨论与分析\"(MD&A) 章节。

你需要遵循以下原则:
1. 精确识别章节边界，不遗漏重要内容
2. 排除目录页、财务报表等无关内容
3. 输出严格的 JSON 格式，便于程序解析
";

/// Prompt asking the model to grade an extraction on the four-part
/// rubric (completeness/accuracy 0-30, cleanliness/structure 0-20).
pub fn format_evaluate_prompt(entity_id: &str, year: i32, extraction: &ExtractionResult) -> String {
    let preview: String = extraction
        .text
        .chars()
        .take(EVALUATION_PREVIEW_CHARS)
        .collect();

    format!(
        r#"评估以下 MD&A 提取结果的质量。

## 提取结果
- 股票代码: {entity_id}
- 年份: {year}
- 字符数: {char_count}
- 使用策略: {strategy}

## 提取文本 (前 5000 字符)
{preview}

## 评估维度
1. **完整性** (0-30分): MD&A 内容是否完整，有无明显遗漏
2. **准确性** (0-30分): 边界是否准确，有无包含无关内容（如财务报表、目录页）
3. **清洁度** (0-20分): 有无噪音（表格残留、页眉页脚、乱码）
4. **结构性** (0-20分): 是否保持原文结构，段落分隔是否合理

## 输出格式 (JSON)
```json
{{
  "scores": {{
    "completeness": N,
    "accuracy": N,
    "cleanliness": N,
    "structure": N
  }},
  "total_score": N,
  "issues": ["问题1", "问题2"],
  "suggestions": ["改进建议1", "改进建议2"],
  "pass": true/false
}}
```
"#,
        char_count = extraction.char_count(),
        strategy = extraction.strategy,
    )
}

/// Prompt asking the model to repair the start/end heading patterns
/// given the evaluator's feedback and a boundary context snippet.
pub fn format_refine_prompt(
    extraction: &ExtractionResult,
    quality_score: f64,
    issues: &[String],
    suggestions: &[String],
    context_snippet: &str,
) -> String {
    let current_start = if extraction.hit_start.is_empty() {
        "未知"
    } else {
        &extraction.hit_start
    };
    let current_end = extraction.hit_end.as_deref().unwrap_or("未知");
    let feedback = bullet_list(issues);
    let diagnosis = bullet_list(suggestions);

    format!(
        r#"你之前的 MD&A 提取结果存在问题，请根据反馈进行改进。

## 当前提取结果
- 起始标题: {current_start}
- 结束标题: {current_end}
- 提取文本长度: {char_count} 字符
- 质量评分: {quality_score}/100

## 评估反馈
{feedback}

## 问题诊断
{diagnosis}

## 年报原文片段 (前后文)
{context_snippet}

## 任务
根据以上反馈，修正起始和结束标题模式。

## 输出格式 (JSON)
```json
{{
  "refined_start_pattern": "修正后的起始标题",
  "refined_end_pattern": "修正后的结束标题",
  "changes_made": "做了哪些修改",
  "expected_improvement": "预期改进效果"
}}
```
"#,
        char_count = extraction.char_count(),
    )
}

/// Prompt asking the model to locate the MD&A boundaries from a TOC.
pub fn format_toc_analysis_prompt(
    entity_id: &str,
    year: i32,
    category: &str,
    toc_content: &str,
) -> String {
    format!(
        r#"分析以下年报目录结构，识别"管理层讨论与分析"(MD&A) 章节的边界。

## 年报信息
- 股票代码: {entity_id}
- 年份: {year}
- 行业: {category}

## 目录内容
{toc_content}

## 任务
1. 找出 MD&A 章节的起始标题（通常是"第X节 管理层讨论与分析"或"第X节 董事会报告"）
2. 找出下一章节的标题作为结束边界
3. 提取目录中标注的页码范围

## 输出格式 (JSON)
```json
{{
  "start_pattern": "章节标题正则表达式",
  "end_pattern": "下一章节标题正则表达式",
  "toc_start_page": 起始页码,
  "toc_end_page": 结束页码,
  "confidence": 0.0-1.0,
  "reasoning": "判断依据"
}}
```
"#
    )
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PageBreakKind, QualityDetail, ScoreDetail, Strategy};

    fn dummy_extraction() -> ExtractionResult {
        ExtractionResult {
            text: "正文".repeat(100),
            score: 0.9,
            score_detail: ScoreDetail {
                keyword_hit_count: 5,
                keyword_total: 7,
                dots_count: 0,
                length: 200,
            },
            page_index_start: 3,
            page_index_end: 10,
            page_count: 7,
            printed_page_start: None,
            printed_page_end: None,
            hit_start: "第四节 管理层讨论与分析".to_string(),
            hit_end: None,
            is_truncated: false,
            truncation_reason: None,
            strategy: Strategy::Generic,
            quality_flags: vec![],
            quality_detail: QualityDetail::empty(PageBreakKind::FormFeed),
        }
    }

    #[test]
    fn evaluate_prompt_includes_context() {
        let prompt = format_evaluate_prompt("600000", 2023, &dummy_extraction());
        assert!(prompt.contains("600000"));
        assert!(prompt.contains("2023"));
        assert!(prompt.contains("generic"));
        assert!(prompt.contains("total_score"));
    }

    #[test]
    fn refine_prompt_uses_placeholder_for_missing_end() {
        let extraction = dummy_extraction();
        let prompt = format_refine_prompt(
            &extraction,
            45.0,
            &["包含目录页".to_string()],
            &["跳过目录页".to_string()],
            "=== 第 3 页 ===",
        );
        assert!(prompt.contains("结束标题: 未知"));
        assert!(prompt.contains("- 包含目录页"));
        assert!(prompt.contains("refined_start_pattern"));
    }
}
