//! MD&A likelihood scoring and the heading vocabulary.
//!
//! The score answers "how much does this text read like a management
//! discussion section" on a 0.0-1.0 scale: financial keywords are positive
//! evidence, dense dotted leaders (TOC / table contamination) are negative.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::ScoreDetail;

/// Section headings that open an MD&A chapter.
pub const MDA_TITLES: &[&str] = &[
    "董事会报告",
    "董事局报告",
    "经营情况讨论与分析",
    "经营层讨论与分析",
    "管理层讨论与分析",
    "管理层分析与讨论",
    "董事会工作报告",
    "董事局工作报告",
    "经营分析与讨论",
    "讨论与分析",
    "业务回顾",
    "业务回顾与展望",
    "董事会报告书",
    "董事会工作汇报",
    "Management Discussion and Analysis",
    "MD&A",
];

/// Numbered chapter heading patterns for the MD&A chapter.
pub const MDA_PATTERNS: &[&str] = &[
    r"第[一二三四五六七八九十百零\d]+[章节部分]\s*管理层讨论与分析",
    r"第[一二三四五六七八九十百零\d]+[章节部分]\s*董事会报告",
    r"[一二三四五六七八九十百零\d]+[、\.]\s*董事会报告",
    r"[一二三四五六七八九十百零\d]+[、\.]\s*管理层讨论与分析",
];

/// Headings of the sections that typically follow the MD&A chapter.
pub const NEXT_TITLES: &[&str] = &[
    "监事会报告",
    "监事会工作报告",
    "重要事项",
    "公司治理",
    "财务报告",
    "审计报告",
];

/// Default scoring keywords (revenue, YoY, margins, cash flow...).
pub const DEFAULT_KEYWORDS: &[&str] =
    &["主营业务", "收入", "同比", "毛利率", "现金流", "行业", "展望"];

/// Minimum length (chars) before a text can score above zero.
pub const MIN_SCORABLE_CHARS: usize = 500;

static LONG_DOT_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{4,}").unwrap());

/// Count dotted-leader occurrences (ASCII and fullwidth ellipses).
pub fn count_dots(text: &str) -> usize {
    text.matches("...").count()
        + text.matches('…').count()
        + text.matches("……").count()
        + LONG_DOT_RUN_RE.find_iter(text).count()
}

/// Score how MD&A-like a text is, in `0.0..=1.0`.
///
/// Texts under [`MIN_SCORABLE_CHARS`] score 0.0 outright. Otherwise the
/// keyword hit ratio contributes up to 0.8 and a clean text (dotted-leader
/// count under 10) earns the remaining 0.2.
pub fn mda_score(text: &str, keywords: Option<&[&str]>) -> (f64, ScoreDetail) {
    if text.is_empty() {
        return (
            0.0,
            ScoreDetail {
                keyword_hit_count: 0,
                keyword_total: 0,
                dots_count: 0,
                length: 0,
            },
        );
    }

    let length = text.chars().count();
    if length < MIN_SCORABLE_CHARS {
        return (
            0.0,
            ScoreDetail {
                keyword_hit_count: 0,
                keyword_total: 0,
                dots_count: 0,
                length,
            },
        );
    }

    let keywords = keywords.unwrap_or(DEFAULT_KEYWORDS);
    let keyword_hit_count = keywords
        .iter()
        .filter(|k| !k.is_empty() && text.contains(*k))
        .count();
    let keyword_total = keywords.len().max(1);

    let dots_count = count_dots(text);

    let mut score = (keyword_hit_count as f64 / keyword_total as f64) * 0.8;
    if dots_count < 10 {
        score += 0.2;
    }
    let score = score.clamp(0.0, 1.0);

    (
        score,
        ScoreDetail {
            keyword_hit_count,
            keyword_total,
            dots_count,
            length,
        },
    )
}
