//! Candidate generation and selection.
//!
//! Three generators each propose an MD&A span: a generic heading scan, a
//! TOC-mapped page range, and a persisted per-document rule. Candidates
//! are scored and the best one wins, with a cross-check flag when the TOC
//! and heading scans disagree about where the section starts.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{MdaError, Result};
use crate::pipeline::headings::{
    apply_limits, compile_title_regex, extract_between, find_end_hits, find_heading_hits,
    is_toc_page, looks_like_heading, truncate_chars, SECTION_LEVEL_RE, TOC_DOTLINE_RE,
};
use crate::scoring::quality::candidate_flags;
use crate::scoring::scorer::{mda_score, MDA_PATTERNS, MDA_TITLES, NEXT_TITLES};
use crate::types::{
    ExtractionResult, ExtractionRule, PageSet, QualityFlag, Strategy, TocHit, TruncationReason,
};

/// Default page-window limit for one extraction.
pub const MAX_PAGES_DEFAULT: usize = 15;
/// Default character limit for one extraction.
pub const MAX_CHARS_DEFAULT: usize = 120_000;

/// Winning candidates scoring at or below this are rejected outright.
const MIN_ACCEPT_SCORE: f64 = 0.4;

/// TOC vs heading-scan start distance (pages) beyond which the winner is
/// flagged.
const TOC_MISMATCH_MAX_PAGES: usize = 2;

/// First pages scanned for a TOC block.
const TOC_SCAN_PAGES: usize = 15;

static MDA_PATTERN_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    MDA_PATTERNS
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

static TRAILING_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*$").unwrap());

/// Extraction limits.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    pub max_pages: usize,
    pub max_chars: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_pages: MAX_PAGES_DEFAULT,
            max_chars: MAX_CHARS_DEFAULT,
        }
    }
}

/// Run all applicable generators and pick the best candidate.
///
/// `Ok(None)` means no generator produced an acceptable span; an empty
/// page set is a malformed input and fails fast.
pub fn extract(
    page_set: &PageSet,
    rule: Option<&ExtractionRule>,
    options: &ExtractOptions,
) -> Result<Option<ExtractionResult>> {
    if page_set.is_empty() {
        return Err(MdaError::EmptyPageSet);
    }

    let mut candidates: Vec<ExtractionResult> = Vec::new();

    if let Some(rule) = rule {
        if let Some(custom) = custom_candidate(page_set, rule, options) {
            candidates.push(custom);
        }
    }

    if let Some(toc) = toc_candidate(page_set, options) {
        candidates.push(toc);
    }

    if let Some(generic) = generic_candidate(page_set, options) {
        candidates.push(generic);
    }

    if candidates.is_empty() {
        return Ok(None);
    }

    // Cross-check: a large disagreement between the TOC range and the
    // heading scan casts doubt on whichever wins.
    let toc_start = candidates
        .iter()
        .find(|c| c.strategy == Strategy::Toc)
        .map(|c| c.page_index_start);
    let body_start = candidates
        .iter()
        .find(|c| c.strategy == Strategy::Generic)
        .map(|c| c.page_index_start);
    let toc_body_distance = match (toc_start, body_start) {
        (Some(t), Some(b)) => Some(t.abs_diff(b)),
        _ => None,
    };

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.text.chars().count().cmp(&a.text.chars().count()))
    });
    let mut best = candidates.swap_remove(0);

    if best.score <= MIN_ACCEPT_SCORE {
        debug!(score = best.score, strategy = %best.strategy, "best candidate rejected");
        return Ok(None);
    }

    if let Some(distance) = toc_body_distance {
        if distance > TOC_MISMATCH_MAX_PAGES {
            best.quality_flags.push(QualityFlag::TocMismatch);
            best.quality_detail.toc_body_page_distance = Some(distance);
        }
    }

    debug!(
        strategy = %best.strategy,
        score = best.score,
        pages = best.page_count,
        chars = best.quality_detail.char_count,
        "candidate selected"
    );
    Ok(Some(best))
}

fn build_result(
    page_set: &PageSet,
    text: String,
    score_input: (f64, crate::types::ScoreDetail),
    span: (usize, usize),
    printed: (Option<u32>, Option<u32>),
    hit_start: String,
    hit_end: Option<String>,
    truncation: (bool, Option<TruncationReason>),
    strategy: Strategy,
) -> ExtractionResult {
    let (score, score_detail) = score_input;
    let (page_index_start, page_index_end) = span;
    let (quality_flags, quality_detail) = candidate_flags(&text, page_set.page_break_kind);

    ExtractionResult {
        text,
        score,
        score_detail,
        page_index_start,
        page_index_end,
        page_count: page_index_end - page_index_start,
        printed_page_start: printed.0,
        printed_page_end: printed.1,
        hit_start,
        hit_end,
        is_truncated: truncation.0,
        truncation_reason: truncation.1,
        strategy,
        quality_flags,
        quality_detail,
    }
}

/// Generic heading scan: find the best-scoring MD&A start heading, then
/// the first next-section heading inside the page window.
pub fn generic_candidate(
    page_set: &PageSet,
    options: &ExtractOptions,
) -> Option<ExtractionResult> {
    let pages = &page_set.pages;
    let title_re = compile_title_regex(MDA_TITLES);

    let start_hits = find_heading_hits(pages, title_re.as_ref(), &MDA_PATTERN_RES);
    if start_hits.is_empty() {
        return None;
    }

    // Choose the start whose following content looks most like MD&A;
    // chapter-level headings get a bonus over inline mentions.
    let mut best_start: Option<&(usize, usize, String)> = None;
    let mut best_anchor_score = -1.0f64;
    for hit in &start_hits {
        let (page_index, line_index, line_text) = hit;
        let (snippet, _, _, _, _) =
            apply_limits(pages, *page_index, *line_index, 2, 2000, None, None);
        let (mut score, _) = mda_score(&snippet, None);
        if SECTION_LEVEL_RE.is_match(line_text.trim()) {
            score += 0.5;
        }
        if score > best_anchor_score {
            best_anchor_score = score;
            best_start = Some(hit);
        }
    }

    let (start_page_index, start_line_index, hit_start) = best_start?.clone();

    let max_page_index_exclusive = pages.len().min(start_page_index + options.max_pages);
    let end_hits = find_end_hits(
        pages,
        start_page_index,
        start_line_index,
        NEXT_TITLES,
        max_page_index_exclusive,
    );
    let (end_page_index, end_line_index, hit_end) = match end_hits.into_iter().next() {
        Some((p, l, t)) => (Some(p), Some(l), Some(t)),
        None => (None, None, None),
    };

    let (text, start, end, is_truncated, truncation_reason) = apply_limits(
        pages,
        start_page_index,
        start_line_index,
        options.max_pages,
        options.max_chars,
        end_page_index,
        end_line_index,
    );

    let scored = mda_score(&text, None);
    Some(build_result(
        page_set,
        text,
        scored,
        (start, end),
        (None, None),
        hit_start,
        hit_end,
        (is_truncated, truncation_reason),
        Strategy::Generic,
    ))
}

/// Parse the TOC block for the MD&A printed page range and map it to
/// physical indices via the page-number sidecar.
pub fn parse_toc_for_page_range(page_set: &PageSet, scan_pages: usize) -> Option<TocHit> {
    let pages = &page_set.pages;
    if pages.is_empty() {
        return None;
    }

    let title_re = compile_title_regex(MDA_TITLES)?;
    let next_re = compile_title_regex(NEXT_TITLES)?;

    let toc_text: String = pages
        .iter()
        .take(scan_pages)
        .filter(|p| is_toc_page(p))
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    if toc_text.is_empty() {
        return None;
    }

    let mut printed_start: Option<u32> = None;
    let mut printed_end: Option<u32> = None;

    for line in toc_text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !TOC_DOTLINE_RE.is_match(line) {
            continue;
        }
        if printed_start.is_none() && title_re.is_match(line) {
            if let Some(n) = trailing_number(line) {
                printed_start = Some(n);
                continue;
            }
        }
        if printed_start.is_some() && printed_end.is_none() && next_re.is_match(line) {
            if let Some(n) = trailing_number(line) {
                printed_end = Some(n);
                break;
            }
        }
    }

    let printed_start = printed_start?;
    let page_numbers = page_set.page_numbers.as_ref()?;

    let map_printed = |pn: u32| -> Option<usize> {
        page_numbers.iter().position(|p| *p == Some(pn))
    };

    let page_index_start = map_printed(printed_start)?;
    let page_index_end = printed_end.and_then(map_printed);

    Some(TocHit {
        printed_page_start: printed_start,
        printed_page_end: printed_end,
        page_index_start,
        page_index_end,
    })
}

fn trailing_number(line: &str) -> Option<u32> {
    TRAILING_NUMBER_RE
        .captures(line)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// TOC-mapped extraction: take the physical page range the TOC promises.
///
/// Only usable when the TOC lists both boundaries and the printed numbers
/// map back to physical pages in order.
pub fn toc_candidate(page_set: &PageSet, options: &ExtractOptions) -> Option<ExtractionResult> {
    let toc = parse_toc_for_page_range(page_set, TOC_SCAN_PAGES)?;
    let end_index = toc.page_index_end?;

    // Duplicated or misread page markers can map the next-section page to
    // a physical index at or before the start; that range is unusable.
    if end_index <= toc.page_index_start {
        debug!(
            start = toc.page_index_start,
            end = end_index,
            "toc page range out of order, discarding"
        );
        return None;
    }

    let (text, start, end) = extract_between(
        &page_set.pages,
        toc.page_index_start,
        0,
        Some(end_index.saturating_sub(1)),
        None,
    );

    let full_len = text.chars().count();
    let truncated = full_len > options.max_chars;
    let limited_text = if truncated {
        truncate_chars(&text, options.max_chars).to_string()
    } else {
        text
    };

    let scored = mda_score(&limited_text, None);
    Some(build_result(
        page_set,
        limited_text,
        scored,
        (start, end),
        (Some(toc.printed_page_start), toc.printed_page_end),
        "toc".to_string(),
        None,
        (
            truncated,
            truncated.then_some(TruncationReason::MaxChars),
        ),
        Strategy::Toc,
    ))
}

/// Rule-based extraction: literal start/end patterns matched against
/// heading lines only.
pub fn custom_candidate(
    page_set: &PageSet,
    rule: &ExtractionRule,
    options: &ExtractOptions,
) -> Option<ExtractionResult> {
    let pages = &page_set.pages;
    let start_re = Regex::new(&regex::escape(&rule.start_pattern)).ok()?;
    let end_re = rule
        .end_pattern
        .as_deref()
        .map(|p| Regex::new(&regex::escape(p)).ok())
        .unwrap_or(None);

    for (page_index, page_text) in pages.iter().enumerate() {
        for (line_index, line) in page_text.lines().enumerate() {
            if !looks_like_heading(line) || !start_re.is_match(line) {
                continue;
            }

            let mut end_page_index = None;
            let mut end_line_index = None;
            let mut hit_end = None;

            if let Some(end_re) = &end_re {
                'scan: for p in page_index..pages.len().min(page_index + options.max_pages) {
                    let p_lines: Vec<&str> = pages[p].lines().collect();
                    let begin = if p == page_index { line_index + 1 } else { 0 };
                    for (li, cand) in p_lines.iter().enumerate().skip(begin) {
                        if looks_like_heading(cand) && end_re.is_match(cand) {
                            end_page_index = Some(p);
                            end_line_index = Some(li);
                            hit_end = Some(cand.trim().to_string());
                            break 'scan;
                        }
                    }
                }
            }

            let (text, start, end, is_truncated, truncation_reason) = apply_limits(
                pages,
                page_index,
                line_index,
                options.max_pages,
                options.max_chars,
                end_page_index,
                end_line_index,
            );

            let scored = mda_score(&text, None);
            return Some(build_result(
                page_set,
                text,
                scored,
                (start, end),
                (None, None),
                line.trim().to_string(),
                hit_end,
                (is_truncated, truncation_reason),
                Strategy::Custom,
            ));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mda_body_page, sample_report};
    use crate::types::{PageBreakKind, RuleSource};

    #[test]
    fn empty_page_set_fails_fast() {
        let set = PageSet::new(vec![], PageBreakKind::None);
        let err = extract(&set, None, &ExtractOptions::default()).unwrap_err();
        assert!(matches!(err, MdaError::EmptyPageSet));
    }

    #[test]
    fn generic_scan_finds_section_between_headings() {
        let set = sample_report();
        let result = extract(&set, None, &ExtractOptions::default())
            .unwrap()
            .expect("should extract");
        assert!(result.hit_start.contains("管理层讨论与分析"));
        assert!(result.text.contains("主营业务"));
        assert!(!result.text.contains("监事会全体成员"));
        assert!(result.score > MIN_ACCEPT_SCORE);
    }

    #[test]
    fn garbage_pages_yield_none() {
        let pages: Vec<String> = (0..5).map(|i| format!("随意内容第{i}页")).collect();
        let set = PageSet::new(pages, PageBreakKind::FormFeed);
        let result = extract(&set, None, &ExtractOptions::default()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn toc_only_mention_is_not_a_start() {
        // One TOC page listing the section plus body pages without the
        // heading: TOC pages are skipped, so nothing is found.
        let toc = "目录\n第四节 管理层讨论与分析……8\n第五节 公司治理……20";
        let mut pages = vec![toc.to_string()];
        for i in 0..4 {
            pages.push(format!("普通正文第{i}页"));
        }
        let set = PageSet::new(pages, PageBreakKind::FormFeed);
        assert!(extract(&set, None, &ExtractOptions::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn custom_rule_wins_when_present() {
        let set = sample_report();
        let rule = ExtractionRule::new("600000", 2023, "管理层讨论与分析", RuleSource::Custom)
            .with_end_pattern("监事会报告");
        let result = custom_candidate(&set, &rule, &ExtractOptions::default()).unwrap();
        assert_eq!(result.strategy, Strategy::Custom);
        assert_eq!(result.hit_end.as_deref(), Some("第五节 监事会报告"));
    }

    #[test]
    fn toc_candidate_maps_printed_pages() {
        let mut pages = vec![
            "目 录\n第四节 管理层讨论与分析……5\n第五节 监事会报告……8".to_string(),
        ];
        for printed in 2..=9 {
            pages.push(mda_body_page(printed));
        }
        let page_numbers: Vec<Option<u32>> = std::iter::once(Some(1))
            .chain((2..=9).map(Some))
            .collect();
        let set = PageSet::new(pages, PageBreakKind::PageMarker).with_page_numbers(page_numbers);

        let toc = parse_toc_for_page_range(&set, TOC_SCAN_PAGES).expect("toc hit");
        assert_eq!(toc.printed_page_start, 5);
        assert_eq!(toc.printed_page_end, Some(8));
        assert_eq!(toc.page_index_start, 4);
        assert_eq!(toc.page_index_end, Some(7));

        let candidate = toc_candidate(&set, &ExtractOptions::default()).expect("candidate");
        assert_eq!(candidate.strategy, Strategy::Toc);
        assert_eq!(candidate.page_index_start, 4);
        assert_eq!(candidate.page_index_end, 7); // exclusive, ends before printed 8
    }

    #[test]
    fn out_of_order_page_numbers_yield_no_toc_candidate() {
        // Misread page markers place printed 8 physically before printed 5,
        // so the mapped range runs backwards and must be discarded.
        let mut pages = vec![
            "目 录\n第四节 管理层讨论与分析……5\n第五节 监事会报告……8".to_string(),
        ];
        for _ in 0..4 {
            pages.push("正文片段".to_string());
        }
        let page_numbers = vec![None, Some(8), None, Some(5), None];
        let set = PageSet::new(pages, PageBreakKind::PageMarker).with_page_numbers(page_numbers);

        let toc = parse_toc_for_page_range(&set, TOC_SCAN_PAGES).expect("toc hit");
        assert_eq!(toc.page_index_start, 3);
        assert_eq!(toc.page_index_end, Some(1));

        assert!(toc_candidate(&set, &ExtractOptions::default()).is_none());
        // And the full selection path stays panic-free on this input.
        assert!(extract(&set, None, &ExtractOptions::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn toc_without_page_numbers_yields_no_candidate() {
        let pages = vec![
            "目 录\n第四节 管理层讨论与分析……5\n第五节 监事会报告……8".to_string(),
            "正文".to_string(),
        ];
        let set = PageSet::new(pages, PageBreakKind::FormFeed);
        assert!(parse_toc_for_page_range(&set, TOC_SCAN_PAGES).is_none());
    }

    #[test]
    fn truncation_reported_when_no_end_heading() {
        let mut pages = vec!["第四节 管理层讨论与分析".to_string()];
        for _ in 0..3 {
            pages.push(mda_body_page(0));
        }
        let set = PageSet::new(pages, PageBreakKind::FormFeed);
        let result = extract(&set, None, &ExtractOptions::default())
            .unwrap()
            .expect("should extract");
        assert!(result.is_truncated);
        assert_eq!(
            result.truncation_reason,
            Some(TruncationReason::EndNotFound)
        );
    }
}
