//! The 0-100 quality gate.

use tracing::debug;

use crate::scoring::negative::{
    detect_header_noise, detect_table_residue, garbled_ratio, GARBLED_PENALTY, GARBLED_RATIO_MAX,
    HEADER_NOISE_PENALTY, TABLE_RESIDUE_PENALTY,
};
use crate::scoring::scorer::count_dots;
use crate::types::page::PageBreakKind;
use crate::types::{
    Penalty, QualityDetail, QualityFlag, QualityScore, ScoreDetail, NEEDS_REVIEW_THRESHOLD,
};

/// Dotted-leader count at or above which the dots penalty applies.
const DOTS_PENALTY_THRESHOLD: usize = 10;
const DOTS_PENALTY: u32 = 20;

/// Plausible MD&A length range in characters.
const LENGTH_MIN: usize = 1000;
const LENGTH_MAX: usize = 50_000;

/// Tail window (chars) checked for next-section bleed-through.
const TAIL_WINDOW: usize = 500;

/// Anchor words expected in real MD&A prose.
const ANCHOR_WORDS: &[&str] = &["收入", "利润", "同比"];
/// Headings that signal the following section leaked into the tail.
const TAIL_MARKERS: &[&str] = &["监事会", "审计报告"];

/// Compute per-candidate quality flags and diagnostic detail.
pub fn candidate_flags(
    text: &str,
    page_break_kind: PageBreakKind,
) -> (Vec<QualityFlag>, QualityDetail) {
    let mut flags = Vec::new();
    let char_count = text.chars().count();

    if page_break_kind == PageBreakKind::None {
        flags.push(QualityFlag::PageBoundaryMissing);
    }

    if char_count < LENGTH_MIN || char_count > LENGTH_MAX {
        flags.push(QualityFlag::LengthAbnormal);
    }

    let anchor_hit_count = ANCHOR_WORDS.iter().filter(|w| text.contains(*w)).count();
    if anchor_hit_count < 2 {
        flags.push(QualityFlag::ContentMismatch);
    }

    let tail: String = if char_count > TAIL_WINDOW {
        text.chars().skip(char_count - TAIL_WINDOW).collect()
    } else {
        text.to_string()
    };
    if TAIL_MARKERS.iter().any(|m| tail.contains(m)) {
        flags.push(QualityFlag::TailOverlap);
    }

    let detail = QualityDetail {
        page_break_kind,
        char_count,
        anchor_hit_count,
        toc_body_page_distance: None,
        score_detail: None,
        note: None,
    };

    (flags, detail)
}

/// Aggregate flags and negative features into a 0-100 verdict.
///
/// Starts at 100 and deducts per flag, for dense dotted leaders, and for
/// each detected negative feature, flooring at 0. Empty text is an
/// unconditional `(0, needs_review)`.
pub fn calculate_quality_score(
    text: &str,
    flags: &[QualityFlag],
    score_detail: Option<&ScoreDetail>,
) -> QualityScore {
    if text.is_empty() {
        return QualityScore {
            score: 0,
            needs_review: true,
            penalties: vec![Penalty::new("empty_text", 100)],
        };
    }

    let mut penalties: Vec<Penalty> = Vec::new();

    for flag in flags {
        penalties.push(Penalty::new(flag.as_str(), flag.penalty()));
    }

    let dots_count = score_detail
        .map(|d| d.dots_count)
        .unwrap_or_else(|| count_dots(text));
    if dots_count >= DOTS_PENALTY_THRESHOLD {
        penalties.push(Penalty::new("dense_dotted_leaders", DOTS_PENALTY));
    }

    if detect_table_residue(text) {
        penalties.push(Penalty::new("table_residue", TABLE_RESIDUE_PENALTY));
    }
    if detect_header_noise(text) {
        penalties.push(Penalty::new("header_noise", HEADER_NOISE_PENALTY));
    }
    if garbled_ratio(text) > GARBLED_RATIO_MAX {
        penalties.push(Penalty::new("garbled_text", GARBLED_PENALTY));
    }

    let total: u32 = penalties.iter().map(|p| p.points).sum();
    let score = 100u32.saturating_sub(total) as u8;
    let needs_review = score < NEEDS_REVIEW_THRESHOLD;

    debug!(score, needs_review, penalty_count = penalties.len(), "quality gate");

    QualityScore {
        score,
        needs_review,
        penalties,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_mda_text() -> String {
        let para = "公司报告期内实现营业收入增长，利润同比上升，主营业务稳定。";
        para.repeat(60)
    }

    #[test]
    fn clean_text_scores_full_marks() {
        let text = clean_mda_text();
        let quality = calculate_quality_score(&text, &[], None);
        assert_eq!(quality.score, 100);
        assert!(!quality.needs_review);
        assert!(quality.penalties.is_empty());
    }

    #[test]
    fn empty_text_is_zero_and_needs_review() {
        let quality = calculate_quality_score("", &[QualityFlag::ExtractFailed], None);
        assert_eq!(quality.score, 0);
        assert!(quality.needs_review);
    }

    #[test]
    fn flag_penalties_accumulate() {
        let text = clean_mda_text();
        let quality = calculate_quality_score(
            &text,
            &[QualityFlag::LengthAbnormal, QualityFlag::ContentMismatch],
            None,
        );
        assert_eq!(quality.score, 75);
        assert!(!quality.needs_review);
    }

    #[test]
    fn score_floors_at_zero() {
        let text = clean_mda_text();
        let flags = [
            QualityFlag::ExtractFailed,
            QualityFlag::ContentMismatch,
            QualityFlag::TailOverlap,
        ];
        let quality = calculate_quality_score(&text, &flags, None);
        assert_eq!(quality.score, 0);
        assert!(quality.needs_review);
    }

    #[test]
    fn dense_dots_penalized_via_score_detail() {
        let text = clean_mda_text();
        let detail = ScoreDetail {
            keyword_hit_count: 5,
            keyword_total: 7,
            dots_count: 25,
            length: text.chars().count(),
        };
        let quality = calculate_quality_score(&text, &[], Some(&detail));
        assert_eq!(quality.score, 80);
    }

    #[test]
    fn needs_review_below_sixty() {
        let text = clean_mda_text();
        let flags = [
            QualityFlag::ContentMismatch,
            QualityFlag::TocMismatch,
            QualityFlag::TailOverlap,
            QualityFlag::LengthAbnormal,
        ];
        let quality = calculate_quality_score(&text, &flags, None);
        assert_eq!(quality.score, 55);
        assert!(quality.needs_review);
    }

    #[test]
    fn candidate_flags_on_short_mismatched_text() {
        let (flags, detail) = candidate_flags("太短", PageBreakKind::None);
        assert!(flags.contains(&QualityFlag::PageBoundaryMissing));
        assert!(flags.contains(&QualityFlag::LengthAbnormal));
        assert!(flags.contains(&QualityFlag::ContentMismatch));
        assert_eq!(detail.anchor_hit_count, 0);
    }

    #[test]
    fn tail_overlap_detected_in_last_window() {
        let body = "收入与利润同比增长。".repeat(200);
        let text = format!("{body}\n监事会报告");
        let (flags, _) = candidate_flags(&text, PageBreakKind::FormFeed);
        assert!(flags.contains(&QualityFlag::TailOverlap));
    }
}
