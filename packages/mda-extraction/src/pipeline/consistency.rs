//! Year-over-year consistency checking.
//!
//! Two consecutive annual reports from the same company share boilerplate
//! and structure; a near-zero similarity usually means one of the two
//! extractions went wrong.

use std::collections::HashSet;

/// Similarity below this is an abnormal year-over-year change.
pub const YOY_SIMILARITY_THRESHOLD: f64 = 0.3;

fn char_trigrams(text: &str) -> HashSet<String> {
    let chars: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    let mut grams = HashSet::new();
    if chars.is_empty() {
        return grams;
    }
    if chars.len() < 3 {
        grams.insert(chars.iter().collect());
        return grams;
    }
    for window in chars.windows(3) {
        grams.insert(window.iter().collect());
    }
    grams
}

/// Character 3-gram Jaccard similarity, whitespace ignored.
///
/// Identical strings short-circuit to 1.0; either side empty scores 0.0.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let grams_a = char_trigrams(a);
    let grams_b = char_trigrams(b);
    if grams_a.is_empty() || grams_b.is_empty() {
        return 0.0;
    }

    let intersection = grams_a.intersection(&grams_b).count();
    let union = grams_a.union(&grams_b).count();
    intersection as f64 / union as f64
}

/// Check the current extraction against last year's.
///
/// Returns `(is_abnormal, similarity)`. No prior year means nothing to
/// compare: `(false, 1.0)`. An empty side is itself suspicious but is the
/// length checks' problem, so it reports `(false, 0.0)`.
pub fn detect_yoy_change(current: &str, previous: Option<&str>, threshold: f64) -> (bool, f64) {
    let Some(previous) = previous else {
        return (false, 1.0);
    };
    if current.is_empty() || previous.is_empty() {
        return (false, 0.0);
    }

    let similarity = text_similarity(current, previous);
    (similarity < threshold, similarity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_texts_are_fully_similar() {
        assert_eq!(text_similarity("公司经营稳定", "公司经营稳定"), 1.0);
    }

    #[test]
    fn whitespace_differences_are_ignored() {
        assert_eq!(text_similarity("公司 经营 稳定", "公司经营稳定"), 1.0);
    }

    #[test]
    fn disjoint_texts_score_zero() {
        assert_eq!(text_similarity("甲乙丙丁戊己", "一二三四五六"), 0.0);
    }

    #[test]
    fn short_strings_compare_whole() {
        assert_eq!(text_similarity("ab", "ab"), 1.0);
        assert_eq!(text_similarity("ab", "cd"), 0.0);
    }

    #[test]
    fn empty_side_scores_zero() {
        assert_eq!(text_similarity("", "公司"), 0.0);
    }

    #[test]
    fn overlapping_texts_score_between() {
        let a = "报告期内公司实现营业收入十亿元，同比增长百分之五";
        let b = "报告期内公司实现营业收入八亿元，同比下降百分之三";
        let sim = text_similarity(a, b);
        assert!(sim > 0.3 && sim < 1.0, "similarity {sim}");
    }

    #[test]
    fn consecutive_year_reports_stay_above_the_threshold() {
        // Two full-length reports sharing boilerplate, differing only in
        // the reported figures, must read as the same document family.
        fn annual_text(revenue: &str, growth: &str, margin: &str) -> String {
            format!(
                "报告期内公司实现营业收入{revenue}亿元，同比增长{growth}，毛利率为{margin}，\
主营业务保持稳定，经营活动产生的现金流充裕，行业景气度持续回升，公司市场份额稳中有升。\
公司坚持既定发展战略，持续优化产品结构，强化成本费用管控，加大研发投入力度，\
推进数字化转型建设，完善内部控制体系，积极履行社会责任，为股东创造长期价值。"
            )
            .repeat(15)
        }

        let current = annual_text("一百二十", "百分之十二", "百分之三十五");
        let previous = annual_text("一百零五", "百分之八", "百分之三十二");
        assert!(current.chars().count() > 2000);

        let sim = text_similarity(&current, &previous);
        assert!(sim > 0.7 && sim < 1.0, "similarity {sim}");

        let (abnormal, _) =
            detect_yoy_change(&current, Some(&previous), YOY_SIMILARITY_THRESHOLD);
        assert!(!abnormal);
    }

    #[test]
    fn no_previous_year_is_not_abnormal() {
        assert_eq!(
            detect_yoy_change("今年的内容", None, YOY_SIMILARITY_THRESHOLD),
            (false, 1.0)
        );
    }

    #[test]
    fn empty_current_is_not_flagged_here() {
        assert_eq!(
            detect_yoy_change("", Some("去年的内容"), YOY_SIMILARITY_THRESHOLD),
            (false, 0.0)
        );
    }

    #[test]
    fn drastic_change_is_abnormal() {
        let (abnormal, sim) = detect_yoy_change(
            "完全不同的全新业务描述文字",
            Some("原有传统主营业务经营情况回顾"),
            YOY_SIMILARITY_THRESHOLD,
        );
        assert!(abnormal);
        assert!(sim < YOY_SIMILARITY_THRESHOLD);
    }
}
