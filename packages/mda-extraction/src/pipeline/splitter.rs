//! Split MD&A text into operating review and future outlook.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::MdaSections;

/// Outlook heading patterns in priority order: chapter-level first, then
/// numbered headings, then free-text titles.
pub const OUTLOOK_PATTERNS: &[&str] = &[
    r"第[一二三四五六七八九十\d]+[章节部分]\s*[：:]*\s*.*(?:未来|展望|发展战略)",
    r"[一二三四五六七八九十\d]+[、\.]\s*(?:公司)?(?:未来发展|发展展望|未来展望)",
    r"[（\(][一二三四五六七八九十\d]+[）\)]\s*(?:公司)?(?:未来发展|发展展望)",
    r"(?:对公司)?未来发展(?:的)?(?:展望|战略)",
    r"公司(?:未来)?发展战略",
    r"(?:公司)?(?:未来|下一年度)(?:的)?经营计划",
    r"未来(?:业务)?发展展望",
];

/// Minimum review size (chars) for a split to stand.
const REVIEW_MIN_CHARS: usize = 500;
/// Minimum outlook size (chars) for a split to stand.
const OUTLOOK_MIN_CHARS: usize = 200;

/// Heading candidates longer than this are body text, not titles.
const HEADING_MAX_CHARS: usize = 80;

static OUTLOOK_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    OUTLOOK_PATTERNS
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
        .collect()
});

/// Split MD&A text at the first outlook heading.
///
/// Lines are scanned in order; the match with the lowest pattern index
/// wins, ties broken by earliest position. A split leaving either part
/// under its minimum is discarded and the whole text stays in `review`.
pub fn split_mda_sections(text: &str) -> MdaSections {
    if text.trim().is_empty() {
        return MdaSections {
            review: String::new(),
            outlook: None,
            split_keyword: None,
            split_offset: None,
        };
    }

    // (pattern index, char offset, byte offset, matched text)
    let mut best: Option<(usize, usize, usize, String)> = None;

    let mut char_offset = 0usize;
    let mut byte_offset = 0usize;

    for line in text.split('\n') {
        let stripped = line.trim();
        let line_chars = line.chars().count();

        if !stripped.is_empty() && stripped.chars().count() <= HEADING_MAX_CHARS {
            for (pattern_index, regex) in OUTLOOK_RES.iter().enumerate() {
                if let Some(m) = regex.find(stripped) {
                    let better = match &best {
                        None => true,
                        Some((best_index, best_char, _, _)) => {
                            pattern_index < *best_index
                                || (pattern_index == *best_index && char_offset < *best_char)
                        }
                    };
                    if better {
                        best = Some((
                            pattern_index,
                            char_offset,
                            byte_offset,
                            m.as_str().to_string(),
                        ));
                    }
                    break; // one match per line
                }
            }
        }

        char_offset += line_chars + 1;
        byte_offset += line.len() + 1;
    }

    let Some((_, split_char, split_byte, keyword)) = best else {
        return MdaSections::unsplit(text);
    };

    let review = text[..split_byte.min(text.len())].trim_end();
    let outlook = text[split_byte.min(text.len())..].trim();

    if review.chars().count() < REVIEW_MIN_CHARS || outlook.chars().count() < OUTLOOK_MIN_CHARS {
        return MdaSections::unsplit(text);
    }

    MdaSections {
        review: review.to_string(),
        outlook: Some(outlook.to_string()),
        split_keyword: Some(keyword),
        split_offset: Some(split_char),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review_block() -> String {
        "报告期内公司实现营业收入增长，利润同比上升。\n".repeat(40)
    }

    fn outlook_block() -> String {
        "公司将继续深耕主业，拓展新市场。\n".repeat(20)
    }

    #[test]
    fn splits_on_numbered_outlook_heading() {
        let text = format!("{}三、公司未来发展展望\n{}", review_block(), outlook_block());
        let sections = split_mda_sections(&text);
        assert!(sections.is_split());
        let keyword = sections.split_keyword.as_deref().unwrap();
        assert!(keyword.contains("未来"), "keyword: {keyword}");
        assert!(sections.outlook.unwrap().contains("深耕主业"));
        assert!(!sections.review.contains("深耕主业"));
    }

    #[test]
    fn chapter_level_heading_outranks_free_text() {
        let text = format!(
            "{}未来发展展望概述\n{}第五节 未来发展战略\n{}",
            review_block(),
            review_block(),
            outlook_block()
        );
        let sections = split_mda_sections(&text);
        assert!(sections.is_split());
        // Chapter-level pattern (index 0) beats the free-text mention that
        // appears earlier in the document.
        assert!(sections
            .split_keyword
            .as_deref()
            .unwrap()
            .starts_with("第五节"));
    }

    #[test]
    fn no_outlook_heading_means_no_split() {
        let text = review_block();
        let sections = split_mda_sections(&text);
        assert!(!sections.is_split());
        assert_eq!(sections.review, text);
    }

    #[test]
    fn undersized_outlook_discards_the_split() {
        let text = format!("{}三、公司未来发展展望\n展望很短。", review_block());
        let sections = split_mda_sections(&text);
        assert!(!sections.is_split());
        assert_eq!(sections.review, text);
    }

    #[test]
    fn undersized_review_discards_the_split() {
        let text = format!("开头很短。\n三、公司未来发展展望\n{}", outlook_block());
        let sections = split_mda_sections(&text);
        assert!(!sections.is_split());
    }

    #[test]
    fn long_lines_are_not_headings() {
        let padded_heading = format!("三、公司未来发展展望{}", "废话".repeat(50));
        let text = format!("{}{}\n{}", review_block(), padded_heading, outlook_block());
        let sections = split_mda_sections(&text);
        assert!(!sections.is_split());
    }

    #[test]
    fn empty_text_gives_empty_review() {
        let sections = split_mda_sections("   ");
        assert_eq!(sections.review, "");
        assert!(sections.outlook.is_none());
    }
}
