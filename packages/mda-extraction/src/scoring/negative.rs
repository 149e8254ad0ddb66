//! Negative-feature detectors for the quality gate.
//!
//! These catch extraction noise that the likelihood score misses: table
//! bodies that survived text conversion, repeated page headers, and
//! mojibake from bad encodings.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

/// Penalty for table residue.
pub const TABLE_RESIDUE_PENALTY: u32 = 15;
/// Penalty for repeated header/footer noise.
pub const HEADER_NOISE_PENALTY: u32 = 10;
/// Penalty for a high garbled-character ratio.
pub const GARBLED_PENALTY: u32 = 20;

/// Garbled ratio above this triggers the penalty.
pub const GARBLED_RATIO_MAX: f64 = 0.05;

/// Lines that are purely numbers, separators, and percent signs.
static NUMERIC_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9\s.,%+-]+$").unwrap());

/// Three or more consecutive numeric-only lines indicate a table body
/// that survived text conversion.
pub fn detect_table_residue(text: &str) -> bool {
    let mut run = 0usize;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            run = 0;
            continue;
        }
        if NUMERIC_LINE_RE.is_match(trimmed) {
            run += 1;
            if run >= 3 {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

/// A short line repeated more than three times is almost always a page
/// header or footer.
pub fn detect_header_noise(text: &str) -> bool {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.chars().count() >= 50 {
            continue;
        }
        let count = counts.entry(trimmed).or_insert(0);
        *count += 1;
        if *count > 3 {
            return true;
        }
    }
    false
}

fn is_expected_char(c: char) -> bool {
    if c.is_whitespace() || c.is_ascii_graphic() {
        return true;
    }
    matches!(u32::from(c),
        // CJK Unified Ideographs (+ Extension A)
        0x4E00..=0x9FFF | 0x3400..=0x4DBF
        // CJK punctuation, fullwidth forms
        | 0x3000..=0x303F | 0xFF00..=0xFFEF
        // General punctuation (ellipsis, dashes, quotes)
        | 0x2000..=0x206F
        // Latin-1 supplement (accented letters in English names)
        | 0x00A0..=0x00FF
    )
}

/// Fraction of characters outside the expected CJK/Latin repertoire.
pub fn garbled_ratio(text: &str) -> f64 {
    let mut total = 0usize;
    let mut garbled = 0usize;
    for c in text.chars() {
        total += 1;
        if !is_expected_char(c) {
            garbled += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    garbled as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_numeric_lines_are_table_residue() {
        let text = "营业收入情况如下\n1,234.56 7.8%\n2,345.67 -1.2%\n3,456.78 +0.5%\n如上所述";
        assert!(detect_table_residue(text));
    }

    #[test]
    fn interrupted_numeric_runs_are_not_residue() {
        let text = "1,234.56\n2,345.67\n其中主营业务\n3,456.78\n4,567.89";
        assert!(!detect_table_residue(text));
    }

    #[test]
    fn repeated_short_line_is_header_noise() {
        let header = "某某股份有限公司 2023 年年度报告";
        let text = (0..5)
            .map(|i| format!("{header}\n第{i}段正文内容"))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(detect_header_noise(&text));
    }

    #[test]
    fn three_repeats_are_tolerated() {
        let text = "页眉\n正文A\n页眉\n正文B\n页眉\n正文C";
        assert!(!detect_header_noise(text));
    }

    #[test]
    fn clean_chinese_text_has_near_zero_garbled_ratio() {
        let text = "公司报告期内实现营业收入 1,234 万元，同比增长 5.6%。";
        assert!(garbled_ratio(text) < 0.01);
    }

    #[test]
    fn replacement_chars_raise_the_ratio() {
        let text = "\u{fffd}".repeat(10) + "正文";
        assert!(garbled_ratio(&text) > GARBLED_RATIO_MAX);
    }
}
