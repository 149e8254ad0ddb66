//! Heading detection and page-window plumbing shared by all candidate
//! generators: TOC-page recognition, the heading filter, and span
//! extraction with page/char limits.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::TruncationReason;

/// Max length (chars) for a line to count as a heading.
pub const HEADING_MAX_LEN: usize = 60;

/// Lines containing these are references to a section, not the section
/// heading itself.
const REFERENCE_WORDS: &[&str] = &["参见", "详见", "见本", "请参阅", "详情请见", "参考", "参阅"];

/// Dotted leader ending in a page number, e.g. `管理层讨论与分析......12`.
pub static TOC_DOTLINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.…·]{2,}\s*\d+\s*$").unwrap());

/// Chapter-level heading, e.g. `第四节`, `第十一章`.
pub static SECTION_LEVEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^第[一二三四五六七八九十百零\d]+[章节部分]").unwrap());

static ALL_DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

/// A page-local heading hit: (page index, line index, heading text).
pub type HeadingHit = (usize, usize, String);

/// Whether a page is a table-of-contents page.
///
/// Either an explicit 目录 marker with a couple of dotted-leader lines, or
/// a page dominated by dotted leaders.
pub fn is_toc_page(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }

    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let dot_lines = lines.iter().filter(|l| TOC_DOTLINE_RE.is_match(l)).count();
    let has_toc_keyword = text.contains("目 录") || text.contains("目录");

    if has_toc_keyword && dot_lines >= 2 {
        return true;
    }
    if lines.len() < 8 {
        return false;
    }
    dot_lines >= 5
}

/// Whether a line can be a section heading at all.
pub fn looks_like_heading(line: &str) -> bool {
    let s = line.trim();
    if s.is_empty() {
        return false;
    }
    if s.chars().count() > HEADING_MAX_LEN {
        return false;
    }
    if TOC_DOTLINE_RE.is_match(s) {
        return false;
    }
    if ALL_DIGITS_RE.is_match(s) {
        return false;
    }
    if REFERENCE_WORDS.iter().any(|w| s.contains(w)) {
        return false;
    }
    true
}

/// Compile a set of literal titles into one alternation regex.
///
/// Returns `None` for an empty set (matches nothing).
pub fn compile_title_regex(titles: &[&str]) -> Option<Regex> {
    let escaped: Vec<String> = titles
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| regex::escape(t))
        .collect();
    if escaped.is_empty() {
        return None;
    }
    // Escaped literals cannot produce an invalid pattern.
    Some(Regex::new(&escaped.join("|")).unwrap())
}

/// Scan pages for candidate start headings, skipping TOC pages.
pub fn find_heading_hits(
    pages: &[String],
    title_regex: Option<&Regex>,
    pattern_regexes: &[Regex],
) -> Vec<HeadingHit> {
    let mut hits = Vec::new();
    let skip_toc_pages = pages.len() > 1;

    for (page_index, page_text) in pages.iter().enumerate() {
        if skip_toc_pages && is_toc_page(page_text) {
            continue;
        }
        for (line_index, line) in page_text.lines().enumerate() {
            if !looks_like_heading(line) {
                continue;
            }
            let pattern_match = pattern_regexes.iter().any(|r| r.is_match(line));
            let title_match = title_regex.map(|r| r.is_match(line)).unwrap_or(false);
            if pattern_match || title_match {
                hits.push((page_index, line_index, line.trim().to_string()));
            }
        }
    }
    hits
}

/// Scan forward from a start heading for the first next-section heading.
///
/// End headings must either be chapter-level (`第X节...`) or begin the
/// line with one of `end_titles`; a mid-line mention is not a boundary.
pub fn find_end_hits(
    pages: &[String],
    start_page_index: usize,
    start_line_index: usize,
    end_titles: &[&str],
    max_page_index_exclusive: usize,
) -> Vec<HeadingHit> {
    let end_title_re = compile_title_regex(end_titles);
    let mut hits = Vec::new();

    let last = pages.len().min(max_page_index_exclusive);
    for page_index in start_page_index..last {
        let lines: Vec<&str> = pages[page_index].lines().collect();
        let begin = if page_index == start_page_index {
            start_line_index + 1
        } else {
            0
        };
        for (line_index, line) in lines.iter().enumerate().skip(begin) {
            if !looks_like_heading(line) {
                continue;
            }
            let matched = end_title_re.as_ref().map(|r| r.is_match(line)).unwrap_or(false);
            if !matched {
                continue;
            }
            let stripped = line.trim();
            if SECTION_LEVEL_RE.is_match(stripped)
                || end_titles.iter().any(|t| stripped.starts_with(t))
            {
                hits.push((page_index, line_index, stripped.to_string()));
            }
        }
    }
    hits
}

/// Join the page span `[start, end]` into one text, trimming the start
/// page to its heading line and the end page to the end heading.
///
/// Returns `(text, page_index_start, page_index_end_exclusive)`.
pub fn extract_between(
    pages: &[String],
    start_page_index: usize,
    start_line_index: usize,
    end_page_index: Option<usize>,
    end_line_index: Option<usize>,
) -> (String, usize, usize) {
    let (end_page_index, end_line_index) = match end_page_index {
        Some(p) => (p, end_line_index),
        None => (pages.len() - 1, None),
    };

    let mut selected: Vec<String> = Vec::new();
    for page_index in start_page_index..=end_page_index {
        let lines: Vec<&str> = pages[page_index].lines().collect();
        let from = if page_index == start_page_index {
            start_line_index.min(lines.len())
        } else {
            0
        };
        let to = if page_index == end_page_index {
            end_line_index.unwrap_or(lines.len()).min(lines.len())
        } else {
            lines.len()
        };
        selected.push(lines[from..to].join("\n").trim_matches('\n').to_string());
    }

    let text = selected
        .iter()
        .filter(|p| !p.trim().is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");

    (text, start_page_index, end_page_index + 1)
}

/// Truncate to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// [`extract_between`] with page and character limits applied.
///
/// Returns `(text, start, end_exclusive, is_truncated, reason)`. The first
/// limit that fires sets the truncation reason; a missing end boundary
/// that runs to the document end reports `EndNotFound`.
#[allow(clippy::too_many_arguments)]
pub fn apply_limits(
    pages: &[String],
    start_page_index: usize,
    start_line_index: usize,
    max_pages: usize,
    max_chars: usize,
    end_page_index: Option<usize>,
    end_line_index: Option<usize>,
) -> (String, usize, usize, bool, Option<TruncationReason>) {
    let mut is_truncated = false;
    let mut truncation_reason = None;

    let page_limit_end_exclusive = pages.len().min(start_page_index + max_pages);

    let (limited_end_page, limited_end_line) = match end_page_index {
        None => {
            if pages.len() > page_limit_end_exclusive {
                is_truncated = true;
                truncation_reason = Some(TruncationReason::MaxPages);
                (page_limit_end_exclusive - 1, None)
            } else {
                is_truncated = true;
                truncation_reason = Some(TruncationReason::EndNotFound);
                (pages.len() - 1, None)
            }
        }
        Some(end) => {
            if end + 1 > page_limit_end_exclusive {
                is_truncated = true;
                truncation_reason = Some(TruncationReason::MaxPages);
                (page_limit_end_exclusive - 1, None)
            } else {
                (end, end_line_index)
            }
        }
    };

    let (text, page_index_start, page_index_end) = extract_between(
        pages,
        start_page_index,
        start_line_index,
        Some(limited_end_page),
        limited_end_line,
    );

    let text = if text.chars().count() > max_chars {
        if !is_truncated {
            is_truncated = true;
            truncation_reason = Some(TruncationReason::MaxChars);
        }
        truncate_chars(&text, max_chars).to_string()
    } else {
        text
    };

    (
        text,
        page_index_start,
        page_index_end,
        is_truncated,
        truncation_reason,
    )
}
