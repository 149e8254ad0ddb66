//! Page types - paginated document text and page splitting.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// `=== Page 12 ===` or `--- Page 12 ---` separator lines.
static PAGE_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:=+|-+)\s*Page\s*(\d+)\s*(?:=+|-+)\s*$").unwrap()
});

/// How page boundaries were recovered from the source text.
///
/// Extraction quality depends on real page boundaries; `None` means the
/// whole document arrived as a single "page" and page-window heuristics
/// degrade accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageBreakKind {
    /// Form-feed characters (`\x0c`) between pages
    FormFeed,
    /// `=== Page N ===` marker lines carrying printed page numbers
    PageMarker,
    /// No recognizable page boundaries
    None,
}

impl PageBreakKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageBreakKind::FormFeed => "form_feed",
            PageBreakKind::PageMarker => "page_marker",
            PageBreakKind::None => "none",
        }
    }
}

/// A paginated document: the unit of extraction.
///
/// `page_numbers` holds the printed page number of each physical page when
/// the source carried page markers; it is what makes TOC-based extraction
/// possible (mapping printed page numbers back to physical indices).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSet {
    /// Page texts in physical order
    pub pages: Vec<String>,

    /// Printed page number per physical page, if known
    pub page_numbers: Option<Vec<Option<u32>>>,

    /// How the pages were delimited in the source
    pub page_break_kind: PageBreakKind,
}

impl PageSet {
    /// Create a page set from pre-split pages with no printed numbering.
    pub fn new(pages: Vec<String>, page_break_kind: PageBreakKind) -> Self {
        Self {
            pages,
            page_numbers: None,
            page_break_kind,
        }
    }

    /// Attach printed page numbers (one entry per physical page).
    pub fn with_page_numbers(mut self, page_numbers: Vec<Option<u32>>) -> Self {
        self.page_numbers = Some(page_numbers);
        self
    }

    /// Split raw document text into pages.
    ///
    /// Form feeds win over page-marker lines; text with neither becomes a
    /// single page with `PageBreakKind::None`.
    pub fn from_text(text: &str) -> Self {
        let text = clean_text(text);

        if text.contains('\x0c') {
            let mut pages: Vec<String> = text
                .split('\x0c')
                .map(|p| p.trim_matches('\n').to_string())
                .filter(|p| !p.trim().is_empty())
                .collect();
            if pages.is_empty() {
                pages.push(String::new());
            }
            return Self::new(pages, PageBreakKind::FormFeed);
        }

        let mut pages: Vec<String> = Vec::new();
        let mut page_numbers: Vec<Option<u32>> = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_number: Option<u32> = None;
        let mut saw_marker = false;

        for line in text.split('\n') {
            if let Some(caps) = PAGE_MARKER_RE.captures(line) {
                if !current.is_empty() || saw_marker {
                    pages.push(current.join("\n").trim_matches('\n').to_string());
                    page_numbers.push(current_number);
                    current.clear();
                }
                current_number = caps.get(1).and_then(|m| m.as_str().parse().ok());
                saw_marker = true;
                continue;
            }
            current.push(line);
        }
        pages.push(current.join("\n").trim_matches('\n').to_string());
        page_numbers.push(current_number);

        if saw_marker {
            let keep: Vec<bool> = pages
                .iter()
                .map(|p| !p.trim().is_empty() || pages.len() == 1)
                .collect();
            let mut kept_pages = Vec::new();
            let mut kept_numbers = Vec::new();
            for (i, page) in pages.into_iter().enumerate() {
                if keep[i] {
                    kept_pages.push(page);
                    kept_numbers.push(page_numbers[i]);
                }
            }
            return Self {
                pages: kept_pages,
                page_numbers: Some(kept_numbers),
                page_break_kind: PageBreakKind::PageMarker,
            };
        }

        Self::new(vec![text], PageBreakKind::None)
    }

    /// SHA-256 over all pages, used as the idempotency key for records.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for (i, page) in self.pages.iter().enumerate() {
            if i > 0 {
                hasher.update(b"\x0c");
            }
            hasher.update(page.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }
}

/// Normalize line endings and non-breaking spaces.
pub fn clean_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{00a0}', " ")
}
