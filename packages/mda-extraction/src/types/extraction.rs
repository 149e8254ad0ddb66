//! Extraction result types.

use serde::{Deserialize, Serialize};

use crate::types::quality::{QualityDetail, QualityFlag};

/// Which candidate generator produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Heading scan over the page bodies
    Generic,
    /// Printed page range parsed from the table of contents
    Toc,
    /// Persisted per-document rule (operator-written or LLM-learned)
    Custom,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Generic => "generic",
            Strategy::Toc => "toc",
            Strategy::Custom => "custom",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an extraction was clipped short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationReason {
    /// Hit the page-window limit before the end heading
    MaxPages,
    /// Hit the character limit
    MaxChars,
    /// No end heading found; ran to the end of the window
    EndNotFound,
}

/// Feature breakdown behind an MD&A likelihood score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDetail {
    /// How many scoring keywords appeared in the text
    pub keyword_hit_count: usize,
    /// Size of the keyword set used
    pub keyword_total: usize,
    /// Dotted-leader density (TOC/table contamination signal)
    pub dots_count: usize,
    /// Text length in characters
    pub length: usize,
}

/// MD&A page range recovered from a table of contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocHit {
    /// Printed page number where the section starts
    pub printed_page_start: u32,
    /// Printed page number of the following section, if listed
    pub printed_page_end: Option<u32>,
    /// Physical page index mapped from `printed_page_start`
    pub page_index_start: usize,
    /// Physical page index mapped from `printed_page_end`
    pub page_index_end: Option<usize>,
}

/// One extracted MD&A candidate (or the promoted winner).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Raw extracted section text
    pub text: String,

    /// MD&A likelihood score in `0.0..=1.0`
    pub score: f64,
    pub score_detail: ScoreDetail,

    /// Physical page span, end exclusive
    pub page_index_start: usize,
    pub page_index_end: usize,
    pub page_count: usize,

    /// Printed page range (TOC strategy only)
    pub printed_page_start: Option<u32>,
    pub printed_page_end: Option<u32>,

    /// Matched start heading text (`"toc"` for TOC-ranged extraction)
    pub hit_start: String,
    /// Matched end heading text, if an end boundary was found
    pub hit_end: Option<String>,

    pub is_truncated: bool,
    pub truncation_reason: Option<TruncationReason>,

    /// Which generator produced this candidate
    pub strategy: Strategy,

    pub quality_flags: Vec<QualityFlag>,
    pub quality_detail: QualityDetail,
}

impl ExtractionResult {
    /// Text length in characters (not bytes).
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}
