//! Quality flags, penalties, and the 0-100 quality gate score.

use serde::{Deserialize, Serialize};

use crate::types::extraction::ScoreDetail;
use crate::types::page::PageBreakKind;

/// Review threshold: records scoring below this need a human look.
pub const NEEDS_REVIEW_THRESHOLD: u8 = 60;

/// Closed set of extraction quality flags.
///
/// Serialized under their wire names (`FLAG_*`) so persisted records stay
/// readable alongside historical data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityFlag {
    /// Extracted text outside the plausible MD&A length range
    #[serde(rename = "FLAG_LENGTH_ABNORMAL")]
    LengthAbnormal,

    /// Core financial anchor words mostly absent
    #[serde(rename = "FLAG_CONTENT_MISMATCH")]
    ContentMismatch,

    /// Tail contains the next section (supervisors' report / audit report)
    #[serde(rename = "FLAG_TAIL_OVERLAP")]
    TailOverlap,

    /// Source had no reliable page boundaries
    #[serde(rename = "FLAG_PAGE_BOUNDARY_MISSING")]
    PageBoundaryMissing,

    /// TOC-derived and heading-derived starts disagree by > 2 pages
    #[serde(rename = "FLAG_TOC_MISMATCH")]
    TocMismatch,

    /// No candidate produced at all
    #[serde(rename = "FLAG_EXTRACT_FAILED")]
    ExtractFailed,

    /// Year-over-year text changed drastically vs. the prior year
    #[serde(rename = "FLAG_YOY_CHANGE_HIGH")]
    YoyChangeHigh,
}

impl QualityFlag {
    /// Points deducted from the quality score when the flag is present.
    pub fn penalty(&self) -> u32 {
        match self {
            QualityFlag::LengthAbnormal => 10,
            QualityFlag::ContentMismatch => 15,
            QualityFlag::TailOverlap => 10,
            QualityFlag::PageBoundaryMissing => 5,
            QualityFlag::TocMismatch => 10,
            QualityFlag::ExtractFailed => 100,
            QualityFlag::YoyChangeHigh => 5,
        }
    }

    /// Wire name, e.g. `FLAG_TAIL_OVERLAP`.
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityFlag::LengthAbnormal => "FLAG_LENGTH_ABNORMAL",
            QualityFlag::ContentMismatch => "FLAG_CONTENT_MISMATCH",
            QualityFlag::TailOverlap => "FLAG_TAIL_OVERLAP",
            QualityFlag::PageBoundaryMissing => "FLAG_PAGE_BOUNDARY_MISSING",
            QualityFlag::TocMismatch => "FLAG_TOC_MISMATCH",
            QualityFlag::ExtractFailed => "FLAG_EXTRACT_FAILED",
            QualityFlag::YoyChangeHigh => "FLAG_YOY_CHANGE_HIGH",
        }
    }
}

impl std::fmt::Display for QualityFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic detail persisted next to the flags.
///
/// A closed struct rather than an open map so the shape is versioned with
/// the code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityDetail {
    pub page_break_kind: PageBreakKind,

    /// Extracted length in characters
    pub char_count: usize,

    /// How many financial anchor words were present
    pub anchor_hit_count: usize,

    /// Page distance between TOC and heading-scan starts, when both exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toc_body_page_distance: Option<usize>,

    /// Scoring feature breakdown of the winning candidate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_detail: Option<ScoreDetail>,

    /// Free-form diagnostic note (e.g. failure context)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl QualityDetail {
    pub fn empty(page_break_kind: PageBreakKind) -> Self {
        Self {
            page_break_kind,
            char_count: 0,
            anchor_hit_count: 0,
            toc_body_page_distance: None,
            score_detail: None,
            note: None,
        }
    }
}

/// One applied deduction, kept for explainability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Penalty {
    /// What triggered the deduction (flag name or negative-feature name)
    pub reason: String,
    pub points: u32,
}

impl Penalty {
    pub fn new(reason: impl Into<String>, points: u32) -> Self {
        Self {
            reason: reason.into(),
            points,
        }
    }
}

/// The 0-100 quality gate verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityScore {
    /// 100 minus all penalties, floored at 0
    pub score: u8,

    /// Always `score < 60`
    pub needs_review: bool,

    /// Every deduction that was applied
    pub penalties: Vec<Penalty>,
}
