//! Domain data types.

pub mod extraction;
pub mod page;
pub mod quality;
pub mod record;
pub mod rules;

pub use extraction::{ExtractionResult, ScoreDetail, Strategy, TocHit, TruncationReason};
pub use page::{clean_text, PageBreakKind, PageSet};
pub use quality::{Penalty, QualityDetail, QualityFlag, QualityScore, NEEDS_REVIEW_THRESHOLD};
pub use record::{MdaRecord, MdaSections, SUCCESS_CHAR_COUNT_MIN};
pub use rules::{ExtractionRule, RuleSource};
