//! Likelihood scoring, negative features, and the quality gate.

pub mod negative;
pub mod quality;
pub mod scorer;

pub use negative::{detect_header_noise, detect_table_residue, garbled_ratio};
pub use quality::{calculate_quality_score, candidate_flags};
pub use scorer::{count_dots, mda_score, DEFAULT_KEYWORDS, MDA_PATTERNS, MDA_TITLES, NEXT_TITLES};
