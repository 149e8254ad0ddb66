//! The extraction pipeline: heading detection, candidate strategies,
//! section split, the year-over-year check, and the orchestrator.

pub mod consistency;
pub mod headings;
pub mod run;
pub mod splitter;
pub mod strategy;

pub use consistency::{detect_yoy_change, text_similarity, YOY_SIMILARITY_THRESHOLD};
pub use run::{MdaPipeline, PipelineOptions, ProcessOutcome};
pub use splitter::split_mda_sections;
pub use strategy::{extract, ExtractOptions, MAX_CHARS_DEFAULT, MAX_PAGES_DEFAULT};
