//! MD&A section extraction from annual-report page text
//!
//! Takes the page text of a Chinese listed-company annual report and pulls
//! out the management discussion and analysis chapter: candidate spans come
//! from a generic heading scan, the table of contents, and per-document
//! rules; the winner is scored, quality-gated, split into review/outlook,
//! and persisted as an [`types::MdaRecord`].
//!
//! On top of the deterministic pipeline sit the adaptive pieces: a
//! success-rate bandit over strategies, a few-shot sample store, failure
//! pattern tracking, and an LLM-backed self-refine loop that repairs
//! boundary patterns for stubborn documents.
//!
//! # Example
//!
//! ```rust,ignore
//! use mda_extraction::pipeline::MdaPipeline;
//! use mda_extraction::stores::MemoryStore;
//! use mda_extraction::types::PageSet;
//!
//! let pipeline = MdaPipeline::new(MemoryStore::new());
//! let pages = PageSet::from_text(&report_text);
//! let outcome = pipeline.process("600000", 2023, &pages).await?;
//! ```

pub mod error;
pub mod learning;
pub mod pipeline;
pub mod prompts;
pub mod refine;
pub mod scoring;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

pub use error::{MdaError, Result};
pub use pipeline::{MdaPipeline, PipelineOptions, ProcessOutcome};
pub use refine::{RefineResult, SelfRefineLoop};
pub use traits::{RecordStore, RuleStore};
pub use types::{ExtractionResult, ExtractionRule, MdaRecord, PageSet};
