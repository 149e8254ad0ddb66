//! Core trait abstractions.

pub mod store;

pub use store::{RecordStore, RuleStore};
