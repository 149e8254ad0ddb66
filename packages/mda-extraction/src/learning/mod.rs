//! Adaptive learning: strategy weights, few-shot samples, and failure
//! patterns.

pub mod failures;
pub mod few_shot;
pub mod weights;

pub use failures::{
    classify_failure, FailurePattern, FailurePatternStore, FailureStats, MatchConditions,
    FREQUENT_MIN_OCCURRENCES,
};
pub use few_shot::{FewShotSample, FewShotStore};
pub use weights::{StrategyStat, StrategySummary, StrategyWeights, STRATEGIES};
