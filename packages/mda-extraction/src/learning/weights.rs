//! Per-strategy success statistics and weighted strategy selection.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// The tracked strategy keys. `llm_learned` counts rules produced by the
/// refine loop separately from operator-written `custom` rules.
pub const STRATEGIES: &[&str] = &["generic", "toc", "custom", "llm_learned"];

/// Weight assigned to a strategy never seen before.
const UNKNOWN_STRATEGY_WEIGHT: f64 = 0.5;

/// Attempt/success counters for one strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyStat {
    pub attempts: u32,
    pub successes: u32,
}

/// Summary row for observability.
#[derive(Debug, Clone, Serialize)]
pub struct StrategySummary {
    pub attempts: u32,
    pub successes: u32,
    pub success_rate: f64,
    pub weight: f64,
}

/// Success-rate bandit over extraction strategies.
///
/// `weight = success_rate + 1/(attempts + 10)`: the second term keeps
/// rarely-tried strategies in rotation instead of starving them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyWeights {
    #[serde(flatten)]
    stats: IndexMap<String, StrategyStat>,
}

impl Default for StrategyWeights {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyWeights {
    /// Create with all known strategies zeroed.
    pub fn new() -> Self {
        let stats = STRATEGIES
            .iter()
            .map(|s| (s.to_string(), StrategyStat::default()))
            .collect();
        Self { stats }
    }

    /// Load from a JSON file; a missing or malformed file starts fresh.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let raw = std::fs::read_to_string(path)?;
        let mut loaded: Self = match serde_json::from_str(&raw) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "strategy stats unreadable, resetting");
                return Ok(Self::new());
            }
        };
        for strategy in STRATEGIES {
            loaded
                .stats
                .entry(strategy.to_string())
                .or_insert_with(StrategyStat::default);
        }
        Ok(loaded)
    }

    /// Persist as a flat JSON map, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self)?)?;
        Ok(())
    }

    /// Record one attempt and its outcome.
    pub fn record(&mut self, strategy: &str, success: bool) {
        let stat = self
            .stats
            .entry(strategy.to_string())
            .or_insert_with(StrategyStat::default);
        stat.attempts += 1;
        if success {
            stat.successes += 1;
        }
        debug!(
            strategy,
            attempts = stat.attempts,
            successes = stat.successes,
            "strategy outcome recorded"
        );
    }

    pub fn stat(&self, strategy: &str) -> StrategyStat {
        self.stats.get(strategy).copied().unwrap_or_default()
    }

    pub fn success_rate(&self, strategy: &str) -> f64 {
        match self.stats.get(strategy) {
            Some(stat) => stat.successes as f64 / stat.attempts.max(1) as f64,
            None => 0.0,
        }
    }

    pub fn weight(&self, strategy: &str) -> f64 {
        match self.stats.get(strategy) {
            Some(stat) => {
                let success_rate = stat.successes as f64 / stat.attempts.max(1) as f64;
                let exploration_bonus = 1.0 / (stat.attempts as f64 + 10.0);
                success_rate + exploration_bonus
            }
            None => UNKNOWN_STRATEGY_WEIGHT,
        }
    }

    /// Weight-proportional random draw over `available` (all strategies
    /// when `None`). Falls back to a uniform draw when every weight is
    /// zero. The injected rng makes tests deterministic.
    pub fn select_strategy(
        &self,
        rng: &mut fastrand::Rng,
        available: Option<&[&str]>,
    ) -> String {
        let pool: Vec<&str> = match available {
            Some(list) => list.to_vec(),
            None => STRATEGIES.to_vec(),
        };
        debug_assert!(!pool.is_empty());

        let weights: Vec<f64> = pool.iter().map(|s| self.weight(s)).collect();
        let total: f64 = weights.iter().sum();

        if total <= 0.0 {
            return pool[rng.usize(..pool.len())].to_string();
        }

        let mut draw = rng.f64() * total;
        for (strategy, weight) in pool.iter().zip(&weights) {
            if draw < *weight {
                return strategy.to_string();
            }
            draw -= weight;
        }
        // Float rounding can leave a sliver past the last bucket.
        pool[pool.len() - 1].to_string()
    }

    /// Strategies sorted by weight, best first.
    pub fn priority_order(&self) -> Vec<String> {
        let mut order: Vec<&str> = STRATEGIES.to_vec();
        order.sort_by(|a, b| {
            self.weight(b)
                .partial_cmp(&self.weight(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        order.into_iter().map(str::to_string).collect()
    }

    /// Per-strategy summary for dashboards and logs.
    pub fn stats_summary(&self) -> IndexMap<String, StrategySummary> {
        STRATEGIES
            .iter()
            .map(|s| {
                let stat = self.stat(s);
                (
                    s.to_string(),
                    StrategySummary {
                        attempts: stat.attempts,
                        successes: stat.successes,
                        success_rate: self.success_rate(s),
                        weight: self.weight(s),
                    },
                )
            })
            .collect()
    }
}
