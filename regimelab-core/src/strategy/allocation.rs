//! Declarative per-regime allocation tables.
//!
//! A table maps each regime the detector can emit to target weights
//! per ticker plus a rebalance policy. Weights are fractions of total
//! portfolio value; anything left under 1.0 stays in cash. Validation
//! is fail-loud: malformed ratios are construction errors, never
//! silently normalized.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::strategy::{Regime, StrategyError};

/// Target fraction of portfolio value for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationWeight {
    pub ticker: String,
    pub pct: f64,
}

/// When a regime's allocation is re-applied while the regime persists.
/// Transitions into a regime always reallocate regardless of policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RebalancePolicy {
    /// Only trade on regime transitions.
    TransitionOnly,
    /// Check drift every bar; trade when it reaches the threshold.
    Banding { band_threshold: f64 },
    /// Rebalance when the calendar interval has elapsed.
    Periodic { interval_days: i64 },
    /// Rebalance to target every bar.
    Daily,
    /// Rebalance on band-touch bars. Touch detectors only.
    OnTouch,
}

impl RebalancePolicy {
    /// Drift required before a band-check bar trades. Zero for the
    /// daily policy, so it always trades.
    pub fn band_threshold(&self) -> f64 {
        match self {
            RebalancePolicy::Banding { band_threshold } => *band_threshold,
            _ => 0.0,
        }
    }
}

/// Target weights and rebalance policy for one regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeAllocation {
    pub regime: Regime,
    pub weights: Vec<AllocationWeight>,
    pub rebalance: RebalancePolicy,
}

impl RegimeAllocation {
    /// Target weight for a ticker, 0.0 when the ticker is not in this
    /// regime's table (which means: sell it all).
    pub fn weight_for(&self, ticker: &str) -> f64 {
        self.weights
            .iter()
            .find(|w| w.ticker == ticker)
            .map_or(0.0, |w| w.pct)
    }
}

/// Validated set of regime allocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationTable {
    entries: Vec<RegimeAllocation>,
}

impl AllocationTable {
    /// Validate and build. Rejected outright: duplicate regimes,
    /// duplicate tickers within a regime, weights outside (0, 1],
    /// weight sums above 1.0, band thresholds outside [0, 1), periodic
    /// intervals under one day.
    pub fn new(entries: Vec<RegimeAllocation>) -> Result<Self, StrategyError> {
        let mut seen_regimes = BTreeSet::new();
        for entry in &entries {
            if !seen_regimes.insert(entry.regime) {
                return Err(StrategyError::DuplicateRegime(entry.regime));
            }

            let mut seen_tickers = BTreeSet::new();
            let mut sum = 0.0;
            for weight in &entry.weights {
                if !seen_tickers.insert(weight.ticker.as_str()) {
                    return Err(StrategyError::DuplicateTicker {
                        regime: entry.regime,
                        ticker: weight.ticker.clone(),
                    });
                }
                if !(weight.pct > 0.0 && weight.pct <= 1.0) {
                    return Err(StrategyError::InvalidWeight {
                        regime: entry.regime,
                        ticker: weight.ticker.clone(),
                        pct: weight.pct,
                    });
                }
                sum += weight.pct;
            }
            if sum > 1.0 + 1e-9 {
                return Err(StrategyError::WeightSumExceeded {
                    regime: entry.regime,
                    sum,
                });
            }

            match entry.rebalance {
                RebalancePolicy::Banding { band_threshold } => {
                    if !(0.0..1.0).contains(&band_threshold) {
                        return Err(StrategyError::InvalidPolicy {
                            regime: entry.regime,
                            reason: format!(
                                "band threshold {band_threshold} outside [0, 1)"
                            ),
                        });
                    }
                }
                RebalancePolicy::Periodic { interval_days } => {
                    if interval_days < 1 {
                        return Err(StrategyError::InvalidPolicy {
                            regime: entry.regime,
                            reason: format!(
                                "periodic interval must be >= 1 day, got {interval_days}"
                            ),
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, regime: Regime) -> Option<&RegimeAllocation> {
        self.entries.iter().find(|e| e.regime == regime)
    }

    pub fn entries(&self) -> &[RegimeAllocation] {
        &self.entries
    }

    /// Every ticker referenced by any regime, sorted and deduplicated.
    pub fn tickers(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .entries
            .iter()
            .flat_map(|e| e.weights.iter().map(|w| w.ticker.as_str()))
            .collect();
        set.into_iter().map(String::from).collect()
    }
}
