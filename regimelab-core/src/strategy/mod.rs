//! The target-allocation strategy interface and its implementations.
//!
//! A strategy runs in two phases. `prepare` is an offline pre-pass
//! over the base ticker's whole bar history that classifies a regime
//! and emits a [`Signal`] for every bar. During the day loop the
//! engine calls `desired_orders` on active-signal bars; the strategy
//! sizes a signed share delta per managed ticker from current prices
//! and read-only portfolio state. The engine owns execution order and
//! failure handling; strategies never mutate the ledger.

pub mod allocation;
pub mod detector;
pub mod regime;
pub mod signal;
pub mod sizing;

pub use allocation::{AllocationTable, AllocationWeight, RebalancePolicy, RegimeAllocation};
pub use detector::{
    BollingerTouchDetector, BreakoutDetector, DetectorSeries, DualMaDetector, EmaCrossDetector,
    RegimeDetector, SmaCrossDetector,
};
pub use regime::Regime;
pub use signal::Signal;

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Bar, Portfolio};

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("strategy not prepared: call prepare() first")]
    NotPrepared,

    #[error("bar index {idx} out of range ({len} bars prepared)")]
    BarOutOfRange { idx: usize, len: usize },

    #[error("no allocation entry for regime {0}")]
    MissingRegime(Regime),

    #[error("allocation entry for regime {regime}, which detector {detector} never emits")]
    UnreachableRegime { regime: Regime, detector: String },

    #[error("duplicate allocation entry for regime {0}")]
    DuplicateRegime(Regime),

    #[error("duplicate ticker {ticker} in regime {regime} weights")]
    DuplicateTicker { regime: Regime, ticker: String },

    #[error("weight for {ticker} in regime {regime} must be in (0, 1], got {pct}")]
    InvalidWeight {
        regime: Regime,
        ticker: String,
        pct: f64,
    },

    #[error("weights for regime {regime} sum to {sum:.4}, must not exceed 1.0")]
    WeightSumExceeded { regime: Regime, sum: f64 },

    #[error("invalid rebalance policy for regime {regime}: {reason}")]
    InvalidPolicy { regime: Regime, reason: String },

    #[error("buy-and-hold position_pct must be in (0, 1], got {0}")]
    InvalidPositionPct(f64),

    #[error("ratchet risk ticker {0} is not allocated in the BELOW regime")]
    RatchetTickerUnallocated(String),
}

/// Capability description the engines query instead of probing for
/// optional behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyProfile {
    /// Ticker whose bar history drives signal generation.
    pub base_ticker: String,
    /// Every ticker the strategy may trade, sorted.
    pub managed_tickers: Vec<String>,
}

/// One desired order: a signed share delta for a ticker. Negative
/// deltas are sells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderIntent {
    pub ticker: String,
    pub delta: i64,
}

/// A pluggable decision unit driven by the engines.
///
/// Contract: `reset` then `prepare` once per run with the base
/// ticker's full history; `desired_orders` may be called any number of
/// times per bar (the engines call it twice: once before executing
/// sells, again before buys, so buy sizing sees the refreshed cash).
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn profile(&self) -> &StrategyProfile;

    /// Drop all run state so the instance can be reused.
    fn reset(&mut self);

    /// Offline signal pre-pass over the base ticker's bars.
    fn prepare(&mut self, bars: &[Bar]) -> Result<(), StrategyError>;

    /// The prepared signal for a bar; `Hold` when unprepared or out of
    /// range.
    fn signal_at(&self, idx: usize) -> Signal;

    /// Desired share deltas for bar `idx` given today's prices and the
    /// current ledger state. Empty on inactive bars. Tickers missing
    /// from `prices` (no bar that day) are skipped.
    fn desired_orders(
        &self,
        idx: usize,
        prices: &HashMap<String, f64>,
        portfolio: &Portfolio,
    ) -> Result<Vec<OrderIntent>, StrategyError>;
}

impl std::fmt::Debug for dyn Strategy + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy")
            .field("name", &self.name())
            .field("profile", self.profile())
            .finish()
    }
}

struct Prepared {
    signals: Vec<Signal>,
    regimes: Vec<Regime>,
    sell_blocked: Vec<bool>,
}

/// The parameterized regime-allocation strategy: a detector classifies
/// the base ticker's bars, an [`AllocationTable`] maps each regime to
/// target weights and a rebalance policy, and an optional ratchet
/// blocks selling a designated risk ticker while the Below regime has
/// not recovered its trigger peak.
pub struct RegimeStrategy {
    name: String,
    detector: Box<dyn RegimeDetector>,
    table: AllocationTable,
    risk_ticker: Option<String>,
    profile: StrategyProfile,
    prepared: Option<Prepared>,
}

impl RegimeStrategy {
    /// Build and cross-validate. Every regime the detector can emit
    /// needs exactly one table entry; entries for regimes it never
    /// emits, `ON_TOUCH` without a touch detector, and a ratchet risk
    /// ticker with no Below-regime weight are all rejected.
    pub fn new(
        base_ticker: impl Into<String>,
        detector: Box<dyn RegimeDetector>,
        table: AllocationTable,
        ratchet_risk_ticker: Option<String>,
    ) -> Result<Self, StrategyError> {
        let emitted = detector.emitted_regimes();
        for &regime in emitted {
            if table.get(regime).is_none() {
                return Err(StrategyError::MissingRegime(regime));
            }
        }
        for entry in table.entries() {
            if !emitted.contains(&entry.regime) {
                return Err(StrategyError::UnreachableRegime {
                    regime: entry.regime,
                    detector: detector.name().to_string(),
                });
            }
            if entry.rebalance == RebalancePolicy::OnTouch && !detector.emits_touches() {
                return Err(StrategyError::InvalidPolicy {
                    regime: entry.regime,
                    reason: "ON_TOUCH requires a band-touch detector".to_string(),
                });
            }
        }
        if let Some(risk) = &ratchet_risk_ticker {
            let allocated = table
                .get(Regime::Below)
                .is_some_and(|entry| entry.weight_for(risk) > 0.0);
            if !allocated {
                return Err(StrategyError::RatchetTickerUnallocated(risk.clone()));
            }
        }

        let name = format!("regime_{}", detector.name());
        let profile = StrategyProfile {
            base_ticker: base_ticker.into(),
            managed_tickers: table.tickers(),
        };
        Ok(Self {
            name,
            detector,
            table,
            risk_ticker: ratchet_risk_ticker,
            profile,
            prepared: None,
        })
    }

    /// The classified regime for a prepared bar.
    pub fn regime_at(&self, idx: usize) -> Option<Regime> {
        self.prepared
            .as_ref()
            .and_then(|p| p.regimes.get(idx))
            .copied()
    }

    /// Whether the ratchet suppresses risk-ticker sells on this bar.
    pub fn is_sell_blocked(&self, idx: usize) -> bool {
        self.prepared
            .as_ref()
            .and_then(|p| p.sell_blocked.get(idx))
            .copied()
            .unwrap_or(false)
    }

    /// Ratchet pre-pass. Entering Below records the prior close (bar
    /// 0's own close on a Below start) as the trigger peak; the peak
    /// clears on the first bar whose close reaches it; risk-ticker
    /// sells are blocked while Below with the peak still in force.
    fn ratchet_blocked(&self, bars: &[Bar], regimes: &[Regime]) -> Vec<bool> {
        let n = regimes.len();
        let mut blocked = vec![false; n];
        if self.risk_ticker.is_none() {
            return blocked;
        }

        let mut peak: Option<f64> = None;
        for i in 0..n {
            let below = regimes[i] == Regime::Below;
            let entering = below && (i == 0 || regimes[i - 1] != Regime::Below);
            if entering {
                peak = Some(if i == 0 { bars[0].close } else { bars[i - 1].close });
            } else if let Some(p) = peak {
                if bars[i].close >= p {
                    peak = None;
                }
            }
            blocked[i] = below && peak.is_some();
        }
        blocked
    }
}

impl Strategy for RegimeStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn profile(&self) -> &StrategyProfile {
        &self.profile
    }

    fn reset(&mut self) {
        self.prepared = None;
    }

    fn prepare(&mut self, bars: &[Bar]) -> Result<(), StrategyError> {
        let series = self.detector.classify(bars);
        let n = series.len();
        let mut signals = Vec::with_capacity(n);
        let mut anchor: Option<NaiveDate> = None;

        for i in 0..n {
            let regime = series.regimes[i];
            // bar 0 bootstraps unconditionally; a transition overrides
            // whatever the policy would say
            let signal = if i == 0 || regime != series.regimes[i - 1] {
                Signal::Reallocate
            } else {
                let entry = self
                    .table
                    .get(regime)
                    .ok_or(StrategyError::MissingRegime(regime))?;
                match entry.rebalance {
                    RebalancePolicy::TransitionOnly => Signal::Hold,
                    RebalancePolicy::Banding { .. } | RebalancePolicy::Daily => Signal::BandCheck,
                    RebalancePolicy::Periodic { interval_days } => match anchor {
                        Some(last) if (bars[i].date - last).num_days() >= interval_days => {
                            Signal::Periodic
                        }
                        _ => Signal::Hold,
                    },
                    RebalancePolicy::OnTouch => {
                        if series.touches[i] {
                            Signal::BandTouch
                        } else {
                            Signal::Hold
                        }
                    }
                }
            };
            if matches!(
                signal,
                Signal::Reallocate | Signal::Periodic | Signal::BandTouch
            ) {
                anchor = Some(bars[i].date);
            }
            signals.push(signal);
        }

        let sell_blocked = self.ratchet_blocked(bars, &series.regimes);
        self.prepared = Some(Prepared {
            signals,
            regimes: series.regimes,
            sell_blocked,
        });
        Ok(())
    }

    fn signal_at(&self, idx: usize) -> Signal {
        self.prepared
            .as_ref()
            .and_then(|p| p.signals.get(idx))
            .copied()
            .unwrap_or(Signal::Hold)
    }

    fn desired_orders(
        &self,
        idx: usize,
        prices: &HashMap<String, f64>,
        portfolio: &Portfolio,
    ) -> Result<Vec<OrderIntent>, StrategyError> {
        let prepared = self.prepared.as_ref().ok_or(StrategyError::NotPrepared)?;
        if idx >= prepared.signals.len() {
            return Err(StrategyError::BarOutOfRange {
                idx,
                len: prepared.signals.len(),
            });
        }

        let signal = prepared.signals[idx];
        if !signal.is_active() {
            return Ok(Vec::new());
        }
        let regime = prepared.regimes[idx];
        let entry = self
            .table
            .get(regime)
            .ok_or(StrategyError::MissingRegime(regime))?;
        let band_threshold = entry.rebalance.band_threshold();

        let mut orders = Vec::new();
        for ticker in &self.profile.managed_tickers {
            let Some(&price) = prices.get(ticker) else {
                continue;
            };
            let weight = entry.weight_for(ticker);
            let mut delta =
                sizing::target_delta(portfolio, ticker, price, weight, signal, band_threshold);
            if delta < 0
                && prepared.sell_blocked[idx]
                && self.risk_ticker.as_deref() == Some(ticker.as_str())
            {
                delta = 0;
            }
            if delta != 0 {
                orders.push(OrderIntent {
                    ticker: ticker.clone(),
                    delta,
                });
            }
        }
        Ok(orders)
    }
}

/// Baseline: buy `position_pct` of capital on the first bar, never
/// trade again.
pub struct BuyHoldStrategy {
    position_pct: f64,
    profile: StrategyProfile,
    prepared_len: Option<usize>,
}

impl BuyHoldStrategy {
    pub fn new(ticker: impl Into<String>, position_pct: f64) -> Result<Self, StrategyError> {
        if !(position_pct > 0.0 && position_pct <= 1.0) {
            return Err(StrategyError::InvalidPositionPct(position_pct));
        }
        let ticker = ticker.into();
        Ok(Self {
            position_pct,
            profile: StrategyProfile {
                base_ticker: ticker.clone(),
                managed_tickers: vec![ticker],
            },
            prepared_len: None,
        })
    }
}

impl Strategy for BuyHoldStrategy {
    fn name(&self) -> &str {
        "buy_hold"
    }

    fn profile(&self) -> &StrategyProfile {
        &self.profile
    }

    fn reset(&mut self) {
        self.prepared_len = None;
    }

    fn prepare(&mut self, bars: &[Bar]) -> Result<(), StrategyError> {
        self.prepared_len = Some(bars.len());
        Ok(())
    }

    fn signal_at(&self, idx: usize) -> Signal {
        match self.prepared_len {
            Some(len) if idx == 0 && len > 0 => Signal::Reallocate,
            _ => Signal::Hold,
        }
    }

    fn desired_orders(
        &self,
        idx: usize,
        prices: &HashMap<String, f64>,
        portfolio: &Portfolio,
    ) -> Result<Vec<OrderIntent>, StrategyError> {
        let len = self.prepared_len.ok_or(StrategyError::NotPrepared)?;
        if idx >= len {
            return Err(StrategyError::BarOutOfRange { idx, len });
        }
        if idx != 0 {
            return Ok(Vec::new());
        }

        let ticker = &self.profile.base_ticker;
        let Some(&price) = prices.get(ticker) else {
            return Ok(Vec::new());
        };
        let delta = sizing::target_delta(
            portfolio,
            ticker,
            price,
            self.position_pct,
            Signal::Reallocate,
            0.0,
        );
        if delta == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![OrderIntent {
            ticker: ticker.clone(),
            delta,
        }])
    }
}
