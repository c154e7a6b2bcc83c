//! Backtest engines.
//!
//! Two drivers share one contract: validate inputs, reset and prepare
//! the strategy, then walk the calendar day by day in a fixed phase
//! order (cash addition, price updates, dividends, sells, then buys,
//! snapshot) and summarize the resulting equity curve.

pub mod multi;
pub mod single;

pub use multi::MultiAssetEngine;
pub use single::SingleAssetEngine;

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{EquityPoint, HoldingSummary, Portfolio, SellMode};
use crate::metrics::{drawdown_stats, PerformanceMetrics};
use crate::strategy::{Strategy, StrategyError};

#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine was driven with inconsistent settings. Fatal.
    #[error("engine configuration: {0}")]
    Configuration(String),

    /// The supplied data cannot support the requested run. Fatal.
    #[error("data validation: {0}")]
    DataValidation(String),

    #[error(transparent)]
    Strategy(#[from] StrategyError),
}

/// Knobs shared by both engines.
///
/// `monthly_addition` only applies to the multi-asset engine; the
/// single-asset engine runs a fixed-capital simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    pub initial_cash: f64,
    pub commission_rate: f64,
    pub monthly_addition: f64,
    pub sell_mode: SellMode,
    /// Annual rate subtracted by the ratio metrics.
    pub risk_free_rate: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            initial_cash: 100_000.0,
            commission_rate: 0.001,
            monthly_addition: 0.0,
            sell_mode: SellMode::default(),
            risk_free_rate: 0.0,
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(EngineError::Configuration(format!(
                "initial_cash must be positive, got {}",
                self.initial_cash
            )));
        }
        if !self.commission_rate.is_finite()
            || !(0.0..=0.1).contains(&self.commission_rate)
        {
            return Err(EngineError::Configuration(format!(
                "commission_rate must be in [0, 0.1], got {}",
                self.commission_rate
            )));
        }
        if !self.monthly_addition.is_finite() || self.monthly_addition < 0.0 {
            return Err(EngineError::Configuration(format!(
                "monthly_addition must be non-negative, got {}",
                self.monthly_addition
            )));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(EngineError::Configuration(format!(
                "risk_free_rate must be finite, got {}",
                self.risk_free_rate
            )));
        }
        Ok(())
    }
}

/// Everything one run produces: headline numbers, risk metrics, the
/// final holdings view, and the raw equity curve for artifact export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub strategy: String,
    pub tickers: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub trading_days: usize,
    pub initial_cash: f64,
    pub final_value: f64,
    pub metrics: PerformanceMetrics,
    /// Dates of the deepest drawdown episode; absent when the curve
    /// never drew down.
    pub max_drawdown_peak: Option<NaiveDate>,
    pub max_drawdown_trough: Option<NaiveDate>,
    pub trade_count: usize,
    pub total_commission: f64,
    pub skipped_orders: usize,
    pub holdings: Vec<HoldingSummary>,
    pub equity_curve: Vec<EquityPoint>,
}

/// Execute one bar's desired orders against the ledger: all sells
/// first, then re-query the strategy so buy sizing sees the refreshed
/// cash, then all buys. Recoverable order failures are logged at warn
/// and counted, not propagated.
///
/// Returns the number of skipped orders.
pub(crate) fn dispatch_orders(
    strategy: &dyn Strategy,
    idx: usize,
    date: NaiveDate,
    prices: &HashMap<String, f64>,
    portfolio: &mut Portfolio,
) -> Result<usize, StrategyError> {
    let mut skipped = 0usize;

    // ─── Sells release cash first ───
    let intents = strategy.desired_orders(idx, prices, portfolio)?;
    for intent in intents.iter().filter(|o| o.delta < 0) {
        let Some(&price) = prices.get(&intent.ticker) else {
            continue;
        };
        let quantity = intent.delta.unsigned_abs();
        match portfolio.sell(&intent.ticker, quantity, price, date) {
            Ok(executed) => {
                tracing::debug!(ticker = %intent.ticker, quantity = executed, price, "rebalance sell");
            }
            Err(e) => {
                skipped += 1;
                tracing::warn!(ticker = %intent.ticker, error = %e, "sell skipped");
            }
        }
    }

    // ─── Buys sized against post-sell cash ───
    let intents = strategy.desired_orders(idx, prices, portfolio)?;
    for intent in intents.iter().filter(|o| o.delta > 0) {
        let Some(&price) = prices.get(&intent.ticker) else {
            continue;
        };
        let quantity = intent.delta as u64;
        match portfolio.buy(&intent.ticker, quantity, price, date) {
            Ok(()) => {
                tracing::debug!(ticker = %intent.ticker, quantity, price, "rebalance buy");
            }
            Err(e) => {
                skipped += 1;
                tracing::warn!(ticker = %intent.ticker, error = %e, "buy skipped");
            }
        }
    }

    Ok(skipped)
}

/// Assemble the run summary from a finished ledger.
pub(crate) fn summarize(
    strategy_name: &str,
    tickers: Vec<String>,
    portfolio: &Portfolio,
    settings: &EngineSettings,
    skipped_orders: usize,
) -> Result<RunSummary, EngineError> {
    let curve = &portfolio.equity_curve;
    let (Some(first), Some(last)) = (curve.first(), curve.last()) else {
        return Err(EngineError::DataValidation(
            "run produced no snapshots".to_string(),
        ));
    };

    let metrics = PerformanceMetrics::compute(curve, settings.risk_free_rate);
    let values: Vec<f64> = curve.iter().map(|p| p.total_value).collect();
    let episode = drawdown_stats(&values).filter(|s| s.max_drawdown < 0.0);

    Ok(RunSummary {
        strategy: strategy_name.to_string(),
        tickers,
        start_date: first.date,
        end_date: last.date,
        trading_days: curve.len(),
        initial_cash: portfolio.initial_cash,
        final_value: last.total_value,
        metrics,
        max_drawdown_peak: episode.as_ref().map(|s| curve[s.peak_idx].date),
        max_drawdown_trough: episode.as_ref().map(|s| curve[s.trough_idx].date),
        trade_count: portfolio.trades.len(),
        total_commission: portfolio.total_commission,
        skipped_orders,
        holdings: portfolio.holdings_summary(),
        equity_curve: curve.clone(),
    })
}
