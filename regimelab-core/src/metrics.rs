//! Performance metrics — pure functions over the equity curve.
//!
//! Every metric is a pure function: a slice of portfolio values (and,
//! for recovery, their dates) in, scalar out. No dependency on the
//! engine or strategies, so each one is testable against hand-computed
//! fixtures.

use serde::{Deserialize, Serialize};

use crate::domain::EquityPoint;

/// Trading days per year, used to annualize daily return statistics.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Calendar days per year, used to convert a snapshot count to years
/// for compounding. One snapshot per trading day is assumed.
pub const CALENDAR_DAYS_PER_YEAR: f64 = 365.25;

/// Aggregate performance metrics for one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub volatility: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    pub max_drawdown: f64,
    pub recovery_days: Option<i64>,
}

impl PerformanceMetrics {
    /// Compute all metrics from an equity curve.
    ///
    /// `risk_free_rate` is an annual rate (e.g. 0.02 for 2%).
    pub fn compute(curve: &[EquityPoint], risk_free_rate: f64) -> Self {
        let values: Vec<f64> = curve.iter().map(|p| p.total_value).collect();
        Self {
            total_return: total_return(&values),
            annualized_return: annualized_return(&values),
            volatility: volatility(&values),
            sharpe: sharpe_ratio(&values, risk_free_rate),
            sortino: sortino_ratio(&values, risk_free_rate),
            calmar: calmar_ratio(&values),
            max_drawdown: max_drawdown(&values),
            recovery_days: recovery_days(curve),
        }
    }
}

/// Drawdown anatomy: the deepest peak-to-trough episode and where (if
/// anywhere) the curve got back to the peak.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawdownStats {
    /// Deepest drawdown as a negative fraction (-0.25 = 25% down).
    pub max_drawdown: f64,
    pub peak_idx: usize,
    pub trough_idx: usize,
    pub peak_value: f64,
    pub trough_value: f64,
    /// First index at or after the trough where the curve regained the
    /// peak value. `None` if it never did.
    pub recovery_idx: Option<usize>,
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let initial = values[0];
    let final_value = *values.last().unwrap();
    if initial <= 0.0 {
        return 0.0;
    }
    (final_value - initial) / initial
}

/// Compound annual growth rate.
///
/// Years are derived from the snapshot count over 365.25, so a curve
/// with one entry per trading day reads as roughly 0.69 years per 252
/// snapshots. Returns 0.0 for fewer than 2 values or non-positive
/// endpoints.
pub fn annualized_return(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let initial = values[0];
    let final_value = *values.last().unwrap();
    if initial <= 0.0 || final_value <= 0.0 {
        return 0.0;
    }
    let years = values.len() as f64 / CALENDAR_DAYS_PER_YEAR;
    (final_value / initial).powf(1.0 / years) - 1.0
}

/// Annualized volatility: sample std of daily returns * sqrt(252).
pub fn volatility(values: &[f64]) -> f64 {
    let returns = daily_returns(values);
    std_dev(&returns) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Annualized Sharpe ratio.
///
/// Sharpe = (mean_daily_return * 252 - rf) / (std_daily * sqrt(252)).
/// Returns 0.0 for fewer than 2 returns or zero variance.
pub fn sharpe_ratio(values: &[f64], risk_free_rate: f64) -> f64 {
    let returns = daily_returns(values);
    if returns.len() < 2 {
        return 0.0;
    }
    let excess = mean(&returns) * TRADING_DAYS_PER_YEAR - risk_free_rate;
    let vol = std_dev(&returns) * TRADING_DAYS_PER_YEAR.sqrt();
    if vol < 1e-15 {
        return 0.0;
    }
    excess / vol
}

/// Annualized Sortino ratio: like Sharpe but the denominator is the
/// sample std of negative daily returns only.
///
/// With no negative returns at all the ratio is +infinity when the
/// excess return is positive, else 0.0. With a downside deviation that
/// is undefined (a single negative return) or zero, 0.0.
pub fn sortino_ratio(values: &[f64], risk_free_rate: f64) -> f64 {
    let returns = daily_returns(values);
    if returns.len() < 2 {
        return 0.0;
    }
    let excess = mean(&returns) * TRADING_DAYS_PER_YEAR - risk_free_rate;
    let downside: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    if downside.is_empty() {
        return if excess > 0.0 { f64::INFINITY } else { 0.0 };
    }
    let downside_vol = std_dev(&downside) * TRADING_DAYS_PER_YEAR.sqrt();
    if downside_vol < 1e-15 {
        return 0.0;
    }
    excess / downside_vol
}

/// Calmar ratio: annualized return / |max drawdown|.
///
/// Returns 0.0 when there was no drawdown.
pub fn calmar_ratio(values: &[f64]) -> f64 {
    let dd = max_drawdown(values);
    if dd >= 0.0 {
        return 0.0;
    }
    annualized_return(values) / dd.abs()
}

/// Maximum drawdown as a negative fraction (-0.15 = 15% drawdown).
///
/// Returns 0.0 for constant or monotonically increasing values.
pub fn max_drawdown(values: &[f64]) -> f64 {
    drawdown_stats(values).map_or(0.0, |s| s.max_drawdown)
}

/// Full drawdown anatomy. `None` only for an empty input.
///
/// The trough is the first point of deepest drawdown against the
/// expanding maximum; the peak is the first occurrence of that maximum
/// before the trough; recovery is the first point at or after the
/// trough whose value regains the peak value.
pub fn drawdown_stats(values: &[f64]) -> Option<DrawdownStats> {
    if values.is_empty() {
        return None;
    }

    let mut running_peak = values[0];
    let mut running_peak_idx = 0usize;
    let mut max_dd = 0.0_f64;
    let mut peak_idx = 0usize;
    let mut trough_idx = 0usize;

    for (i, &v) in values.iter().enumerate() {
        if v > running_peak {
            running_peak = v;
            running_peak_idx = i;
        }
        if running_peak > 0.0 {
            let dd = (v - running_peak) / running_peak;
            // strict < keeps the first trough on ties
            if dd < max_dd {
                max_dd = dd;
                trough_idx = i;
                peak_idx = running_peak_idx;
            }
        }
    }

    let peak_value = values[peak_idx];
    let recovery_idx = values
        .iter()
        .enumerate()
        .skip(trough_idx)
        .find(|(_, &v)| v >= peak_value)
        .map(|(i, _)| i);

    Some(DrawdownStats {
        max_drawdown: max_dd,
        peak_idx,
        trough_idx,
        peak_value,
        trough_value: values[trough_idx],
        recovery_idx,
    })
}

/// Calendar days from the deepest trough back to the prior peak value.
///
/// `None` when the curve is empty or never recovered.
pub fn recovery_days(curve: &[EquityPoint]) -> Option<i64> {
    let values: Vec<f64> = curve.iter().map(|p| p.total_value).collect();
    let stats = drawdown_stats(&values)?;
    let recovery_idx = stats.recovery_idx?;
    Some((curve[recovery_idx].date - curve[stats.trough_idx].date).num_days())
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Day-over-day fractional returns. One element shorter than the input.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    if values.len() < 2 {
        return Vec::new();
    }
    values
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator). 0.0 for fewer than
/// 2 values.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
