//! Indicator implementations used by the regime detectors.
//!
//! Indicators are precomputed once over the full bar history before the
//! day loop; detectors then read aligned values per index. Output
//! vectors are index-aligned with the input bars, with NaN in slots
//! where the indicator is not yet defined.

pub mod bollinger;
pub mod ema;
pub mod rolling_max;
pub mod sma;

pub use bollinger::{Bollinger, BollingerBands};
pub use ema::Ema;
pub use rolling_max::RollingMax;
pub use sma::Sma;

use crate::domain::Bar;

/// A single-series indicator over a bar history.
pub trait Indicator {
    /// Stable identifier, e.g. `sma_200`.
    fn name(&self) -> &str;

    /// Bars consumed before the first defined value. An indicator that
    /// warms up on partial windows has lookback 0.
    fn lookback(&self) -> usize;

    /// One output value per input bar, NaN while undefined.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev close (or close for the first
/// bar), high = max(open, close) + 1.0, low = min(open, close) - 1.0.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                ticker: "TEST".to_string(),
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
                dividend: 0.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
