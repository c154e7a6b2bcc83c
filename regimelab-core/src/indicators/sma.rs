//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices. `min_periods` controls warm-up: with
//! `min_periods = period` the first value appears at index period - 1;
//! with `min_periods = 1` partial windows are averaged from the first
//! bar, which is how the trend detectors consume it.

use crate::domain::Bar;
use crate::indicators::Indicator;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    min_periods: usize,
    name: String,
}

impl Sma {
    /// Full-window SMA: NaN until `period` bars are available.
    pub fn new(period: usize) -> Self {
        Self::with_min_periods(period, period)
    }

    /// SMA that averages partial windows once `min_periods` bars exist.
    pub fn with_min_periods(period: usize, min_periods: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        assert!(
            (1..=period).contains(&min_periods),
            "SMA min_periods must be in 1..=period"
        );
        Self {
            period,
            min_periods,
            name: format!("sma_{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.min_periods.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        for i in 0..n {
            let start = (i + 1).saturating_sub(self.period);
            let window = &bars[start..=i];
            if window.len() < self.min_periods {
                continue;
            }
            let mut sum = 0.0;
            let mut nan_in_window = false;
            for bar in window {
                if bar.close.is_nan() {
                    nan_in_window = true;
                    break;
                }
                sum += bar.close;
            }
            if !nan_in_window {
                result[i] = sum / window.len() as f64;
            }
        }
        result
    }
}
