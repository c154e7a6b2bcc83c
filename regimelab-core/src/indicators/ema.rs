//! Exponential Moving Average (EMA).
//!
//! Recursive smoothing with alpha = 2 / (period + 1), seeded with the
//! first close. Defined from the first bar, so lookback is 0.

use crate::domain::Bar;
use crate::indicators::Indicator;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }

    pub fn alpha(&self) -> f64 {
        2.0 / (self.period as f64 + 1.0)
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n == 0 {
            return result;
        }

        let alpha = self.alpha();
        let mut prev = bars[0].close;
        result[0] = prev;
        for i in 1..n {
            prev = alpha * bars[i].close + (1.0 - alpha) * prev;
            result[i] = prev;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn ema_seeds_with_first_close() {
        let bars = make_bars(&[100.0, 110.0, 120.0]);
        let result = Ema::new(9).compute(&bars);
        assert_approx(result[0], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_known_values() {
        // period 3 -> alpha = 0.5
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0]);
        let result = Ema::new(3).compute(&bars);
        assert_approx(result[0], 10.0, DEFAULT_EPSILON);
        assert_approx(result[1], 15.0, DEFAULT_EPSILON);
        assert_approx(result[2], 22.5, DEFAULT_EPSILON);
        assert_approx(result[3], 31.25, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_tracks_faster_than_long_sma() {
        // After a step change the short-alpha EMA converges toward the
        // new level
        let mut closes = vec![100.0; 10];
        closes.extend(vec![200.0; 20]);
        let bars = make_bars(&closes);
        let result = Ema::new(5).compute(&bars);
        assert!(result[29] > 195.0, "got {}", result[29]);
    }

    #[test]
    fn ema_constant_series_is_constant() {
        let bars = make_bars(&[50.0; 30]);
        let result = Ema::new(12).compute(&bars);
        for v in result {
            assert_approx(v, 50.0, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn ema_empty_input() {
        assert!(Ema::new(5).compute(&[]).is_empty());
    }
}
