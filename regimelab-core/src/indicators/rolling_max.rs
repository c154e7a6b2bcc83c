//! Rolling maximum of highs.
//!
//! Highest high over a trailing window, with partial windows from the
//! first bar. The breakout detector reads this one index back to get
//! the resistance level in force before each bar.

use crate::domain::Bar;
use crate::indicators::Indicator;

#[derive(Debug, Clone)]
pub struct RollingMax {
    period: usize,
    name: String,
}

impl RollingMax {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "rolling max period must be >= 1");
        Self {
            period,
            name: format!("rolling_max_{period}"),
        }
    }
}

impl Indicator for RollingMax {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        for i in 0..n {
            let start = (i + 1).saturating_sub(self.period);
            let mut max = f64::NAN;
            for bar in &bars[start..=i] {
                if bar.high.is_nan() {
                    max = f64::NAN;
                    break;
                }
                if max.is_nan() || bar.high > max {
                    max = bar.high;
                }
            }
            result[i] = max;
        }
        result
    }
}
