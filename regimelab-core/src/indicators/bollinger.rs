//! Bollinger Bands.
//!
//! Middle band is a partial-window SMA of closes, defined from the
//! first bar. Upper and lower bands sit `num_std` sample standard
//! deviations away and need at least two observations, so they are NaN
//! on bar 0 only. No band touch is possible while the bands are
//! undefined.

use crate::domain::Bar;
use crate::indicators::Indicator;

#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub middle: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    num_std: f64,
    name: String,
}

impl Bollinger {
    pub fn new(period: usize, num_std: f64) -> Self {
        assert!(period >= 2, "Bollinger period must be >= 2");
        assert!(num_std > 0.0, "Bollinger num_std must be positive");
        Self {
            period,
            num_std,
            name: format!("bollinger_{period}"),
        }
    }

    /// All three bands, index-aligned with the input bars.
    pub fn bands(&self, bars: &[Bar]) -> BollingerBands {
        let n = bars.len();
        let mut middle = vec![f64::NAN; n];
        let mut upper = vec![f64::NAN; n];
        let mut lower = vec![f64::NAN; n];

        for i in 0..n {
            let start = (i + 1).saturating_sub(self.period);
            let window = &bars[start..=i];
            let mean = window.iter().map(|b| b.close).sum::<f64>() / window.len() as f64;
            if mean.is_nan() {
                continue;
            }
            middle[i] = mean;
            if window.len() < 2 {
                continue;
            }
            let variance = window
                .iter()
                .map(|b| (b.close - mean).powi(2))
                .sum::<f64>()
                / (window.len() - 1) as f64;
            let band = self.num_std * variance.sqrt();
            upper[i] = mean + band;
            lower[i] = mean - band;
        }

        BollingerBands { middle, upper, lower }
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    /// The middle band. Use [`Bollinger::bands`] for all three.
    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        self.bands(bars).middle
    }
}
