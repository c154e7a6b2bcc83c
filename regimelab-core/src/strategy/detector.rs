//! Regime detectors: classify every bar of the base ticker's history.
//!
//! Detectors run once, offline, over the whole series before the day
//! loop. They see prices only — portfolio state never reaches them.
//! Each detector declares up front which regime labels it can emit, so
//! allocation tables can be checked for full coverage before a run.

use crate::domain::Bar;
use crate::indicators::{Bollinger, Ema, Indicator, RollingMax, Sma};
use crate::strategy::Regime;

/// Per-bar classification produced by [`RegimeDetector::classify`].
/// Both vectors are index-aligned with the input bars.
#[derive(Debug, Clone)]
pub struct DetectorSeries {
    pub regimes: Vec<Regime>,
    /// Band-touch event flags. All false except for touch detectors.
    pub touches: Vec<bool>,
}

impl DetectorSeries {
    pub fn from_regimes(regimes: Vec<Regime>) -> Self {
        let touches = vec![false; regimes.len()];
        Self { regimes, touches }
    }

    pub fn len(&self) -> usize {
        self.regimes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regimes.is_empty()
    }
}

/// A pluggable regime classifier.
pub trait RegimeDetector: Send + Sync {
    /// Stable identifier, e.g. `sma_cross_200`.
    fn name(&self) -> &str;

    /// Every regime label this detector can ever emit. Allocation
    /// tables must cover exactly this set.
    fn emitted_regimes(&self) -> &'static [Regime];

    /// Whether [`classify`](Self::classify) can set touch flags. Only
    /// touch detectors support the `ON_TOUCH` rebalance policy.
    fn emits_touches(&self) -> bool {
        false
    }

    fn classify(&self, bars: &[Bar]) -> DetectorSeries;
}

fn above_or_below(bars: &[Bar], line: &[f64]) -> Vec<Regime> {
    bars.iter()
        .zip(line)
        .map(|(bar, &v)| {
            // NaN comparisons are false, so an undefined line reads Below
            if bar.close >= v {
                Regime::Above
            } else {
                Regime::Below
            }
        })
        .collect()
}

/// Close vs. simple moving average: Above / Below.
#[derive(Debug, Clone)]
pub struct SmaCrossDetector {
    sma: Sma,
    name: String,
}

impl SmaCrossDetector {
    pub fn new(period: usize, min_periods: usize) -> Self {
        Self {
            sma: Sma::with_min_periods(period, min_periods),
            name: format!("sma_cross_{period}"),
        }
    }
}

impl RegimeDetector for SmaCrossDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn emitted_regimes(&self) -> &'static [Regime] {
        &[Regime::Above, Regime::Below]
    }

    fn classify(&self, bars: &[Bar]) -> DetectorSeries {
        let line = self.sma.compute(bars);
        DetectorSeries::from_regimes(above_or_below(bars, &line))
    }
}

/// Close vs. exponential moving average: Above / Below.
#[derive(Debug, Clone)]
pub struct EmaCrossDetector {
    ema: Ema,
    name: String,
}

impl EmaCrossDetector {
    pub fn new(period: usize) -> Self {
        Self {
            ema: Ema::new(period),
            name: format!("ema_cross_{period}"),
        }
    }
}

impl RegimeDetector for EmaCrossDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn emitted_regimes(&self) -> &'static [Regime] {
        &[Regime::Above, Regime::Below]
    }

    fn classify(&self, bars: &[Bar]) -> DetectorSeries {
        let line = self.ema.compute(bars);
        DetectorSeries::from_regimes(above_or_below(bars, &line))
    }
}

/// Dual filter: slow SMA for the primary trend, fast EMA for
/// confirmation. Strong when the close clears both, Weak when it
/// clears only the slow SMA, Below otherwise.
#[derive(Debug, Clone)]
pub struct DualMaDetector {
    slow: Sma,
    fast: Ema,
    name: String,
}

impl DualMaDetector {
    pub fn new(slow_period: usize, fast_period: usize) -> Self {
        Self {
            slow: Sma::with_min_periods(slow_period, 1),
            fast: Ema::new(fast_period),
            name: format!("dual_ma_{slow_period}_{fast_period}"),
        }
    }
}

impl RegimeDetector for DualMaDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn emitted_regimes(&self) -> &'static [Regime] {
        &[Regime::Strong, Regime::Weak, Regime::Below]
    }

    fn classify(&self, bars: &[Bar]) -> DetectorSeries {
        let slow = self.slow.compute(bars);
        let fast = self.fast.compute(bars);
        let regimes = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                if bar.close >= slow[i] {
                    if bar.close >= fast[i] {
                        Regime::Strong
                    } else {
                        Regime::Weak
                    }
                } else {
                    Regime::Below
                }
            })
            .collect();
        DetectorSeries::from_regimes(regimes)
    }
}

/// Prior-peak breakout with a trend filter: Strong / Weak.
///
/// Below the MA is always Weak. Above the MA, the label turns Strong
/// when the close breaks the resistance level (the rolling max of
/// highs over `lookback` bars, read one bar back) and is sticky
/// otherwise: an above-MA continuation keeps the previous label. The
/// bar that crosses up through the MA is Strong only if it also clears
/// the resistance. Bar 0 is always Weak.
#[derive(Debug, Clone)]
pub struct BreakoutDetector {
    ma: Sma,
    resistance: RollingMax,
    name: String,
}

impl BreakoutDetector {
    pub fn new(ma_period: usize, lookback: usize) -> Self {
        Self {
            ma: Sma::with_min_periods(ma_period, 1),
            resistance: RollingMax::new(lookback),
            name: format!("breakout_{ma_period}_{lookback}"),
        }
    }
}

impl RegimeDetector for BreakoutDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn emitted_regimes(&self) -> &'static [Regime] {
        &[Regime::Strong, Regime::Weak]
    }

    fn classify(&self, bars: &[Bar]) -> DetectorSeries {
        let n = bars.len();
        let ma = self.ma.compute(bars);
        let rolling_high = self.resistance.compute(bars);

        // Resistance in force at bar i is the rolling high through i-1
        let above_resistance: Vec<bool> = (0..n)
            .map(|i| i > 0 && bars[i].close > rolling_high[i - 1])
            .collect();

        let mut regimes = Vec::with_capacity(n);
        for i in 0..n {
            let regime = if i == 0 || bars[i].close < ma[i] {
                Regime::Weak
            } else if bars[i - 1].close < ma[i - 1] {
                // crossing up through the MA this bar
                if above_resistance[i] {
                    Regime::Strong
                } else {
                    Regime::Weak
                }
            } else if above_resistance[i] && !above_resistance[i - 1] {
                Regime::Strong
            } else {
                regimes[i - 1]
            };
            regimes.push(regime);
        }
        DetectorSeries::from_regimes(regimes)
    }
}

/// Bollinger-band touch detector: the regime is always Neutral; a bar
/// whose close lands outside either band raises a touch flag instead.
#[derive(Debug, Clone)]
pub struct BollingerTouchDetector {
    bollinger: Bollinger,
    name: String,
}

impl BollingerTouchDetector {
    pub fn new(period: usize, num_std: f64) -> Self {
        Self {
            bollinger: Bollinger::new(period, num_std),
            name: format!("bollinger_touch_{period}"),
        }
    }
}

impl RegimeDetector for BollingerTouchDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn emitted_regimes(&self) -> &'static [Regime] {
        &[Regime::Neutral]
    }

    fn emits_touches(&self) -> bool {
        true
    }

    fn classify(&self, bars: &[Bar]) -> DetectorSeries {
        let bands = self.bollinger.bands(bars);
        let touches = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| bar.close > bands.upper[i] || bar.close < bands.lower[i])
            .collect();
        DetectorSeries {
            regimes: vec![Regime::Neutral; bars.len()],
            touches,
        }
    }
}
