//! Bar — the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar for a single ticker, with the per-share dividend
/// paid on that day (0.0 on non-dividend days).
///
/// Bars are supplied by the external data collector and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    #[serde(default)]
    pub dividend: f64,
}

impl Bar {
    /// Basic OHLC sanity check: high >= low, high bounds open/close, positive prices.
    pub fn is_sane(&self) -> bool {
        if self.close.is_nan() || self.open.is_nan() || self.high.is_nan() || self.low.is_nan() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }

    /// Whether this bar pays a dividend.
    pub fn has_dividend(&self) -> bool {
        self.dividend > 0.0
    }
}
