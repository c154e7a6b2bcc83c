//! Schema-validated per-ticker bar series.
//!
//! `PriceSeries` is the only way bars enter the engines. Construction
//! rejects empty series, out-of-order dates, mismatched tickers, and
//! insane OHLC rows, so downstream code never re-checks them.

use chrono::NaiveDate;

use crate::data::DataError;
use crate::domain::Bar;

/// One ticker's daily bars, sorted ascending by date, validated once.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    ticker: String,
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Validate and wrap a bar vector.
    ///
    /// Rules: non-empty, every bar tagged with this ticker, dates
    /// strictly increasing, OHLC sane, dividends finite and
    /// non-negative.
    pub fn new(ticker: impl Into<String>, bars: Vec<Bar>) -> Result<Self, DataError> {
        let ticker = ticker.into();
        if bars.is_empty() {
            return Err(DataError::EmptySeries { ticker });
        }

        let mut prev_date: Option<NaiveDate> = None;
        for bar in &bars {
            if bar.ticker != ticker {
                return Err(DataError::InvalidSeries {
                    ticker,
                    message: format!("bar on {} is tagged {}", bar.date, bar.ticker),
                });
            }
            if let Some(prev) = prev_date {
                if bar.date <= prev {
                    return Err(DataError::InvalidSeries {
                        ticker,
                        message: format!("dates not strictly increasing at {}", bar.date),
                    });
                }
            }
            if !bar.is_sane() {
                return Err(DataError::InvalidSeries {
                    ticker,
                    message: format!("insane OHLC row on {}", bar.date),
                });
            }
            if !bar.dividend.is_finite() || bar.dividend < 0.0 {
                return Err(DataError::InvalidSeries {
                    ticker,
                    message: format!("bad dividend {} on {}", bar.dividend, bar.date),
                });
            }
            prev_date = Some(bar.date);
        }

        Ok(Self { ticker, bars })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// First trading date in the series.
    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    /// Last trading date in the series.
    pub fn last_date(&self) -> NaiveDate {
        self.bars[self.bars.len() - 1].date
    }

    /// Restrict the series to `[start, end]` (both inclusive, both
    /// optional). An empty result is an error: a run over zero bars is
    /// always a misconfigured date range.
    pub fn between(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<PriceSeries, DataError> {
        let bars: Vec<Bar> = self
            .bars
            .iter()
            .filter(|bar| start.map_or(true, |s| bar.date >= s))
            .filter(|bar| end.map_or(true, |e| bar.date <= e))
            .cloned()
            .collect();
        if bars.is_empty() {
            return Err(DataError::EmptySeries {
                ticker: self.ticker.clone(),
            });
        }
        Ok(PriceSeries {
            ticker: self.ticker.clone(),
            bars,
        })
    }

    /// Close column, in date order.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.close).collect()
    }
}
