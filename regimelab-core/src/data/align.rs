//! Multi-ticker union-calendar alignment.
//!
//! Engines iterate one shared date axis. A ticker with no bar on a
//! given date holds `None` in its slot and is skipped for pricing and
//! orders that day (no forward-fill of tradable prices).

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::data::schema::PriceSeries;
use crate::data::DataError;
use crate::domain::Bar;

/// Bars for multiple tickers on a common timeline.
#[derive(Debug, Clone)]
pub struct AlignedData {
    /// The common date axis, sorted ascending.
    dates: Vec<NaiveDate>,
    /// Per-ticker slots, each the same length as `dates`.
    bars: HashMap<String, Vec<Option<Bar>>>,
    /// Tickers included, sorted.
    tickers: Vec<String>,
}

impl AlignedData {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn num_days(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn has_ticker(&self, ticker: &str) -> bool {
        self.bars.contains_key(ticker)
    }

    /// The bar for `ticker` on day `day` of the common axis, if it
    /// traded that day.
    pub fn bar(&self, ticker: &str, day: usize) -> Option<&Bar> {
        self.bars.get(ticker)?.get(day)?.as_ref()
    }

    /// Bars actually present for one ticker, in date order. This is the
    /// series a strategy prepares on; its indices advance only on days
    /// the ticker traded.
    pub fn dense_bars(&self, ticker: &str) -> Vec<Bar> {
        self.bars
            .get(ticker)
            .map(|slots| slots.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }
}

/// Align validated series to the union of their calendars.
pub fn align_series(series: &[PriceSeries]) -> Result<AlignedData, DataError> {
    let mut all_dates = BTreeSet::new();
    for s in series {
        for bar in s.bars() {
            all_dates.insert(bar.date);
        }
    }
    let dates: Vec<NaiveDate> = all_dates.into_iter().collect();

    let mut tickers: Vec<String> = Vec::with_capacity(series.len());
    let mut aligned: HashMap<String, Vec<Option<Bar>>> = HashMap::new();

    for s in series {
        let ticker = s.ticker().to_string();
        if aligned.contains_key(&ticker) {
            return Err(DataError::DuplicateSeries(ticker));
        }

        let mut by_date: HashMap<NaiveDate, &Bar> = HashMap::with_capacity(s.len());
        for bar in s.bars() {
            by_date.insert(bar.date, bar);
        }

        let slots: Vec<Option<Bar>> = dates
            .iter()
            .map(|date| by_date.get(date).map(|bar| (*bar).clone()))
            .collect();

        aligned.insert(ticker.clone(), slots);
        tickers.push(ticker);
    }
    tickers.sort();

    Ok(AlignedData {
        dates,
        bars: aligned,
        tickers,
    })
}
