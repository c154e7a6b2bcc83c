//! CSV ingestion and export in the collector's column layout.
//!
//! Expected header: `Date,Open,High,Low,Close,Volume[,Dividends]`.
//! `Dividends` is optional; a file without it simply pays nothing.
//! Row errors carry the 1-based file line for fast triage.

use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim, Writer};

use crate::data::schema::PriceSeries;
use crate::data::DataError;
use crate::domain::Bar;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Header positions resolved once per file.
struct ColumnLayout {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    dividend: Option<usize>,
}

impl ColumnLayout {
    fn resolve(path: &Path, headers: &StringRecord) -> Result<Self, DataError> {
        let find = |column: &str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| DataError::MissingColumn {
                    path: path.to_path_buf(),
                    column: column.to_string(),
                })
        };
        Ok(Self {
            date: find("Date")?,
            open: find("Open")?,
            high: find("High")?,
            low: find("Low")?,
            close: find("Close")?,
            volume: find("Volume")?,
            dividend: headers.iter().position(|h| h == "Dividends"),
        })
    }
}

/// Load and validate one ticker's bars from a CSV file.
pub fn load_csv(path: &Path, ticker: &str) -> Result<PriceSeries, DataError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| read_failed(path, e))?;

    let headers = reader.headers().map_err(|e| read_failed(path, e))?.clone();
    let layout = ColumnLayout::resolve(path, &headers)?;

    let mut bars = Vec::new();
    for (i, record) in reader.records().enumerate() {
        // Header is line 1, so data rows start at line 2.
        let row = i + 2;
        let record = record.map_err(|e| DataError::MalformedRow {
            path: path.to_path_buf(),
            row,
            message: e.to_string(),
        })?;
        let bar = parse_record(&record, ticker, &layout).map_err(|message| {
            DataError::MalformedRow {
                path: path.to_path_buf(),
                row,
                message,
            }
        })?;
        bars.push(bar);
    }

    PriceSeries::new(ticker, bars)
}

/// Load `<dir>/<TICKER>.csv` for every requested ticker.
pub fn load_dir(dir: &Path, tickers: &[String]) -> Result<Vec<PriceSeries>, DataError> {
    tickers
        .iter()
        .map(|ticker| load_csv(&dir.join(format!("{ticker}.csv")), ticker))
        .collect()
}

/// Write a series back out in the collector's column layout.
///
/// Always emits the `Dividends` column, so generated files round-trip
/// through [`load_csv`] without loss.
pub fn write_csv(series: &PriceSeries, path: &Path) -> Result<(), DataError> {
    let mut writer = Writer::from_path(path).map_err(|e| write_failed(path, e))?;
    writer
        .write_record(["Date", "Open", "High", "Low", "Close", "Volume", "Dividends"])
        .map_err(|e| write_failed(path, e))?;
    for bar in series.bars() {
        writer
            .write_record([
                bar.date.format(DATE_FORMAT).to_string(),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.volume.to_string(),
                bar.dividend.to_string(),
            ])
            .map_err(|e| write_failed(path, e))?;
    }
    writer.flush().map_err(|e| write_failed(path, e))?;
    Ok(())
}

fn parse_record(
    record: &StringRecord,
    ticker: &str,
    layout: &ColumnLayout,
) -> Result<Bar, String> {
    let date_raw = field(record, layout.date, "Date")?;
    let date = NaiveDate::parse_from_str(date_raw, DATE_FORMAT)
        .map_err(|_| format!("unparseable Date value {date_raw:?}"))?;

    let open = number(record, layout.open, "Open")?;
    let high = number(record, layout.high, "High")?;
    let low = number(record, layout.low, "Low")?;
    let close = number(record, layout.close, "Close")?;

    // Some collectors dump volume as a float ("50000.0"); accept both.
    let volume_raw = number(record, layout.volume, "Volume")?;
    if volume_raw < 0.0 {
        return Err(format!("negative Volume value {volume_raw}"));
    }
    let volume = volume_raw.round() as u64;

    let dividend = match layout.dividend {
        Some(idx) => {
            let raw = field(record, idx, "Dividends")?;
            if raw.is_empty() {
                0.0
            } else {
                raw.parse::<f64>()
                    .map_err(|_| format!("unparseable Dividends value {raw:?}"))?
            }
        }
        None => 0.0,
    };

    Ok(Bar {
        ticker: ticker.to_string(),
        date,
        open,
        high,
        low,
        close,
        volume,
        dividend,
    })
}

fn field<'a>(record: &'a StringRecord, idx: usize, column: &str) -> Result<&'a str, String> {
    record
        .get(idx)
        .ok_or_else(|| format!("row has no {column} field"))
}

fn number(record: &StringRecord, idx: usize, column: &str) -> Result<f64, String> {
    let raw = field(record, idx, column)?;
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("unparseable {column} value {raw:?}"))?;
    if !value.is_finite() {
        return Err(format!("non-finite {column} value {raw:?}"));
    }
    Ok(value)
}

fn read_failed(path: &Path, e: impl std::fmt::Display) -> DataError {
    DataError::ReadFailed {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

fn write_failed(path: &Path, e: impl std::fmt::Display) -> DataError {
    DataError::WriteFailed {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}
