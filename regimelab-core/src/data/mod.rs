//! Data layer: schema-validated price series, CSV ingestion,
//! union-calendar alignment, synthetic series generation.

pub mod align;
pub mod csv;
pub mod schema;
pub mod synthetic;

pub use align::{align_series, AlignedData};
pub use csv::{load_csv, load_dir, write_csv};
pub use schema::PriceSeries;
pub use synthetic::{generate_series, generate_universe, SyntheticConfig};

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the data layer. All of them are fatal to the run
/// that triggered them.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {}: {message}", .path.display())]
    ReadFailed { path: PathBuf, message: String },

    #[error("failed to write {}: {message}", .path.display())]
    WriteFailed { path: PathBuf, message: String },

    #[error("{} is missing required column {column}", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("{} row {row}: {message}", .path.display())]
    MalformedRow {
        path: PathBuf,
        row: usize,
        message: String,
    },

    #[error("price series for {ticker} is empty")]
    EmptySeries { ticker: String },

    #[error("price series for {ticker}: {message}")]
    InvalidSeries { ticker: String, message: String },

    #[error("more than one series supplied for ticker {0}")]
    DuplicateSeries(String),
}
