//! On-disk run artifacts.
//!
//! Each run gets its own directory named by the first twelve hex
//! characters of the run ID, holding `report.json` (the full
//! `RunReport`) and `equity.csv` (one row per trading day). Loading
//! goes through the same schema check as every other import.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::report::{export_json, import_json, ReportError, RunReport};

/// Errors from artifact persistence.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to write {path}: {message}")]
    WriteFailed { path: PathBuf, message: String },

    #[error("failed to read {path}: {message}")]
    ReadFailed { path: PathBuf, message: String },

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("equity csv encoding failed: {0}")]
    Csv(String),
}

/// Write `report.json` and `equity.csv` under `out_dir`, creating the
/// run directory if needed. Returns the run directory path.
pub fn save_artifacts(report: &RunReport, out_dir: &Path) -> Result<PathBuf, ArtifactError> {
    let short_id = report.run_id.get(..12).unwrap_or(&report.run_id);
    let run_dir = out_dir.join(short_id);
    fs::create_dir_all(&run_dir).map_err(|e| ArtifactError::WriteFailed {
        path: run_dir.clone(),
        message: e.to_string(),
    })?;

    let report_path = run_dir.join("report.json");
    let json = export_json(report)?;
    fs::write(&report_path, json).map_err(|e| ArtifactError::WriteFailed {
        path: report_path,
        message: e.to_string(),
    })?;

    let equity_path = run_dir.join("equity.csv");
    let csv = render_equity_csv(report)?;
    fs::write(&equity_path, csv).map_err(|e| ArtifactError::WriteFailed {
        path: equity_path,
        message: e.to_string(),
    })?;

    tracing::info!(dir = %run_dir.display(), "artifacts saved");
    Ok(run_dir)
}

/// Read `report.json` back from a run directory.
pub fn load_artifacts(run_dir: &Path) -> Result<RunReport, ArtifactError> {
    let report_path = run_dir.join("report.json");
    let json = fs::read_to_string(&report_path).map_err(|e| ArtifactError::ReadFailed {
        path: report_path,
        message: e.to_string(),
    })?;
    Ok(import_json(&json)?)
}

fn render_equity_csv(report: &RunReport) -> Result<String, ArtifactError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["date", "cash", "market_value", "total_value", "position_count"])
        .map_err(|e| ArtifactError::Csv(e.to_string()))?;
    for point in &report.summary.equity_curve {
        writer
            .write_record([
                point.date.to_string(),
                format!("{:.2}", point.cash),
                format!("{:.2}", point.market_value),
                format!("{:.2}", point.total_value),
                point.position_count.to_string(),
            ])
            .map_err(|e| ArtifactError::Csv(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ArtifactError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ArtifactError::Csv(e.to_string()))
}
