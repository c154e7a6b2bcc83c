//! RegimeLab Runner — run orchestration on top of `regimelab-core`.
//!
//! This crate turns declarative TOML run configurations into executed
//! backtests:
//! - Config parsing with fail-loud validation
//! - Deterministic run IDs (blake3 over the canonical JSON config)
//! - Strategy and engine construction from config
//! - Report assembly with plain-text rendering
//! - JSON/CSV artifact bundles with schema versioning
//! - Strictly sequential multi-config comparison

pub mod artifacts;
pub mod compare;
pub mod config;
pub mod report;
pub mod runner;

pub use artifacts::{load_artifacts, save_artifacts, ArtifactError};
pub use compare::{render_comparison, run_comparison};
pub use config::{
    BacktestSection, ConfigError, DataSection, DataSource, DetectorConfig, RatchetConfig,
    RunConfig, RunId, StrategySection,
};
pub use report::{export_json, import_json, render_report, ReportError, RunReport, SCHEMA_VERSION};
pub use runner::{execute_run, RunError};
