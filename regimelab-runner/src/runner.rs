//! Run orchestration — config in, executed backtest out.
//!
//! `execute_run()` is the single entry point: it validates the config,
//! builds the strategy and engine, loads or generates the data, runs
//! the multi-asset engine over the union calendar, and assembles a
//! `RunReport`. Everything is fail-loud; the same config always
//! produces the same run ID and, for synthetic sources, the same
//! numbers.

use thiserror::Error;

use regimelab_core::data::{
    align_series, generate_universe, load_dir, DataError, PriceSeries, SyntheticConfig,
};
use regimelab_core::engine::{EngineError, MultiAssetEngine};

use crate::config::{ConfigError, DataSource, RunConfig};
use crate::report::{RunReport, SCHEMA_VERSION};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Execute one configured backtest end to end.
///
/// Fail-loud order: config validation, then strategy and engine
/// construction, then data loading, then the run itself. Data is
/// windowed to `[start_date, end_date]` before alignment, and an
/// empty window is an error rather than a zero-bar run.
pub fn execute_run(config: &RunConfig) -> Result<RunReport, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    let mut strategy = config.strategy.build()?;
    let engine = MultiAssetEngine::new(config.backtest.engine_settings())?;

    tracing::info!(
        run_id = %run_id,
        strategy = strategy.name(),
        "run configured"
    );

    let series = load_series(config)?;
    let aligned = align_series(&series)?;

    let summary = engine.run(strategy.as_mut(), &aligned)?;

    Ok(RunReport {
        schema_version: SCHEMA_VERSION,
        run_id,
        config: config.clone(),
        summary,
    })
}

/// Load from the configured source, then window each series to the
/// backtest dates.
fn load_series(config: &RunConfig) -> Result<Vec<PriceSeries>, DataError> {
    let raw = match config.data.source {
        DataSource::Csv => {
            tracing::debug!(
                dir = %config.data.dir.display(),
                tickers = config.data.tickers.len(),
                "loading csv series"
            );
            load_dir(&config.data.dir, &config.data.tickers)?
        }
        DataSource::Synthetic => {
            tracing::debug!(
                seed = config.data.seed,
                days = config.data.days,
                "generating synthetic series"
            );
            let mut synth = SyntheticConfig {
                days: config.data.days,
                ..SyntheticConfig::default()
            };
            if let Some(start) = config.backtest.start_date {
                synth.start_date = start;
            }
            generate_universe(&config.data.tickers, config.data.seed, &synth)?
        }
    };

    raw.into_iter()
        .map(|series| series.between(config.backtest.start_date, config.backtest.end_date))
        .collect()
}
