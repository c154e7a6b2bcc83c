//! RegimeLab CLI — run, compare, and synthetic-data commands.
//!
//! Commands:
//! - `run` — execute one backtest from a TOML config and print the report
//! - `compare` — run several configs sequentially and print a side-by-side table
//! - `synth` — write a seeded synthetic price series to a CSV file
//!
//! Logging goes through `tracing`; set `RUST_LOG` to change verbosity
//! (defaults to `info`).

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use regimelab_core::data::{generate_series, write_csv, SyntheticConfig};
use regimelab_runner::{
    execute_run, render_comparison, render_report, run_comparison, save_artifacts, RunConfig,
};

#[derive(Parser)]
#[command(
    name = "regimelab",
    about = "RegimeLab CLI — regime-switching backtesting engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one backtest from a TOML config file and print the report.
    Run {
        /// Path to a TOML config file.
        config: PathBuf,

        /// Save report.json and equity.csv under this directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run several configs one after another and print a comparison table.
    Compare {
        /// Paths to TOML config files (at least two).
        #[arg(required = true, num_args = 2..)]
        configs: Vec<PathBuf>,
    },
    /// Generate a seeded synthetic price series and write it as CSV.
    Synth {
        /// Ticker to generate (names the output file).
        ticker: String,

        /// Number of trading days to emit.
        #[arg(long, default_value_t = 2520)]
        days: usize,

        /// Master seed; the same seed always yields the same series.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// First calendar date (YYYY-MM-DD). Defaults to 2015-01-02.
        #[arg(long)]
        start: Option<String>,

        /// Output directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, out } => run_cmd(&config, out.as_deref()),
        Commands::Compare { configs } => compare_cmd(&configs),
        Commands::Synth {
            ticker,
            days,
            seed,
            start,
            out_dir,
        } => synth_cmd(&ticker, days, seed, start.as_deref(), &out_dir),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn run_cmd(config_path: &std::path::Path, out: Option<&std::path::Path>) -> Result<()> {
    let config = RunConfig::from_file(config_path)?;
    let report = execute_run(&config)?;

    println!("{}", render_report(&report));

    if let Some(out_dir) = out {
        let run_dir = save_artifacts(&report, out_dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }

    Ok(())
}

fn compare_cmd(config_paths: &[PathBuf]) -> Result<()> {
    let mut configs = Vec::with_capacity(config_paths.len());
    for path in config_paths {
        let config = RunConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?;
        configs.push(config);
    }

    let reports = run_comparison(&configs)?;
    println!("{}", render_comparison(&reports));

    Ok(())
}

fn synth_cmd(
    ticker: &str,
    days: usize,
    seed: u64,
    start: Option<&str>,
    out_dir: &std::path::Path,
) -> Result<()> {
    if days == 0 {
        bail!("--days must be at least 1");
    }

    let mut config = SyntheticConfig {
        days,
        ..SyntheticConfig::default()
    };
    if let Some(s) = start {
        config.start_date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --start date '{s}'"))?;
    }

    let series = generate_series(ticker, seed, &config)?;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    let path = out_dir.join(format!("{ticker}.csv"));
    write_csv(&series, &path)?;

    println!("Wrote {} bars to {}", series.len(), path.display());
    Ok(())
}
