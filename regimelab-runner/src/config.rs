//! Serializable run configuration.
//!
//! A `RunConfig` is the complete, reproducible description of one
//! backtest: engine settings, data source, and strategy. Configs live
//! as TOML on disk, are validated fail-loud after parsing, and hash
//! into a deterministic run ID so identical configs name identical
//! runs.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use regimelab_core::domain::SellMode;
use regimelab_core::engine::EngineSettings;
use regimelab_core::strategy::{
    AllocationTable, BollingerTouchDetector, BreakoutDetector, BuyHoldStrategy, DualMaDetector,
    EmaCrossDetector, RegimeAllocation, RegimeDetector, RegimeStrategy, SmaCrossDetector,
    Strategy, StrategyError,
};

/// Unique identifier for a run (content-addressable hash of its config).
pub type RunId = String;

/// Errors from config loading and validation. All fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {message}", .path.display())]
    ReadFailed { path: PathBuf, message: String },

    #[error("failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("config serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("data.tickers must not be empty")]
    EmptyTickers,

    #[error("ticker {0} appears more than once in data.tickers")]
    DuplicateTicker(String),

    #[error("start_date {start} is after end_date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("{role} {ticker} is not in data.tickers")]
    UnknownTicker { ticker: String, role: &'static str },

    #[error("{field}: {message}")]
    InvalidValue { field: &'static str, message: String },

    #[error("strategy config rejected: {0}")]
    Strategy(#[from] StrategyError),
}

/// Complete description of one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub backtest: BacktestSection,
    pub data: DataSection,
    pub strategy: StrategySection,
}

impl RunConfig {
    /// Parse and validate a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&text)
    }

    /// Parse and validate a TOML config string.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Deterministic content hash of this configuration.
    ///
    /// Two identical configs map to the same run ID, so artifacts can
    /// be located by config alone. Anything that changes the outcome
    /// of a run (dates, cash, seed, strategy parameters) changes the
    /// ID.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        let hash = blake3::hash(json.as_bytes());
        Ok(hash.to_hex().to_string())
    }

    /// Cross-field checks the section types cannot do alone. Allocation
    /// ratio rules live in the core constructors; this layer only
    /// verifies that every ticker the strategy references is actually
    /// part of the data universe, and that the window and source
    /// settings are coherent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.tickers.is_empty() {
            return Err(ConfigError::EmptyTickers);
        }
        let mut seen = BTreeSet::new();
        for ticker in &self.data.tickers {
            if !seen.insert(ticker.as_str()) {
                return Err(ConfigError::DuplicateTicker(ticker.clone()));
            }
        }

        if let (Some(start), Some(end)) = (self.backtest.start_date, self.backtest.end_date) {
            if start > end {
                return Err(ConfigError::InvalidDateRange { start, end });
            }
        }

        if self.data.source == DataSource::Synthetic && self.data.days == 0 {
            return Err(ConfigError::InvalidValue {
                field: "data.days",
                message: "synthetic runs need at least one day".to_string(),
            });
        }

        match &self.strategy {
            StrategySection::RegimeAllocation {
                base_ticker,
                allocation,
                ratchet,
                ..
            } => {
                self.require_ticker(base_ticker, "strategy.base_ticker")?;
                for entry in allocation {
                    for weight in &entry.weights {
                        self.require_ticker(&weight.ticker, "allocation ticker")?;
                    }
                }
                if let Some(ratchet) = ratchet {
                    self.require_ticker(&ratchet.risk_ticker, "ratchet risk ticker")?;
                }
            }
            StrategySection::BuyHold { base_ticker, .. } => {
                self.require_ticker(base_ticker, "strategy.base_ticker")?;
            }
        }

        Ok(())
    }

    fn require_ticker(&self, ticker: &str, role: &'static str) -> Result<(), ConfigError> {
        if self.data.tickers.iter().any(|t| t == ticker) {
            Ok(())
        } else {
            Err(ConfigError::UnknownTicker {
                ticker: ticker.to_string(),
                role,
            })
        }
    }
}

/// Engine and ledger settings for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    /// Start of the run window (inclusive). Default: full series.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    /// End of the run window (inclusive). Default: full series.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,

    /// Commission as a fraction of traded value.
    #[serde(default = "default_commission_rate")]
    pub commission_rate: f64,

    /// Cash credited on the first trading day of each month.
    #[serde(default)]
    pub monthly_addition: f64,

    #[serde(default)]
    pub sell_mode: SellMode,

    /// Annual risk-free rate used by Sharpe/Sortino.
    #[serde(default)]
    pub risk_free_rate: f64,
}

impl BacktestSection {
    /// The core engine settings this section describes. Range checks
    /// happen in the engine constructor.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            initial_cash: self.initial_cash,
            commission_rate: self.commission_rate,
            monthly_addition: self.monthly_addition,
            sell_mode: self.sell_mode,
            risk_free_rate: self.risk_free_rate,
        }
    }
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            initial_cash: default_initial_cash(),
            commission_rate: default_commission_rate(),
            monthly_addition: 0.0,
            sell_mode: SellMode::default(),
            risk_free_rate: 0.0,
        }
    }
}

fn default_initial_cash() -> f64 {
    100_000.0
}

fn default_commission_rate() -> f64 {
    0.001
}

/// Where bars come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSource {
    /// One `<TICKER>.csv` per ticker under `data.dir`.
    Csv,
    /// Seeded random walks; no files needed.
    Synthetic,
}

/// Data source settings for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    pub source: DataSource,

    /// CSV directory. Ignored for synthetic runs.
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,

    pub tickers: Vec<String>,

    /// Master seed for synthetic runs; same seed, same universe.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Trading days per synthetic series.
    #[serde(default = "default_days")]
    pub days: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_seed() -> u64 {
    42
}

fn default_days() -> usize {
    2520
}

/// Strategy configuration (serializable enum).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategySection {
    /// Regime-switching target allocation driven by a detector.
    RegimeAllocation {
        /// Ticker whose bars the detector classifies.
        base_ticker: String,
        detector: DetectorConfig,
        allocation: Vec<RegimeAllocation>,
        #[serde(default)]
        ratchet: Option<RatchetConfig>,
    },

    /// Buy on the first bar, hold forever. The comparison baseline.
    BuyHold {
        base_ticker: String,
        #[serde(default = "default_position_pct")]
        position_pct: f64,
    },
}

fn default_position_pct() -> f64 {
    1.0
}

impl StrategySection {
    /// The ticker whose bars drive signals.
    pub fn base_ticker(&self) -> &str {
        match self {
            StrategySection::RegimeAllocation { base_ticker, .. } => base_ticker,
            StrategySection::BuyHold { base_ticker, .. } => base_ticker,
        }
    }

    /// Instantiate the configured strategy. Allocation tables, policy
    /// compatibility, and ratchet references are cross-validated by
    /// the core constructors here, fail-loud.
    pub fn build(&self) -> Result<Box<dyn Strategy>, ConfigError> {
        match self {
            StrategySection::RegimeAllocation {
                base_ticker,
                detector,
                allocation,
                ratchet,
            } => {
                let table = AllocationTable::new(allocation.clone())?;
                let strategy = RegimeStrategy::new(
                    base_ticker.clone(),
                    detector.build(),
                    table,
                    ratchet.as_ref().map(|r| r.risk_ticker.clone()),
                )?;
                Ok(Box::new(strategy))
            }
            StrategySection::BuyHold {
                base_ticker,
                position_pct,
            } => {
                let strategy = BuyHoldStrategy::new(base_ticker.clone(), *position_pct)?;
                Ok(Box::new(strategy))
            }
        }
    }
}

/// Regime detector configuration (serializable enum).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectorConfig {
    /// Close vs one SMA: Above/Below.
    SmaCross {
        period: usize,
        #[serde(default = "default_min_periods")]
        min_periods: usize,
    },

    /// Close vs one EMA: Above/Below.
    EmaCross { period: usize },

    /// Slow SMA plus fast EMA filter: Strong/Weak/Below.
    DualMa {
        slow_period: usize,
        fast_period: usize,
    },

    /// Prior-peak breakout over an MA floor: Strong/Weak.
    Breakout { ma_period: usize, lookback: usize },

    /// Bollinger band touches: Neutral regime, touch events.
    BollingerTouch {
        period: usize,
        #[serde(default = "default_num_std")]
        num_std: f64,
    },
}

fn default_min_periods() -> usize {
    1
}

fn default_num_std() -> f64 {
    2.0
}

impl DetectorConfig {
    /// Instantiate the configured detector.
    pub fn build(&self) -> Box<dyn RegimeDetector> {
        match self {
            DetectorConfig::SmaCross {
                period,
                min_periods,
            } => Box::new(SmaCrossDetector::new(*period, *min_periods)),
            DetectorConfig::EmaCross { period } => Box::new(EmaCrossDetector::new(*period)),
            DetectorConfig::DualMa {
                slow_period,
                fast_period,
            } => Box::new(DualMaDetector::new(*slow_period, *fast_period)),
            DetectorConfig::Breakout {
                ma_period,
                lookback,
            } => Box::new(BreakoutDetector::new(*ma_period, *lookback)),
            DetectorConfig::BollingerTouch { period, num_std } => {
                Box::new(BollingerTouchDetector::new(*period, *num_std))
            }
        }
    }
}

/// Sell-suppression ratchet settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatchetConfig {
    /// Ticker whose sells are held back until the base recovers its
    /// pre-transition close.
    pub risk_ticker: String,
}
