//! RegimeLab Core — ledger accounting, regime strategies, backtest engines, metrics.
//!
//! This crate contains the heart of the backtesting toolkit:
//! - Domain types (bars, positions, trades, the portfolio ledger)
//! - Pure equity-curve metrics (Sharpe, Sortino, Calmar, drawdown)
//! - Precomputed indicators (SMA, EMA, Bollinger bands, rolling max)
//! - The target-allocation strategy interface with its regime
//!   state machine and declarative per-regime allocation tables
//! - Single-asset and multi-asset day-by-day engines
//! - Data layer: CSV ingestion, schema validation, union-calendar
//!   alignment, synthetic series generation

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod metrics;
pub mod strategy;
