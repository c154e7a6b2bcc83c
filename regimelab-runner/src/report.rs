//! Run reports — assembly, JSON round-trip, plain-text rendering.
//!
//! A `RunReport` bundles the run's identity (run ID plus the exact
//! config that produced it) with the engine's `RunSummary`. Persisted
//! reports carry a `schema_version`; unknown versions are rejected on
//! load.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use regimelab_core::engine::RunSummary;

use crate::config::{RunConfig, RunId};

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from report serialization.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported schema version {found} (max supported: {max})")]
    UnsupportedSchema { found: u32, max: u32 },
}

/// Everything one run persists: identity, provenance, results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    /// The exact config the run executed, so any report can be re-run.
    pub config: RunConfig,
    pub summary: RunSummary,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Serialize a `RunReport` to pretty JSON.
pub fn export_json(report: &RunReport) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Deserialize a `RunReport` from JSON, rejecting unknown schema
/// versions.
pub fn import_json(json: &str) -> Result<RunReport, ReportError> {
    let report: RunReport = serde_json::from_str(json)?;
    if report.schema_version > SCHEMA_VERSION {
        return Err(ReportError::UnsupportedSchema {
            found: report.schema_version,
            max: SCHEMA_VERSION,
        });
    }
    Ok(report)
}

/// Render a plain-text report for one run.
pub fn render_report(report: &RunReport) -> String {
    let summary = &report.summary;
    let metrics = &summary.metrics;
    let mut out = String::with_capacity(2048);

    out.push_str("=== Backtest Report ===\n");
    out.push_str(&format!("Run ID:         {}\n", report.run_id));
    out.push_str(&format!("Strategy:       {}\n", summary.strategy));
    out.push_str(&format!("Tickers:        {}\n", summary.tickers.join(", ")));
    out.push_str(&format!(
        "Period:         {} to {} ({} trading days)\n",
        summary.start_date, summary.end_date, summary.trading_days
    ));
    out.push_str(&format!("Initial Cash:   ${:.2}\n", summary.initial_cash));
    out.push_str(&format!("Final Value:    ${:.2}\n", summary.final_value));
    out.push('\n');

    out.push_str("--- Performance ---\n");
    out.push_str(&format!(
        "Total Return:   {:.2}%\n",
        metrics.total_return * 100.0
    ));
    out.push_str(&format!(
        "Annualized:     {:.2}%\n",
        metrics.annualized_return * 100.0
    ));
    out.push_str(&format!(
        "Volatility:     {:.2}%\n",
        metrics.volatility * 100.0
    ));
    out.push_str(&format!("Sharpe:         {:.3}\n", metrics.sharpe));
    out.push_str(&format!("Sortino:        {:.3}\n", metrics.sortino));
    out.push_str(&format!("Calmar:         {:.3}\n", metrics.calmar));
    if metrics.max_drawdown < 0.0 {
        let window = match (summary.max_drawdown_peak, summary.max_drawdown_trough) {
            (Some(peak), Some(trough)) => format!(" ({peak} to {trough})"),
            _ => String::new(),
        };
        out.push_str(&format!(
            "Max Drawdown:   {:.2}%{window}\n",
            metrics.max_drawdown * 100.0
        ));
        let recovery = match metrics.recovery_days {
            Some(days) => format!("{days} days"),
            None => "not recovered".to_string(),
        };
        out.push_str(&format!("Recovery:       {recovery}\n"));
    } else {
        out.push_str("Max Drawdown:   0.00%\n");
    }
    out.push_str(&format!("Trades:         {}\n", summary.trade_count));
    out.push_str(&format!(
        "Commission:     ${:.2}\n",
        summary.total_commission
    ));
    if summary.skipped_orders > 0 {
        out.push_str(&format!("Skipped Orders: {}\n", summary.skipped_orders));
    }
    out.push('\n');

    out.push_str("--- Holdings ---\n");
    if summary.holdings.is_empty() {
        out.push_str("(all cash)\n");
    } else {
        out.push_str(&format!(
            "{:<8} {:>8} {:>10} {:>10} {:>12} {:>16}\n",
            "Ticker", "Qty", "Avg Cost", "Last", "Value", "P&L"
        ));
        for holding in &summary.holdings {
            out.push_str(&format!(
                "{:<8} {:>8} {:>10.2} {:>10.2} {:>12.2} {:>9.2} ({:+.1}%)\n",
                holding.ticker,
                holding.quantity,
                holding.avg_cost,
                holding.last_price,
                holding.market_value,
                holding.unrealized_pnl,
                holding.unrealized_pnl_pct * 100.0
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use regimelab_core::domain::{EquityPoint, HoldingSummary};
    use regimelab_core::metrics::PerformanceMetrics;

    use crate::config::{BacktestSection, DataSection, DataSource, StrategySection};

    fn day(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    fn sample_config() -> RunConfig {
        RunConfig {
            backtest: BacktestSection::default(),
            data: DataSection {
                source: DataSource::Synthetic,
                dir: "data".into(),
                tickers: vec!["QQQ".into(), "BIL".into()],
                seed: 42,
                days: 252,
            },
            strategy: StrategySection::BuyHold {
                base_ticker: "QQQ".into(),
                position_pct: 1.0,
            },
        }
    }

    fn sample_summary() -> RunSummary {
        RunSummary {
            strategy: "regime_sma_cross_200".into(),
            tickers: vec!["BIL".into(), "QQQ".into()],
            start_date: day(1, 2),
            end_date: day(12, 31),
            trading_days: 252,
            initial_cash: 100_000.0,
            final_value: 123_456.78,
            metrics: PerformanceMetrics {
                total_return: 0.2346,
                annualized_return: 0.3621,
                volatility: 0.18,
                sharpe: 1.25,
                sortino: 1.8,
                calmar: 2.1,
                max_drawdown: -0.083,
                recovery_days: Some(37),
            },
            max_drawdown_peak: Some(day(4, 2)),
            max_drawdown_trough: Some(day(5, 14)),
            trade_count: 18,
            total_commission: 412.55,
            skipped_orders: 0,
            holdings: vec![HoldingSummary {
                ticker: "QQQ".into(),
                quantity: 210,
                avg_cost: 402.10,
                last_price: 512.30,
                market_value: 107_583.0,
                unrealized_pnl: 23_142.0,
                unrealized_pnl_pct: 0.2741,
                first_buy_date: day(1, 2),
            }],
            equity_curve: vec![
                EquityPoint {
                    date: day(1, 2),
                    cash: 100_000.0,
                    market_value: 0.0,
                    total_value: 100_000.0,
                    position_count: 0,
                },
                EquityPoint {
                    date: day(12, 31),
                    cash: 15_873.78,
                    market_value: 107_583.0,
                    total_value: 123_456.78,
                    position_count: 1,
                },
            ],
        }
    }

    fn sample_report() -> RunReport {
        let config = sample_config();
        let run_id = config.run_id().unwrap();
        RunReport {
            schema_version: SCHEMA_VERSION,
            run_id,
            config,
            summary: sample_summary(),
        }
    }

    #[test]
    fn json_roundtrip() {
        let original = sample_report();
        let json = export_json(&original).unwrap();
        let restored = import_json(&json).unwrap();

        assert_eq!(restored.schema_version, SCHEMA_VERSION);
        assert_eq!(restored.run_id, original.run_id);
        assert_eq!(restored.config, original.config);
        assert_eq!(restored.summary.strategy, original.summary.strategy);
        assert_eq!(restored.summary.trade_count, original.summary.trade_count);
        assert!((restored.summary.metrics.sharpe - original.summary.metrics.sharpe).abs() < 1e-12);
        assert_eq!(
            restored.summary.equity_curve.len(),
            original.summary.equity_curve.len()
        );
    }

    #[test]
    fn json_rejects_unknown_version() {
        let mut report = sample_report();
        report.schema_version = 99;
        let json = export_json(&report).unwrap();

        let err = import_json(&json).unwrap_err();
        assert!(matches!(
            err,
            ReportError::UnsupportedSchema { found: 99, max: SCHEMA_VERSION }
        ));
    }

    #[test]
    fn json_defaults_missing_schema_version() {
        let mut value = serde_json::to_value(sample_report()).unwrap();
        value
            .as_object_mut()
            .unwrap()
            .remove("schema_version")
            .unwrap();

        let restored = import_json(&value.to_string()).unwrap();
        assert_eq!(restored.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn report_lists_headline_numbers() {
        let text = render_report(&sample_report());

        assert!(text.contains("=== Backtest Report ==="));
        assert!(text.contains("Strategy:       regime_sma_cross_200"));
        assert!(text.contains("Tickers:        BIL, QQQ"));
        assert!(text.contains("Period:         2024-01-02 to 2024-12-31 (252 trading days)"));
        assert!(text.contains("Final Value:    $123456.78"));
        assert!(text.contains("Total Return:   23.46%"));
        assert!(text.contains("Sharpe:         1.250"));
        assert!(text.contains("Max Drawdown:   -8.30% (2024-04-02 to 2024-05-14)"));
        assert!(text.contains("Recovery:       37 days"));
        assert!(text.contains("QQQ"));
        assert!(text.contains("(+27.4%)"));
    }

    #[test]
    fn report_flags_unrecovered_drawdown() {
        let mut report = sample_report();
        report.summary.metrics.recovery_days = None;
        let text = render_report(&report);
        assert!(text.contains("Recovery:       not recovered"));
    }

    #[test]
    fn report_omits_drawdown_window_on_flat_curve() {
        let mut report = sample_report();
        report.summary.metrics.max_drawdown = 0.0;
        report.summary.max_drawdown_peak = None;
        report.summary.max_drawdown_trough = None;
        let text = render_report(&report);
        assert!(text.contains("Max Drawdown:   0.00%"));
        assert!(!text.contains("Recovery:"));
    }

    #[test]
    fn report_shows_all_cash_without_holdings() {
        let mut report = sample_report();
        report.summary.holdings.clear();
        let text = render_report(&report);
        assert!(text.contains("(all cash)"));
    }

    #[test]
    fn report_mentions_skipped_orders_only_when_present() {
        let clean = render_report(&sample_report());
        assert!(!clean.contains("Skipped Orders"));

        let mut report = sample_report();
        report.summary.skipped_orders = 3;
        let text = render_report(&report);
        assert!(text.contains("Skipped Orders: 3"));
    }
}
