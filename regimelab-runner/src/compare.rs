//! Strictly sequential multi-config comparison.

use crate::config::RunConfig;
use crate::report::RunReport;
use crate::runner::{execute_run, RunError};

/// Run several configs in order, each against a fresh ledger and
/// strategy. The first failure aborts the comparison.
pub fn run_comparison(configs: &[RunConfig]) -> Result<Vec<RunReport>, RunError> {
    let mut reports = Vec::with_capacity(configs.len());
    for config in configs {
        reports.push(execute_run(config)?);
    }
    Ok(reports)
}

/// Render one aligned summary row per run.
pub fn render_comparison(reports: &[RunReport]) -> String {
    let mut out = String::with_capacity(512);
    out.push_str("=== Strategy Comparison ===\n");
    out.push_str(&format!(
        "{:<24} {:>14} {:>11} {:>11} {:>8} {:>9} {:>8}\n",
        "Strategy", "Final Value", "Total Ret", "Ann. Ret", "Sharpe", "Max DD", "Trades"
    ));
    for report in reports {
        let summary = &report.summary;
        let metrics = &summary.metrics;
        out.push_str(&format!(
            "{:<24} {:>14.2} {:>10.2}% {:>10.2}% {:>8.3} {:>8.2}% {:>8}\n",
            summary.strategy,
            summary.final_value,
            metrics.total_return * 100.0,
            metrics.annualized_return * 100.0,
            metrics.sharpe,
            metrics.max_drawdown * 100.0,
            summary.trade_count
        ));
    }
    out
}
