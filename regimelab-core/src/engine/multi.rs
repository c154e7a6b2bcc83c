//! Multi-asset backtest engine.
//!
//! Drives a strategy over union-calendar aligned data. Signals come
//! from the base ticker's own (dense) bar history; on union days where
//! the base ticker has no bar, prices and dividends still apply but no
//! orders are dispatched.

use std::collections::HashMap;

use chrono::Datelike;

use crate::data::AlignedData;
use crate::domain::Portfolio;
use crate::strategy::Strategy;

use super::{dispatch_orders, summarize, EngineError, EngineSettings, RunSummary};

pub struct MultiAssetEngine {
    settings: EngineSettings,
}

impl MultiAssetEngine {
    pub fn new(settings: EngineSettings) -> Result<Self, EngineError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn run(
        &self,
        strategy: &mut dyn Strategy,
        aligned: &AlignedData,
    ) -> Result<RunSummary, EngineError> {
        if aligned.is_empty() {
            return Err(EngineError::DataValidation(
                "aligned data has no trading days".to_string(),
            ));
        }
        let profile = strategy.profile().clone();
        if !aligned.has_ticker(&profile.base_ticker) {
            return Err(EngineError::DataValidation(format!(
                "base ticker {} is not in the aligned data",
                profile.base_ticker
            )));
        }
        for ticker in &profile.managed_tickers {
            if !aligned.has_ticker(ticker) {
                return Err(EngineError::DataValidation(format!(
                    "managed ticker {ticker} is not in the aligned data"
                )));
            }
        }

        strategy.reset();
        let base_bars = aligned.dense_bars(&profile.base_ticker);
        strategy.prepare(&base_bars)?;

        let mut portfolio = Portfolio::with_sell_mode(
            self.settings.initial_cash,
            self.settings.commission_rate,
            self.settings.sell_mode,
        );
        let mut skipped_orders = 0usize;
        let mut last_month: Option<(i32, u32)> = None;
        // index into the base ticker's dense bar history
        let mut base_idx = 0usize;

        tracing::info!(
            strategy = strategy.name(),
            base = %profile.base_ticker,
            days = aligned.num_days(),
            "multi-asset run started"
        );

        for (day, date) in aligned.dates().iter().enumerate() {
            // ─── Phase 1: monthly cash addition ───
            if self.settings.monthly_addition > 0.0 {
                let month = (date.year(), date.month());
                if last_month != Some(month) {
                    portfolio.cash += self.settings.monthly_addition;
                    last_month = Some(month);
                    tracing::debug!(
                        date = %date,
                        amount = self.settings.monthly_addition,
                        "monthly addition"
                    );
                }
            }

            // ─── Phase 2: prices and dividends ───
            let mut prices: HashMap<String, f64> = HashMap::new();
            for ticker in aligned.tickers() {
                let Some(bar) = aligned.bar(ticker, day) else {
                    continue;
                };
                portfolio.update_price(ticker, bar.close);
                prices.insert(ticker.clone(), bar.close);
                if bar.dividend > 0.0 {
                    let credited = portfolio.receive_dividend(ticker, bar.dividend);
                    if credited > 0.0 {
                        tracing::debug!(ticker = %ticker, amount = credited, "dividend credited");
                    }
                }
            }

            // ─── Phase 3: signals and orders ───
            if aligned.bar(&profile.base_ticker, day).is_some() {
                skipped_orders +=
                    dispatch_orders(strategy, base_idx, *date, &prices, &mut portfolio)?;
                base_idx += 1;
            }

            // ─── Phase 4: snapshot ───
            portfolio.snapshot(*date);
        }

        let summary = summarize(
            strategy.name(),
            aligned.tickers().to_vec(),
            &portfolio,
            &self.settings,
            skipped_orders,
        )?;
        tracing::info!(
            final_value = summary.final_value,
            trades = summary.trade_count,
            skipped = summary.skipped_orders,
            "multi-asset run finished"
        );
        Ok(summary)
    }
}
