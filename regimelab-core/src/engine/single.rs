//! Single-asset backtest engine.
//!
//! Drives a strategy over one price series. The managed universe must
//! collapse to the series ticker; runs are fixed-capital (no monthly
//! additions).

use std::collections::HashMap;

use crate::data::PriceSeries;
use crate::domain::Portfolio;
use crate::strategy::Strategy;

use super::{dispatch_orders, summarize, EngineError, EngineSettings, RunSummary};

#[derive(Debug)]
pub struct SingleAssetEngine {
    settings: EngineSettings,
}

impl SingleAssetEngine {
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
        series: &PriceSeries,
    ) -> Result<RunSummary, EngineError> {
        let profile = strategy.profile().clone();
        if profile.base_ticker != series.ticker() {
            return Err(EngineError::Configuration(format!(
                "strategy is driven by {} but the series holds {}",
                profile.base_ticker,
                series.ticker()
            )));
        }
        if let Some(foreign) = profile
            .managed_tickers
            .iter()
            .find(|t| t.as_str() != series.ticker())
        {
            return Err(EngineError::Configuration(format!(
                "strategy trades {foreign}; a single-asset run on {} cannot",
                series.ticker()
            )));
        }

        strategy.reset();
        strategy.prepare(series.bars())?;

        let mut portfolio = Portfolio::with_sell_mode(
            self.settings.initial_cash,
            self.settings.commission_rate,
            self.settings.sell_mode,
        );
        let mut skipped_orders = 0usize;
        let mut prices: HashMap<String, f64> = HashMap::with_capacity(1);

        tracing::info!(
            strategy = strategy.name(),
            ticker = series.ticker(),
            bars = series.len(),
            "single-asset run started"
        );

        for (idx, bar) in series.bars().iter().enumerate() {
            // ─── Prices and dividends ───
            portfolio.update_price(&bar.ticker, bar.close);
            if bar.dividend > 0.0 {
                let credited = portfolio.receive_dividend(&bar.ticker, bar.dividend);
                if credited > 0.0 {
                    tracing::debug!(ticker = %bar.ticker, amount = credited, "dividend credited");
                }
            }

            // ─── Orders ───
            prices.clear();
            prices.insert(bar.ticker.clone(), bar.close);
            skipped_orders += dispatch_orders(strategy, idx, bar.date, &prices, &mut portfolio)?;

            // ─── Snapshot ───
            portfolio.snapshot(bar.date);
        }

        let summary = summarize(
            strategy.name(),
            vec![series.ticker().to_string()],
            &portfolio,
            &self.settings,
            skipped_orders,
        )?;
        tracing::info!(
            final_value = summary.final_value,
            trades = summary.trade_count,
            "single-asset run finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;
    use crate::strategy::{
        AllocationTable, AllocationWeight, BuyHoldStrategy, OrderIntent, RebalancePolicy, Regime,
        RegimeAllocation, RegimeStrategy, SmaCrossDetector, StrategyError, StrategyProfile,
    };
    use chrono::NaiveDate;

    fn test_series(closes: &[f64]) -> PriceSeries {
        PriceSeries::new("TEST", make_bars(closes)).unwrap()
    }

    fn test_series_with_dividend(closes: &[f64], idx: usize, dividend: f64) -> PriceSeries {
        let mut bars = make_bars(closes);
        bars[idx].dividend = dividend;
        PriceSeries::new("TEST", bars).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn buy_hold_full_run() {
        let series = test_series(&[100.0, 110.0, 121.0]);
        let mut strategy = BuyHoldStrategy::new("TEST", 1.0).unwrap();
        let engine = SingleAssetEngine::new(EngineSettings {
            initial_cash: 10_000.0,
            ..EngineSettings::default()
        })
        .unwrap();

        let summary = engine.run(&mut strategy, &series).unwrap();
        assert_eq!(summary.strategy, "buy_hold");
        assert_eq!(summary.tickers, vec!["TEST"]);
        assert_eq!(summary.start_date, day(2));
        assert_eq!(summary.end_date, day(4));
        assert_eq!(summary.trading_days, 3);
        assert_eq!(summary.trade_count, 1);
        assert_eq!(summary.skipped_orders, 0);

        // 10_000 * 0.999 / 100 = 99 shares; cash left 90.1; final
        // equity 99 * 121 + 90.1
        assert!((summary.final_value - 12_069.1).abs() < 1e-6);
        assert!((summary.total_commission - 9.9).abs() < 1e-9);
        assert_eq!(summary.holdings.len(), 1);
        assert_eq!(summary.holdings[0].quantity, 99);
        assert_eq!(summary.equity_curve.len(), 3);
    }

    #[test]
    fn regime_flip_sells_then_rebuys() {
        // sma(3, mp=1) regimes: Above, Below, Above, Above
        let series = test_series(&[10.0, 8.0, 9.0, 12.0]);
        let table = AllocationTable::new(vec![
            RegimeAllocation {
                regime: Regime::Above,
                weights: vec![AllocationWeight {
                    ticker: "TEST".to_string(),
                    pct: 1.0,
                }],
                rebalance: RebalancePolicy::TransitionOnly,
            },
            RegimeAllocation {
                regime: Regime::Below,
                weights: Vec::new(), // all cash
                rebalance: RebalancePolicy::TransitionOnly,
            },
        ])
        .unwrap();
        let mut strategy =
            RegimeStrategy::new("TEST", Box::new(SmaCrossDetector::new(3, 1)), table, None)
                .unwrap();
        let engine = SingleAssetEngine::new(EngineSettings {
            initial_cash: 1_000.0,
            commission_rate: 0.0,
            ..EngineSettings::default()
        })
        .unwrap();

        let summary = engine.run(&mut strategy, &series).unwrap();
        // bar 0: buy 100 @ 10; bar 1: flip Below, sell 100 @ 8;
        // bar 2: flip Above, buy 88 @ 9; bar 3: hold
        assert_eq!(summary.trade_count, 3);
        assert_eq!(summary.final_value, 1_064.0);
        let values: Vec<f64> = summary
            .equity_curve
            .iter()
            .map(|p| p.total_value)
            .collect();
        assert_eq!(values, vec![1_000.0, 800.0, 800.0, 1_064.0]);
        // the drawdown episode runs from the bar 0 peak to the bar 1
        // trough
        assert_eq!(summary.max_drawdown_peak, Some(day(2)));
        assert_eq!(summary.max_drawdown_trough, Some(day(3)));
        assert!((summary.metrics.max_drawdown + 0.2).abs() < 1e-12);
    }

    #[test]
    fn dividends_credit_cash_while_held() {
        let series = test_series_with_dividend(&[100.0, 100.0, 100.0], 1, 0.5);
        let mut strategy = BuyHoldStrategy::new("TEST", 1.0).unwrap();
        let engine = SingleAssetEngine::new(EngineSettings {
            initial_cash: 10_000.0,
            commission_rate: 0.0,
            ..EngineSettings::default()
        })
        .unwrap();

        let summary = engine.run(&mut strategy, &series).unwrap();
        // 100 shares bought on bar 0; bar 1 pays 0.5/share = 50 cash
        assert_eq!(summary.final_value, 10_050.0);
    }

    #[test]
    fn ticker_mismatch_is_a_configuration_error() {
        let series = test_series(&[100.0, 110.0]);
        let mut strategy = BuyHoldStrategy::new("QQQ", 1.0).unwrap();
        let engine = SingleAssetEngine::new(EngineSettings::default()).unwrap();
        let err = engine.run(&mut strategy, &series).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn multi_ticker_universe_is_rejected() {
        let series = test_series(&[10.0, 8.0]);
        let table = AllocationTable::new(vec![
            RegimeAllocation {
                regime: Regime::Above,
                weights: vec![AllocationWeight {
                    ticker: "TEST".to_string(),
                    pct: 1.0,
                }],
                rebalance: RebalancePolicy::TransitionOnly,
            },
            RegimeAllocation {
                regime: Regime::Below,
                weights: vec![AllocationWeight {
                    ticker: "BIL".to_string(),
                    pct: 1.0,
                }],
                rebalance: RebalancePolicy::TransitionOnly,
            },
        ])
        .unwrap();
        let mut strategy =
            RegimeStrategy::new("TEST", Box::new(SmaCrossDetector::new(3, 1)), table, None)
                .unwrap();
        let engine = SingleAssetEngine::new(EngineSettings::default()).unwrap();
        let err = engine.run(&mut strategy, &series).unwrap_err();
        match err {
            EngineError::Configuration(msg) => assert!(msg.contains("BIL"), "{msg}"),
            other => panic!("expected Configuration, got {other:?}"),
        }
    }

    #[test]
    fn invalid_settings_rejected_at_construction() {
        let err = SingleAssetEngine::new(EngineSettings {
            commission_rate: -0.5,
            ..EngineSettings::default()
        })
        .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    /// Always tries to sell shares it never bought. The engine must
    /// count the rejection and keep going.
    struct GhostSeller {
        profile: StrategyProfile,
        prepared_len: Option<usize>,
    }

    impl GhostSeller {
        fn new() -> Self {
            Self {
                profile: StrategyProfile {
                    base_ticker: "TEST".to_string(),
                    managed_tickers: vec!["TEST".to_string()],
                },
                prepared_len: None,
            }
        }
    }

    impl Strategy for GhostSeller {
        fn name(&self) -> &str {
            "ghost_seller"
        }

        fn profile(&self) -> &StrategyProfile {
            &self.profile
        }

        fn reset(&mut self) {
            self.prepared_len = None;
        }

        fn prepare(&mut self, bars: &[crate::domain::Bar]) -> Result<(), StrategyError> {
            self.prepared_len = Some(bars.len());
            Ok(())
        }

        fn signal_at(&self, _idx: usize) -> crate::strategy::Signal {
            crate::strategy::Signal::Hold
        }

        fn desired_orders(
            &self,
            idx: usize,
            _prices: &HashMap<String, f64>,
            _portfolio: &Portfolio,
        ) -> Result<Vec<OrderIntent>, StrategyError> {
            if self.prepared_len.is_none() {
                return Err(StrategyError::NotPrepared);
            }
            if idx == 0 {
                Ok(vec![OrderIntent {
                    ticker: "TEST".to_string(),
                    delta: -5,
                }])
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[test]
    fn rejected_orders_are_counted_not_fatal() {
        let series = test_series(&[100.0, 100.0]);
        let mut strategy = GhostSeller::new();
        let engine = SingleAssetEngine::new(EngineSettings::default()).unwrap();
        let summary = engine.run(&mut strategy, &series).unwrap();
        // the unheld sell is skipped on bar 0, once: the buy pass
        // filters it out
        assert_eq!(summary.skipped_orders, 1);
        assert_eq!(summary.trade_count, 0);
        assert_eq!(summary.final_value, 100_000.0);
    }
}
