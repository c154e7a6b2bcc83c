//! Portfolio — the ledger: cash, positions, trade log, equity curve.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::position::Position;
use super::trade::{Trade, TradeSide};

/// Recoverable order failures. The engine logs and skips the order;
/// the simulation continues.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient funds: need {required:.2}, have {available:.2}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("invalid order: {0}")]
    InvalidOrder(String),
}

/// How sells that exceed the held quantity are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SellMode {
    /// Clamp the order down to the held quantity.
    #[default]
    Permissive,
    /// Reject the order with `InvalidOrder`.
    Strict,
}

/// One daily snapshot of the ledger. The ordered sequence of these is
/// the equity curve consumed by metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub cash: f64,
    pub market_value: f64,
    pub total_value: f64,
    pub position_count: usize,
}

/// Serializable per-position view for reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingSummary {
    pub ticker: String,
    pub quantity: u64,
    pub avg_cost: f64,
    pub last_price: f64,
    pub market_value: f64,
    pub unrealized_pnl: f64,
    pub unrealized_pnl_pct: f64,
    pub first_buy_date: NaiveDate,
}

/// The ledger. Pure bookkeeping with no market knowledge: cash, a
/// ticker → position map, an append-only trade log, and an append-only
/// equity curve.
///
/// Invariants, enforced here and property-tested:
/// - `total_value() == cash + Σ position.market_value()` at all times
/// - `cash >= 0` after every operation; a buy that would break this is
///   rejected with `InsufficientFunds`
/// - a position with quantity 0 does not exist (removed, not zeroed)
///
/// Commission is a proportional rate charged on both sides: it is added
/// to the cash debit on buys and deducted from proceeds on sells.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_cash: f64,
    pub commission_rate: f64,
    pub sell_mode: SellMode,
    pub positions: HashMap<String, Position>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub total_commission: f64,
}

impl Portfolio {
    pub fn new(initial_cash: f64, commission_rate: f64) -> Self {
        Self::with_sell_mode(initial_cash, commission_rate, SellMode::default())
    }

    pub fn with_sell_mode(initial_cash: f64, commission_rate: f64, sell_mode: SellMode) -> Self {
        Self {
            cash: initial_cash,
            initial_cash,
            commission_rate,
            sell_mode,
            positions: HashMap::new(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
            total_commission: 0.0,
        }
    }

    /// Buy `quantity` whole shares at `price`.
    ///
    /// Debits `quantity * price * (1 + commission_rate)` from cash.
    /// Creates the position on a first buy; otherwise accumulates
    /// quantity and recomputes the average cost as the weighted average
    /// of the old basis and the new gross amount.
    pub fn buy(
        &mut self,
        ticker: &str,
        quantity: u64,
        price: f64,
        date: NaiveDate,
    ) -> Result<(), LedgerError> {
        if quantity == 0 {
            return Err(LedgerError::InvalidOrder(format!(
                "buy quantity must be positive ({ticker})"
            )));
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(LedgerError::InvalidOrder(format!(
                "buy price must be positive ({ticker}: {price})"
            )));
        }

        let amount = quantity as f64 * price;
        let commission = amount * self.commission_rate;
        let required = amount + commission;
        if self.cash < required {
            return Err(LedgerError::InsufficientFunds {
                required,
                available: self.cash,
            });
        }

        self.cash -= required;
        self.total_commission += commission;

        match self.positions.get_mut(ticker) {
            Some(pos) => {
                let old_cost = pos.cost();
                let new_quantity = pos.quantity + quantity;
                pos.avg_cost = (old_cost + amount) / new_quantity as f64;
                pos.quantity = new_quantity;
                pos.last_price = price;
            }
            None => {
                self.positions
                    .insert(ticker.to_string(), Position::new(ticker.to_string(), quantity, price, date));
            }
        }

        self.trades.push(Trade {
            date,
            ticker: ticker.to_string(),
            side: TradeSide::Buy,
            quantity,
            price,
            commission,
            amount,
        });
        Ok(())
    }

    /// Sell `quantity` whole shares at `price`.
    ///
    /// Credits `quantity * price * (1 - commission_rate)` to cash.
    /// Selling an unheld ticker or a zero quantity is an `InvalidOrder`.
    /// A quantity above the held amount is clamped in
    /// [`SellMode::Permissive`] and rejected in [`SellMode::Strict`].
    /// Selling the full holding removes the position.
    ///
    /// Returns the quantity actually sold (may be below the request
    /// after a permissive clamp).
    pub fn sell(
        &mut self,
        ticker: &str,
        quantity: u64,
        price: f64,
        date: NaiveDate,
    ) -> Result<u64, LedgerError> {
        if quantity == 0 {
            return Err(LedgerError::InvalidOrder(format!(
                "sell quantity must be positive ({ticker})"
            )));
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(LedgerError::InvalidOrder(format!(
                "sell price must be positive ({ticker}: {price})"
            )));
        }
        let held = match self.positions.get(ticker) {
            Some(pos) => pos.quantity,
            None => {
                return Err(LedgerError::InvalidOrder(format!(
                    "cannot sell unheld ticker {ticker}"
                )))
            }
        };

        let executed = if quantity > held {
            match self.sell_mode {
                SellMode::Permissive => held,
                SellMode::Strict => {
                    return Err(LedgerError::InvalidOrder(format!(
                        "sell quantity {quantity} exceeds held {held} ({ticker})"
                    )))
                }
            }
        } else {
            quantity
        };

        let amount = executed as f64 * price;
        let commission = amount * self.commission_rate;
        self.cash += amount - commission;
        self.total_commission += commission;

        let remaining = held - executed;
        if remaining == 0 {
            self.positions.remove(ticker);
        } else if let Some(pos) = self.positions.get_mut(ticker) {
            pos.quantity = remaining;
            pos.last_price = price;
        }

        self.trades.push(Trade {
            date,
            ticker: ticker.to_string(),
            side: TradeSide::Sell,
            quantity: executed,
            price,
            commission,
            amount,
        });
        Ok(executed)
    }

    /// Credit a per-share dividend for a held ticker. No-op (returns
    /// 0.0) when the ticker is not held; no effect on cost basis.
    pub fn receive_dividend(&mut self, ticker: &str, dividend_per_share: f64) -> f64 {
        match self.positions.get(ticker) {
            Some(pos) => {
                let credited = pos.quantity as f64 * dividend_per_share;
                self.cash += credited;
                credited
            }
            None => 0.0,
        }
    }

    /// Update a held position's mark-to-market price. No cash or
    /// quantity effect; no-op when the ticker is not held.
    pub fn update_price(&mut self, ticker: &str, price: f64) {
        if let Some(pos) = self.positions.get_mut(ticker) {
            pos.last_price = price;
        }
    }

    /// Append the current state to the equity curve. Callers snapshot
    /// at most once per trading date; that is not enforced here.
    pub fn snapshot(&mut self, date: NaiveDate) {
        let market_value = self.total_market_value();
        self.equity_curve.push(EquityPoint {
            date,
            cash: self.cash,
            market_value,
            total_value: self.cash + market_value,
            position_count: self.positions.len(),
        });
    }

    pub fn total_market_value(&self) -> f64 {
        self.positions.values().map(Position::market_value).sum()
    }

    /// Equity identity: cash plus the mark-to-market value of all
    /// positions.
    pub fn total_value(&self) -> f64 {
        self.cash + self.total_market_value()
    }

    /// Total return relative to the initial funding amount, in percent.
    pub fn total_profit_loss_pct(&self) -> f64 {
        if self.initial_cash == 0.0 {
            return 0.0;
        }
        (self.total_value() / self.initial_cash - 1.0) * 100.0
    }

    pub fn get_position(&self, ticker: &str) -> Option<&Position> {
        self.positions.get(ticker)
    }

    pub fn has_position(&self, ticker: &str) -> bool {
        self.positions.contains_key(ticker)
    }

    /// Held quantity for a ticker, 0 when not held.
    pub fn quantity(&self, ticker: &str) -> u64 {
        self.positions.get(ticker).map_or(0, |p| p.quantity)
    }

    /// Per-position report view, sorted by ticker for stable output.
    pub fn holdings_summary(&self) -> Vec<HoldingSummary> {
        let mut holdings: Vec<HoldingSummary> = self
            .positions
            .values()
            .map(|pos| HoldingSummary {
                ticker: pos.ticker.clone(),
                quantity: pos.quantity,
                avg_cost: pos.avg_cost,
                last_price: pos.last_price,
                market_value: pos.market_value(),
                unrealized_pnl: pos.unrealized_pnl(),
                unrealized_pnl_pct: pos.unrealized_pnl_pct(),
                first_buy_date: pos.first_buy_date,
            })
            .collect();
        holdings.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        holdings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn buy_debits_exactly_amount_plus_commission() {
        let mut ledger = Portfolio::new(100_000.0, 0.001);
        ledger.buy("QQQ", 100, 150.0, day(2)).unwrap();
        // 100_000 - 100 * 150 * 1.001 = 84_985
        assert!((ledger.cash - 84_985.0).abs() < 1e-9);
        let pos = ledger.get_position("QQQ").unwrap();
        assert_eq!(pos.quantity, 100);
        assert_eq!(pos.avg_cost, 150.0);
    }

    #[test]
    fn round_trip_buy_then_sell_all() {
        let mut ledger = Portfolio::new(100_000.0, 0.001);
        ledger.buy("QQQ", 100, 150.0, day(2)).unwrap();
        let sold = ledger.sell("QQQ", 100, 165.0, day(9)).unwrap();
        assert_eq!(sold, 100);
        // 84_985 + 100 * 165 * 0.999 = 101_468.5
        assert!((ledger.cash - 101_468.5).abs() < 1e-9);
        assert!(ledger.get_position("QQQ").is_none());
        assert!((ledger.total_value() - 101_468.5).abs() < 1e-9);
        assert_eq!(ledger.trades.len(), 2);
    }

    #[test]
    fn buy_accumulates_weighted_average_cost() {
        let mut ledger = Portfolio::new(100_000.0, 0.0);
        ledger.buy("QQQ", 100, 100.0, day(2)).unwrap();
        ledger.buy("QQQ", 100, 120.0, day(3)).unwrap();
        let pos = ledger.get_position("QQQ").unwrap();
        assert_eq!(pos.quantity, 200);
        // (100*100 + 100*120) / 200 = 110
        assert!((pos.avg_cost - 110.0).abs() < 1e-10);
        // first buy date survives the second buy
        assert_eq!(pos.first_buy_date, day(2));
    }

    #[test]
    fn buy_rejects_insufficient_funds() {
        let mut ledger = Portfolio::new(10_000.0, 0.001);
        let err = ledger.buy("QQQ", 100, 150.0, day(2)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        // cash untouched after a rejected order
        assert_eq!(ledger.cash, 10_000.0);
        assert!(ledger.trades.is_empty());
    }

    #[test]
    fn buy_rejects_zero_quantity() {
        let mut ledger = Portfolio::new(10_000.0, 0.001);
        assert!(matches!(
            ledger.buy("QQQ", 0, 150.0, day(2)),
            Err(LedgerError::InvalidOrder(_))
        ));
    }

    #[test]
    fn sell_rejects_unheld_ticker() {
        let mut ledger = Portfolio::new(10_000.0, 0.001);
        assert!(matches!(
            ledger.sell("QQQ", 10, 150.0, day(2)),
            Err(LedgerError::InvalidOrder(_))
        ));
    }

    #[test]
    fn permissive_oversell_clamps_to_held() {
        let mut ledger = Portfolio::new(100_000.0, 0.0);
        ledger.buy("QQQ", 50, 100.0, day(2)).unwrap();
        let sold = ledger.sell("QQQ", 500, 100.0, day(3)).unwrap();
        assert_eq!(sold, 50);
        assert!(ledger.get_position("QQQ").is_none());
        assert!((ledger.cash - 100_000.0).abs() < 1e-9);
    }

    #[test]
    fn strict_oversell_is_rejected() {
        let mut ledger = Portfolio::with_sell_mode(100_000.0, 0.0, SellMode::Strict);
        ledger.buy("QQQ", 50, 100.0, day(2)).unwrap();
        let err = ledger.sell("QQQ", 51, 100.0, day(3)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidOrder(_)));
        // holding unchanged after the rejected order
        assert_eq!(ledger.quantity("QQQ"), 50);
    }

    #[test]
    fn partial_sell_keeps_position_and_basis() {
        let mut ledger = Portfolio::new(100_000.0, 0.0);
        ledger.buy("QQQ", 100, 100.0, day(2)).unwrap();
        ledger.sell("QQQ", 40, 110.0, day(3)).unwrap();
        let pos = ledger.get_position("QQQ").unwrap();
        assert_eq!(pos.quantity, 60);
        assert_eq!(pos.avg_cost, 100.0);
        assert_eq!(pos.last_price, 110.0);
    }

    #[test]
    fn dividend_credits_held_position_only() {
        let mut ledger = Portfolio::new(100_000.0, 0.0);
        assert_eq!(ledger.receive_dividend("QQQ", 0.5), 0.0);
        ledger.buy("QQQ", 200, 100.0, day(2)).unwrap();
        let credited = ledger.receive_dividend("QQQ", 0.5);
        assert!((credited - 100.0).abs() < 1e-10);
        assert!((ledger.cash - (100_000.0 - 20_000.0 + 100.0)).abs() < 1e-9);
        // cost basis untouched
        assert_eq!(ledger.get_position("QQQ").unwrap().avg_cost, 100.0);
    }

    #[test]
    fn update_price_marks_to_market_without_cash_effect() {
        let mut ledger = Portfolio::new(100_000.0, 0.0);
        ledger.buy("QQQ", 100, 100.0, day(2)).unwrap();
        let cash_before = ledger.cash;
        ledger.update_price("QQQ", 120.0);
        assert_eq!(ledger.cash, cash_before);
        assert!((ledger.total_market_value() - 12_000.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_records_equity_identity() {
        let mut ledger = Portfolio::new(100_000.0, 0.0);
        ledger.buy("QQQ", 100, 100.0, day(2)).unwrap();
        ledger.update_price("QQQ", 110.0);
        ledger.snapshot(day(2));
        let point = &ledger.equity_curve[0];
        assert_eq!(point.date, day(2));
        assert!((point.total_value - (point.cash + point.market_value)).abs() < 1e-9);
        assert_eq!(point.position_count, 1);
    }

    #[test]
    fn total_profit_loss_pct_relative_to_initial() {
        let mut ledger = Portfolio::new(100_000.0, 0.0);
        ledger.buy("QQQ", 100, 100.0, day(2)).unwrap();
        ledger.update_price("QQQ", 150.0);
        // 100_000 -> 105_000
        assert!((ledger.total_profit_loss_pct() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn holdings_summary_sorted_by_ticker() {
        let mut ledger = Portfolio::new(100_000.0, 0.0);
        ledger.buy("TQQQ", 10, 50.0, day(2)).unwrap();
        ledger.buy("BIL", 10, 90.0, day(2)).unwrap();
        let holdings = ledger.holdings_summary();
        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings[0].ticker, "BIL");
        assert_eq!(holdings[1].ticker, "TQQQ");
    }
}
