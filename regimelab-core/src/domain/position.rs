//! Position — one ticker's holding inside the ledger.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An open holding: whole-share quantity, average cost basis, and the
/// last mark-to-market price.
///
/// A position only exists while `quantity > 0`; selling down to zero
/// removes it from the ledger entirely. Mutated only by
/// [`Portfolio::buy`](super::Portfolio::buy) and
/// [`Portfolio::sell`](super::Portfolio::sell).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub ticker: String,
    pub quantity: u64,
    pub avg_cost: f64,
    pub last_price: f64,
    pub first_buy_date: NaiveDate,
}

impl Position {
    pub fn new(ticker: String, quantity: u64, price: f64, date: NaiveDate) -> Self {
        Self {
            ticker,
            quantity,
            avg_cost: price,
            last_price: price,
            first_buy_date: date,
        }
    }

    /// Market value at the last observed price.
    pub fn market_value(&self) -> f64 {
        self.quantity as f64 * self.last_price
    }

    /// Total cost basis.
    pub fn cost(&self) -> f64 {
        self.quantity as f64 * self.avg_cost
    }

    /// Unrealized profit/loss in cash terms.
    pub fn unrealized_pnl(&self) -> f64 {
        self.market_value() - self.cost()
    }

    /// Unrealized profit/loss as a percentage of cost.
    pub fn unrealized_pnl_pct(&self) -> f64 {
        let cost = self.cost();
        if cost == 0.0 {
            return 0.0;
        }
        self.unrealized_pnl() / cost * 100.0
    }
}
