//! Trade — an immutable record of one executed order.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which side of the book an order hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// One executed order. Appended to the ledger's trade log and never
/// mutated afterwards.
///
/// `amount` is the gross notional (`quantity * price`); `commission`
/// is charged on top for buys and deducted from proceeds for sells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub date: NaiveDate,
    pub ticker: String,
    pub side: TradeSide,
    pub quantity: u64,
    pub price: f64,
    pub commission: f64,
    pub amount: f64,
}

impl Trade {
    /// Cash actually moved including commission: `amount + commission`
    /// for buys, `amount - commission` for sells.
    pub fn net_amount(&self) -> f64 {
        match self.side {
            TradeSide::Buy => self.amount + self.commission,
            TradeSide::Sell => self.amount - self.commission,
        }
    }
}
