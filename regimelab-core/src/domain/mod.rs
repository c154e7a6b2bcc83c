//! Domain types for RegimeLab.

pub mod bar;
pub mod portfolio;
pub mod position;
pub mod trade;

pub use bar::Bar;
pub use portfolio::{EquityPoint, HoldingSummary, LedgerError, Portfolio, SellMode};
pub use position::Position;
pub use trade::{Trade, TradeSide};
