//! Position sizing: turn a target weight into a signed share delta.

use crate::domain::Portfolio;
use crate::strategy::Signal;

/// Signed share delta that moves `ticker` to its target weight.
///
/// Target value is `portfolio_value * weight`, shaved by the
/// commission rate on `Reallocate` bars so a full-portfolio entry
/// clears its own commission. The integer share target is the floor of
/// target value over price; the delta is target minus held.
///
/// On `BandCheck` bars the current allocation drift is compared to
/// `band_threshold` first; inside the band the delta is 0. Positive
/// deltas are always clamped to what available cash can fund at
/// `price * (1 + commission_rate)`.
pub fn target_delta(
    portfolio: &Portfolio,
    ticker: &str,
    price: f64,
    weight: f64,
    signal: Signal,
    band_threshold: f64,
) -> i64 {
    if !price.is_finite() || price <= 0.0 {
        return 0;
    }
    let portfolio_value = portfolio.total_value();
    if portfolio_value <= 0.0 {
        return 0;
    }

    let held = portfolio.quantity(ticker);
    if signal == Signal::BandCheck {
        let current_pct = held as f64 * price / portfolio_value;
        if (current_pct - weight).abs() < band_threshold {
            return 0;
        }
    }

    let reserve = if signal == Signal::Reallocate {
        1.0 - portfolio.commission_rate
    } else {
        1.0
    };
    let target_value = portfolio_value * weight * reserve;
    let target_qty = (target_value / price).floor() as i64;
    let mut delta = target_qty - held as i64;

    if delta > 0 {
        let affordable =
            (portfolio.cash / (price * (1.0 + portfolio.commission_rate))).floor() as i64;
        delta = delta.min(affordable.max(0));
    }
    delta
}
