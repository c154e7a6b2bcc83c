//! Property tests for ledger invariants.
//!
//! Uses proptest to verify:
//! 1. Value conservation — total value plus commission paid always equals
//!    the initial funding when every trade marks at the same price
//! 2. Cash non-negativity — no operation sequence can drive cash below zero
//! 3. Commission symmetry — a buy and a sell of equal size pay equal commission
//! 4. Zero-quantity removal — a position that exists always has positive quantity
//! 5. Permissive clamp — overselling is exactly selling the full holding

use chrono::NaiveDate;
use proptest::prelude::*;
use regimelab_core::domain::{LedgerError, Portfolio, SellMode, TradeSide};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_rate() -> impl Strategy<Value = f64> {
    (0.0..0.02_f64).prop_map(|r| (r * 10_000.0).round() / 10_000.0)
}

/// Random buy/sell interleavings. `true` means buy.
fn arb_ops() -> impl Strategy<Value = Vec<(bool, u64)>> {
    prop::collection::vec((any::<bool>(), 1u64..50), 1..25)
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

/// Apply one order, ignoring recoverable rejections the way the engine
/// does (insufficient funds, unheld sells).
fn apply(ledger: &mut Portfolio, is_buy: bool, qty: u64, price: f64) {
    let result: Result<(), LedgerError> = if is_buy {
        ledger.buy("QQQ", qty, price, day())
    } else {
        ledger.sell("QQQ", qty, price, day()).map(|_| ())
    };
    let _ = result;
}

// ── 1. Value conservation ────────────────────────────────────────────

proptest! {
    /// With zero commission and a constant mark price, no trade sequence
    /// changes total value at all.
    #[test]
    fn total_value_conserved_without_commission(
        price in arb_price(),
        ops in arb_ops(),
    ) {
        let initial = 100_000.0;
        let mut ledger = Portfolio::new(initial, 0.0);

        for (is_buy, qty) in ops {
            apply(&mut ledger, is_buy, qty, price);
            prop_assert!(
                (ledger.total_value() - initial).abs() < 1e-6,
                "value not conserved: {} vs {initial}", ledger.total_value()
            );
        }
    }

    /// With commission, the only leak is the commission itself:
    /// total value + total commission == initial funding.
    #[test]
    fn total_value_leaks_only_commission(
        price in arb_price(),
        rate in arb_rate(),
        ops in arb_ops(),
    ) {
        let initial = 100_000.0;
        let mut ledger = Portfolio::new(initial, rate);

        for (is_buy, qty) in ops {
            apply(&mut ledger, is_buy, qty, price);
        }

        let accounted = ledger.total_value() + ledger.total_commission;
        prop_assert!(
            (accounted - initial).abs() < 1e-6,
            "leak beyond commission: accounted {accounted}, initial {initial}"
        );
    }
}

// ── 2. Cash non-negativity ───────────────────────────────────────────

proptest! {
    /// A buy that cash cannot cover is rejected, so cash never goes
    /// below zero no matter the sequence.
    #[test]
    fn cash_never_negative(
        initial in 1_000.0..200_000.0_f64,
        price in arb_price(),
        rate in arb_rate(),
        ops in arb_ops(),
    ) {
        let mut ledger = Portfolio::new(initial, rate);

        for (is_buy, qty) in ops {
            apply(&mut ledger, is_buy, qty, price);
            prop_assert!(ledger.cash >= 0.0, "cash went negative: {}", ledger.cash);
            prop_assert!(ledger.cash.is_finite());
        }
    }
}

// ── 3. Commission symmetry ───────────────────────────────────────────

proptest! {
    /// A buy and a full sell of the same size at the same price pay the
    /// same commission, and the ledger total is exactly their sum.
    #[test]
    fn round_trip_commission_is_symmetric(
        price in arb_price(),
        rate in arb_rate(),
        qty in 1u64..100,
    ) {
        let mut ledger = Portfolio::new(10_000_000.0, rate);
        ledger.buy("QQQ", qty, price, day()).unwrap();
        ledger.sell("QQQ", qty, price, day()).unwrap();

        prop_assert_eq!(ledger.trades.len(), 2);
        prop_assert_eq!(ledger.trades[0].side, TradeSide::Buy);
        prop_assert_eq!(ledger.trades[1].side, TradeSide::Sell);

        let buy_fee = ledger.trades[0].commission;
        let sell_fee = ledger.trades[1].commission;
        prop_assert!(
            (buy_fee - sell_fee).abs() < 1e-12,
            "asymmetric commission: buy {buy_fee}, sell {sell_fee}"
        );
        prop_assert!(
            (ledger.total_commission - (buy_fee + sell_fee)).abs() < 1e-12
        );
    }
}

// ── 4. Zero-quantity removal ─────────────────────────────────────────

proptest! {
    /// The ledger never holds a zero-quantity position: whenever the
    /// ticker is present its quantity is positive, and a full sell
    /// removes it entirely.
    #[test]
    fn held_positions_always_positive(
        price in arb_price(),
        ops in arb_ops(),
    ) {
        let mut ledger = Portfolio::new(100_000.0, 0.001);

        for (is_buy, qty) in ops {
            apply(&mut ledger, is_buy, qty, price);
            if ledger.has_position("QQQ") {
                prop_assert!(ledger.quantity("QQQ") > 0);
            } else {
                prop_assert_eq!(ledger.quantity("QQQ"), 0);
            }
        }

        if ledger.has_position("QQQ") {
            let held = ledger.quantity("QQQ");
            ledger.sell("QQQ", held, price, day()).unwrap();
            prop_assert!(!ledger.has_position("QQQ"));
        }
    }
}

// ── 5. Permissive clamp ──────────────────────────────────────────────

proptest! {
    /// In permissive mode, selling more than held is indistinguishable
    /// from selling exactly the holding: same executed quantity, same
    /// cash, position gone either way.
    #[test]
    fn oversell_equals_sell_all(
        price in arb_price(),
        sell_price in arb_price(),
        rate in arb_rate(),
        held in 1u64..100,
        excess in 1u64..1_000,
    ) {
        let initial = 10_000_000.0;
        let mut clamped = Portfolio::new(initial, rate);
        let mut exact = Portfolio::new(initial, rate);

        clamped.buy("QQQ", held, price, day()).unwrap();
        exact.buy("QQQ", held, price, day()).unwrap();

        let executed = clamped.sell("QQQ", held + excess, sell_price, day()).unwrap();
        exact.sell("QQQ", held, sell_price, day()).unwrap();

        prop_assert_eq!(executed, held);
        prop_assert_eq!(clamped.cash, exact.cash);
        prop_assert_eq!(clamped.total_commission, exact.total_commission);
        prop_assert!(!clamped.has_position("QQQ"));
        prop_assert!(!exact.has_position("QQQ"));
        prop_assert_eq!(
            clamped.trades.last().unwrap().quantity,
            exact.trades.last().unwrap().quantity
        );
    }

    /// Strict mode rejects the same oversell and leaves the holding
    /// untouched.
    #[test]
    fn strict_oversell_rejected_without_side_effects(
        price in arb_price(),
        held in 1u64..100,
        excess in 1u64..1_000,
    ) {
        let mut ledger = Portfolio::with_sell_mode(10_000_000.0, 0.001, SellMode::Strict);
        ledger.buy("QQQ", held, price, day()).unwrap();
        let cash_before = ledger.cash;

        let result = ledger.sell("QQQ", held + excess, price, day());
        prop_assert!(matches!(result, Err(LedgerError::InvalidOrder(_))));
        prop_assert_eq!(ledger.quantity("QQQ"), held);
        prop_assert_eq!(ledger.cash, cash_before);
        prop_assert_eq!(ledger.trades.len(), 1);
    }
}
