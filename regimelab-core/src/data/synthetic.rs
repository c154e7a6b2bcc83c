//! Synthetic OHLCV generation.
//!
//! A seeded geometric random walk over weekdays, so demos, tests, and
//! the bench can exercise the whole pipeline without network data. The
//! same (seed, ticker) pair always produces the same series; per-ticker
//! sub-seeds are derived by hashing, independently of generation order.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::schema::PriceSeries;
use crate::data::DataError;
use crate::domain::Bar;

/// ~252 trading days / 4.
const QUARTER_BARS: usize = 63;

/// Parameters of the generated walk. Drift and volatility are per
/// trading day, in log-return terms.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub start_date: NaiveDate,
    /// Number of trading days (weekdays) to emit.
    pub days: usize,
    pub initial_price: f64,
    pub daily_drift: f64,
    pub daily_volatility: f64,
    /// Per-share payout every 63rd bar; 0 disables dividends.
    pub dividend_per_quarter: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2015, 1, 2).unwrap_or_default(),
            days: 2520,
            initial_price: 100.0,
            daily_drift: 0.0003,
            daily_volatility: 0.012,
            dividend_per_quarter: 0.0,
        }
    }
}

/// Derive a deterministic per-ticker sub-seed. Hash-based, so the same
/// master seed yields the same walk for a ticker regardless of the
/// order tickers are generated in.
fn ticker_seed(master_seed: u64, ticker: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&master_seed.to_le_bytes());
    hasher.update(ticker.as_bytes());
    let hash = hasher.finalize();
    u64::from_le_bytes(hash.as_bytes()[..8].try_into().unwrap_or_default())
}

/// Box-Muller transform; `u1` shifted into (0, 1] so the log stays finite.
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Generate one ticker's walk.
pub fn generate_series(
    ticker: &str,
    master_seed: u64,
    config: &SyntheticConfig,
) -> Result<PriceSeries, DataError> {
    let mut rng = StdRng::seed_from_u64(ticker_seed(master_seed, ticker));

    let mut bars = Vec::with_capacity(config.days);
    let mut date = config.start_date;
    let mut close = config.initial_price;
    let mut emitted = 0usize;

    while emitted < config.days {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date = date + Duration::days(1);
            continue;
        }

        let open = close;
        let log_return = config.daily_drift + config.daily_volatility * standard_normal(&mut rng);
        let next_close = open * log_return.exp();

        // Intraday range extends beyond the open/close envelope.
        let high = open.max(next_close) * (1.0 + 0.25 * config.daily_volatility * rng.gen::<f64>());
        let low = open.min(next_close) * (1.0 - 0.25 * config.daily_volatility * rng.gen::<f64>());
        let volume = rng.gen_range(500_000u64..5_000_000);

        let dividend = if config.dividend_per_quarter > 0.0
            && emitted > 0
            && emitted % QUARTER_BARS == 0
        {
            config.dividend_per_quarter
        } else {
            0.0
        };

        bars.push(Bar {
            ticker: ticker.to_string(),
            date,
            open,
            high,
            low,
            close: next_close,
            volume,
            dividend,
        });

        close = next_close;
        emitted += 1;
        date = date + Duration::days(1);
    }

    PriceSeries::new(ticker, bars)
}

/// Generate one walk per ticker from a shared master seed.
pub fn generate_universe(
    tickers: &[String],
    master_seed: u64,
    config: &SyntheticConfig,
) -> Result<Vec<PriceSeries>, DataError> {
    tickers
        .iter()
        .map(|ticker| generate_series(ticker, master_seed, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_config() -> SyntheticConfig {
        SyntheticConfig {
            days: 130,
            ..SyntheticConfig::default()
        }
    }

    #[test]
    fn same_seed_same_series() {
        let config = short_config();
        let a = generate_series("QQQ", 42, &config).unwrap();
        let b = generate_series("QQQ", 42, &config).unwrap();

        assert_eq!(a.closes(), b.closes());
        assert_eq!(a.first_date(), b.first_date());
    }

    #[test]
    fn different_tickers_diverge() {
        let config = short_config();
        let qqq = generate_series("QQQ", 42, &config).unwrap();
        let tqqq = generate_series("TQQQ", 42, &config).unwrap();

        assert_ne!(qqq.closes(), tqqq.closes());
    }

    #[test]
    fn different_seeds_diverge() {
        let config = short_config();
        let a = generate_series("QQQ", 42, &config).unwrap();
        let b = generate_series("QQQ", 43, &config).unwrap();

        assert_ne!(a.closes(), b.closes());
    }

    #[test]
    fn emits_requested_day_count_on_weekdays_only() {
        let series = generate_series("QQQ", 7, &short_config()).unwrap();

        assert_eq!(series.len(), 130);
        for bar in series.bars() {
            assert!(!matches!(
                bar.date.weekday(),
                Weekday::Sat | Weekday::Sun
            ));
        }
    }

    #[test]
    fn quarterly_dividend_schedule() {
        let config = SyntheticConfig {
            dividend_per_quarter: 0.5,
            ..short_config()
        };
        let series = generate_series("QQQ", 42, &config).unwrap();

        let bars = series.bars();
        assert_eq!(bars[0].dividend, 0.0);
        assert_eq!(bars[QUARTER_BARS].dividend, 0.5);
        assert_eq!(bars[QUARTER_BARS * 2].dividend, 0.5);
        let payouts = bars.iter().filter(|b| b.dividend > 0.0).count();
        assert_eq!(payouts, 2);
    }

    #[test]
    fn dividends_disabled_by_default() {
        let series = generate_series("QQQ", 42, &short_config()).unwrap();
        assert!(series.bars().iter().all(|b| b.dividend == 0.0));
    }

    #[test]
    fn universe_is_order_independent() {
        let config = short_config();
        let tickers_fwd = vec!["QQQ".to_string(), "TQQQ".to_string()];
        let tickers_rev = vec!["TQQQ".to_string(), "QQQ".to_string()];

        let fwd = generate_universe(&tickers_fwd, 42, &config).unwrap();
        let rev = generate_universe(&tickers_rev, 42, &config).unwrap();

        assert_eq!(fwd[0].closes(), rev[1].closes());
        assert_eq!(fwd[1].closes(), rev[0].closes());
    }
}
