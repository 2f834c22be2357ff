//! Seeded synthetic market data for demos and determinism tests.
//!
//! A bounded random walk over per-minute bars (or per-second ticks). The
//! same seed always yields the same series.

use chrono::{DateTime, Duration, TimeZone, Utc};
use ctalab_core::domain::{Bar, Interval, Tick};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Generate `n` one-minute bars following a random walk from `start_price`.
pub fn random_walk_bars(symbol: &str, n: usize, seed: u64, start_price: f64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut price = start_price;
    let mut bars = Vec::with_capacity(n);
    for i in 0..n {
        let open = price;
        // Four intrabar steps give the bar a believable range.
        let mut high = open;
        let mut low = open;
        for _ in 0..4 {
            price += rng.gen_range(-1.0..1.0);
            price = price.max(start_price * 0.2);
            high = high.max(price);
            low = low.min(price);
        }
        bars.push(Bar {
            symbol: symbol.to_string(),
            interval: Interval::Minute(1),
            datetime: base_time() + Duration::minutes(i as i64 + 1),
            open,
            high,
            low,
            close: price,
            volume: rng.gen_range(50.0_f64..500.0).round(),
            open_interest: 0.0,
        });
    }
    bars
}

/// Generate `n` per-second ticks following a random walk from `start_price`.
pub fn random_walk_ticks(symbol: &str, n: usize, seed: u64, start_price: f64) -> Vec<Tick> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut price = start_price;
    let mut ticks = Vec::with_capacity(n);
    for i in 0..n {
        price += rng.gen_range(-0.5..0.5);
        price = price.max(start_price * 0.2);
        ticks.push(Tick::trade(
            symbol,
            base_time() + Duration::seconds(i as i64),
            price,
            rng.gen_range(1.0_f64..20.0).round(),
        ));
    }
    ticks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_series() {
        let a = random_walk_bars("rb2410", 200, 42, 3900.0);
        let b = random_walk_bars("rb2410", 200, 42, 3900.0);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seed_different_series() {
        let a = random_walk_bars("rb2410", 50, 1, 3900.0);
        let b = random_walk_bars("rb2410", 50, 2, 3900.0);
        assert_ne!(a, b);
    }

    #[test]
    fn bars_satisfy_ohlc_ordering() {
        for bar in random_walk_bars("rb2410", 500, 7, 100.0) {
            assert!(bar.high >= bar.open && bar.high >= bar.close);
            assert!(bar.low <= bar.open && bar.low <= bar.close);
        }
    }

    #[test]
    fn timestamps_strictly_increase() {
        let ticks = random_walk_ticks("rb2410", 100, 9, 100.0);
        for pair in ticks.windows(2) {
            assert!(pair[0].datetime < pair[1].datetime);
        }
    }
}
