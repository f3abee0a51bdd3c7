//! Integration tests for the public tradesim API

mod calibration_test;
mod config_test;
mod execution_test;
mod policy_test;
mod risk_test;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tradesim::candle::Candle;

pub const T0: i64 = 1_700_000_000;

/// Candle `i` minutes after T0
pub fn bar(i: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle::new(T0 + i * 60, open, high, low, close, 1_000.0)
}

pub fn flat(i: i64, px: f64) -> Candle {
    bar(i, px, px, px, px)
}

pub fn t0_ms() -> i64 {
    T0 * 1000
}

/// Random-walk minute candles with consistent OHLC
pub fn random_path(seed: u64, len: usize) -> Vec<Candle> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut close = 1.0_f64;
    (0..len)
        .map(|i| {
            let open = close;
            close = (open * (1.0 + rng.gen_range(-0.12..0.15))).max(1e-6);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.08));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.08));
            Candle::new(T0 + i as i64 * 60, open, high, low, close, rng.gen_range(0.0..5_000.0))
        })
        .collect()
}
