//! OHLCV candle type and input checks

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time in unix seconds
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Create a new candle
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Bar open time in milliseconds
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.saturating_mul(1000)
    }

    /// Prices are finite, positive and `low <= high`
    pub fn has_sane_prices(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite() && *p > 0.0) && self.low <= self.high
    }
}

/// Candle sequence errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CandleError {
    /// Price fields are non-finite, non-positive or inconsistent
    #[error("candle {index} at {timestamp}: {message}")]
    Malformed {
        index: usize,
        timestamp: i64,
        message: &'static str,
    },
    /// Timestamp does not advance past the previous candle
    #[error("candle {index} at {timestamp} is not after previous candle at {previous}")]
    OutOfOrder {
        index: usize,
        timestamp: i64,
        previous: i64,
    },
}

/// Strictly validate a candle sequence
///
/// Rejects malformed bars and any timestamp that is not strictly greater than
/// its predecessor. Out-of-order data is never re-sorted.
pub fn validate_candles(candles: &[Candle]) -> Result<(), CandleError> {
    let mut previous: Option<i64> = None;

    for (index, c) in candles.iter().enumerate() {
        let malformed = |message| CandleError::Malformed {
            index,
            timestamp: c.timestamp,
            message,
        };

        if !c.has_sane_prices() {
            return Err(malformed("prices must be finite, positive and low <= high"));
        }
        if c.open < c.low || c.open > c.high || c.close < c.low || c.close > c.high {
            return Err(malformed("open/close outside [low, high]"));
        }
        if !c.volume.is_finite() || c.volume < 0.0 {
            return Err(malformed("volume must be finite and non-negative"));
        }
        if let Some(prev) = previous {
            if c.timestamp <= prev {
                return Err(CandleError::OutOfOrder {
                    index,
                    timestamp: c.timestamp,
                    previous: prev,
                });
            }
        }
        previous = Some(c.timestamp);
    }

    Ok(())
}
