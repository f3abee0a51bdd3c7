//! Policy execution types

use crate::validation::{check_bps, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance for float comparisons in invariant checks, in bps
const INVARIANT_EPSILON_BPS: f64 = 1e-6;

/// Why a simulated position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// No candle at or after the entry time
    NoEntry,
    /// Candles ran out before any exit condition
    EndOfData,
    StopLoss,
    TakeProfit,
    TimeStop,
    TrailingStop,
    HardStop,
    /// Every ladder level filled before the stop
    LadderComplete,
}

impl ExitReason {
    /// Whether the position was closed by a protective stop
    pub fn is_stop(&self) -> bool {
        matches!(
            self,
            ExitReason::StopLoss | ExitReason::HardStop | ExitReason::TrailingStop
        )
    }

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::NoEntry => "no_entry",
            ExitReason::EndOfData => "end_of_data",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::TimeStop => "time_stop",
            ExitReason::TrailingStop => "trailing_stop",
            ExitReason::HardStop => "hard_stop",
            ExitReason::LadderComplete => "ladder_complete",
        }
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat per-leg fee and slippage assumption for idealized results
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub taker_fee_bps: f64,
    pub slippage_bps: f64,
}

impl FeeSchedule {
    /// Validated fee schedule
    pub fn new(taker_fee_bps: f64, slippage_bps: f64) -> Result<Self, ValidationError> {
        let fees = Self {
            taker_fee_bps,
            slippage_bps,
        };
        fees.validate()?;
        Ok(fees)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_bps("taker_fee_bps", self.taker_fee_bps)?;
        check_bps("slippage_bps", self.slippage_bps)
    }

    /// Total deduction for one round trip (entry + exit)
    pub fn round_trip_bps(&self) -> f64 {
        2.0 * (self.taker_fee_bps + self.slippage_bps)
    }
}

/// One partial exit of a ladder policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LadderFill {
    /// Level index, `None` for the stop or end-of-data remainder
    pub level: Option<usize>,
    /// Fraction of the original position closed by this fill
    pub fraction: f64,
    pub price: f64,
    pub ts_ms: i64,
}

/// Outcome of walking one policy over one candle path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyExecutionResult {
    pub entry_px: f64,
    pub entry_ts_ms: i64,
    /// Size-weighted exit price for ladders
    pub exit_px: f64,
    pub exit_ts_ms: i64,
    pub exit_reason: ExitReason,
    pub stop_out: bool,
    /// Net of the fee schedule when one was supplied
    pub realized_return_bps: f64,
    /// Best return available on the path between entry and exit
    pub peak_return_bps: f64,
    /// `realized / peak` when the peak return is positive
    pub tail_capture: Option<f64>,
    pub time_exposed_ms: i64,
    /// Worst drawdown from entry, always `<= 0`
    pub max_adverse_excursion_bps: f64,
    /// Ladder partial exits, empty for single-exit policies
    #[serde(default)]
    pub fills: Vec<LadderFill>,
    /// Candles ignored because their timestamp did not advance
    #[serde(default)]
    pub skipped_candles: usize,
}

impl PolicyExecutionResult {
    /// Terminal result when no entry candle exists
    pub fn no_entry(entry_ts_ms: i64) -> Self {
        Self {
            entry_px: 0.0,
            entry_ts_ms,
            exit_px: 0.0,
            exit_ts_ms: entry_ts_ms,
            exit_reason: ExitReason::NoEntry,
            stop_out: false,
            realized_return_bps: 0.0,
            peak_return_bps: 0.0,
            tail_capture: None,
            time_exposed_ms: 0,
            max_adverse_excursion_bps: 0.0,
            fills: Vec::new(),
            skipped_candles: 0,
        }
    }

    /// Whether a position was opened
    pub fn entered(&self) -> bool {
        self.exit_reason != ExitReason::NoEntry
    }

    /// Verify the path invariants every execution must satisfy
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if !self.entered() {
            return Ok(());
        }
        if self.realized_return_bps > self.peak_return_bps + INVARIANT_EPSILON_BPS {
            return Err(InvariantViolation::RealizedAbovePeak {
                realized_bps: self.realized_return_bps,
                peak_bps: self.peak_return_bps,
            });
        }
        if let Some(capture) = self.tail_capture {
            if capture > 1.0 + INVARIANT_EPSILON_BPS {
                return Err(InvariantViolation::TailCaptureAboveOne(capture));
            }
        }
        if self.max_adverse_excursion_bps > 0.0 {
            return Err(InvariantViolation::PositiveAdverseExcursion(
                self.max_adverse_excursion_bps,
            ));
        }
        if self.exit_ts_ms < self.entry_ts_ms {
            return Err(InvariantViolation::ExitBeforeEntry {
                entry_ts_ms: self.entry_ts_ms,
                exit_ts_ms: self.exit_ts_ms,
            });
        }
        if self.time_exposed_ms < 0 {
            return Err(InvariantViolation::NegativeExposure(self.time_exposed_ms));
        }
        Ok(())
    }
}

/// Executor defect: a result broke a path invariant
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("realized return {realized_bps} bps exceeds path peak {peak_bps} bps")]
    RealizedAbovePeak { realized_bps: f64, peak_bps: f64 },
    #[error("tail capture {0} exceeds 1")]
    TailCaptureAboveOne(f64),
    #[error("max adverse excursion {0} bps is positive")]
    PositiveAdverseExcursion(f64),
    #[error("exit at {exit_ts_ms} precedes entry at {entry_ts_ms}")]
    ExitBeforeEntry { entry_ts_ms: i64, exit_ts_ms: i64 },
    #[error("time exposed {0} ms is negative")]
    NegativeExposure(i64),
}
