//! Candle-by-candle exit policy executor
//!
//! Walks forward from the first candle at or after the entry time. Each
//! candle first extends the running peak/trough, then the policy's exit
//! condition is evaluated against that candle's high/low/close only. Nothing
//! looks past the current candle.

use super::types::{ExitReason, FeeSchedule, LadderFill, PolicyExecutionResult};
use super::{LadderLevel, Policy, TieBreak};
use crate::candle::Candle;

const BPS: f64 = 10_000.0;

/// Residual position below which a ladder is considered fully exited
const FLAT_EPSILON: f64 = 1e-12;

/// Exit decided on a single candle
#[derive(Debug, Clone, Copy)]
struct Exit {
    px: f64,
    reason: ExitReason,
}

/// Per-policy running state
enum ExitState<'a> {
    Fixed {
        stop_px: f64,
        target_px: f64,
        tie_break: TieBreak,
    },
    Time {
        deadline_ms: i64,
    },
    Trailing {
        hard_px: f64,
        activation_px: f64,
        trail_pct: f64,
        armed: bool,
    },
    Ladder {
        levels: &'a [LadderLevel],
        next: usize,
        remaining: f64,
        stop_px: f64,
        tie_break: TieBreak,
        fills: Vec<LadderFill>,
    },
}

impl<'a> ExitState<'a> {
    fn new(policy: &'a Policy, entry_px: f64, entry_ts_ms: i64) -> Self {
        match policy {
            Policy::FixedStop {
                stop_pct,
                take_profit_pct,
                tie_break,
            } => ExitState::Fixed {
                stop_px: entry_px * (1.0 - stop_pct),
                target_px: entry_px * (1.0 + take_profit_pct),
                tie_break: *tie_break,
            },
            Policy::TimeStop { max_hold_ms } => ExitState::Time {
                deadline_ms: entry_ts_ms
                    .saturating_add(i64::try_from(*max_hold_ms).unwrap_or(i64::MAX)),
            },
            Policy::TrailingStop {
                activation_pct,
                trail_pct,
                hard_stop_pct,
            } => ExitState::Trailing {
                hard_px: entry_px * (1.0 - hard_stop_pct),
                activation_px: entry_px * (1.0 + activation_pct),
                trail_pct: *trail_pct,
                armed: false,
            },
            Policy::Ladder {
                levels,
                stop_pct,
                tie_break,
            } => ExitState::Ladder {
                levels,
                next: 0,
                remaining: 1.0,
                stop_px: entry_px * (1.0 - stop_pct),
                tie_break: *tie_break,
                fills: Vec::with_capacity(levels.len() + 1),
            },
        }
    }

    /// Evaluate one candle; `peak_px` already includes this candle's high
    fn on_candle(&mut self, candle: &Candle, peak_px: f64, entry_px: f64) -> Option<Exit> {
        let ts_ms = candle.timestamp_ms();
        match self {
            ExitState::Fixed {
                stop_px,
                target_px,
                tie_break,
            } => {
                let stop_hit = candle.low <= *stop_px;
                let target_hit = candle.high >= *target_px;
                let stop = Exit {
                    px: *stop_px,
                    reason: ExitReason::StopLoss,
                };
                let target = Exit {
                    px: *target_px,
                    reason: ExitReason::TakeProfit,
                };
                match (stop_hit, target_hit, *tie_break) {
                    (true, true, TieBreak::StopFirst) => Some(stop),
                    (true, true, TieBreak::TargetFirst) => Some(target),
                    (true, false, _) => Some(stop),
                    (false, true, _) => Some(target),
                    (false, false, _) => None,
                }
            }
            ExitState::Time { deadline_ms } => (ts_ms >= *deadline_ms).then_some(Exit {
                px: candle.close,
                reason: ExitReason::TimeStop,
            }),
            ExitState::Trailing {
                hard_px,
                activation_px,
                trail_pct,
                armed,
            } => {
                if candle.low <= *hard_px {
                    return Some(Exit {
                        px: *hard_px,
                        reason: ExitReason::HardStop,
                    });
                }
                if !*armed && peak_px >= *activation_px {
                    *armed = true;
                }
                if *armed {
                    let trail_px = peak_px * (1.0 - *trail_pct);
                    if candle.low <= trail_px {
                        return Some(Exit {
                            px: trail_px,
                            reason: ExitReason::TrailingStop,
                        });
                    }
                }
                None
            }
            ExitState::Ladder {
                levels,
                next,
                remaining,
                stop_px,
                tie_break,
                fills,
            } => {
                let stop_hit = candle.low <= *stop_px;

                if stop_hit && *tie_break == TieBreak::StopFirst {
                    fills.push(LadderFill {
                        level: None,
                        fraction: *remaining,
                        price: *stop_px,
                        ts_ms,
                    });
                    *remaining = 0.0;
                    return Some(Exit {
                        px: *stop_px,
                        reason: ExitReason::StopLoss,
                    });
                }

                while *next < levels.len() {
                    let level = levels[*next];
                    let level_px = entry_px * level.multiple;
                    if candle.high < level_px {
                        break;
                    }
                    let is_last = *next + 1 == levels.len();
                    let fraction = if is_last {
                        *remaining
                    } else {
                        *remaining * level.fraction
                    };
                    fills.push(LadderFill {
                        level: Some(*next),
                        fraction,
                        price: level_px,
                        ts_ms,
                    });
                    *remaining -= fraction;
                    *next += 1;

                    if is_last || *remaining <= FLAT_EPSILON {
                        *remaining = 0.0;
                        return Some(Exit {
                            px: level_px,
                            reason: ExitReason::LadderComplete,
                        });
                    }
                }

                if stop_hit {
                    fills.push(LadderFill {
                        level: None,
                        fraction: *remaining,
                        price: *stop_px,
                        ts_ms,
                    });
                    *remaining = 0.0;
                    return Some(Exit {
                        px: *stop_px,
                        reason: ExitReason::StopLoss,
                    });
                }
                None
            }
        }
    }

    /// Close whatever is still open at `px` when the data runs out
    fn close_remaining(&mut self, px: f64, ts_ms: i64) {
        if let ExitState::Ladder {
            remaining, fills, ..
        } = self
        {
            if *remaining > FLAT_EPSILON {
                fills.push(LadderFill {
                    level: None,
                    fraction: *remaining,
                    price: px,
                    ts_ms,
                });
                *remaining = 0.0;
            }
        }
    }

    fn into_fills(self) -> Vec<LadderFill> {
        match self {
            ExitState::Ladder { fills, .. } => fills,
            _ => Vec::new(),
        }
    }
}

fn return_bps(px: f64, entry_px: f64) -> f64 {
    (px / entry_px - 1.0) * BPS
}

/// Execute an exit policy over a candle path
///
/// Entry is the open of the first candle whose timestamp (seconds) is at or
/// after `entry_ts_ms`. Empty input, no candle in range, or malformed price
/// data after the entry point all yield [`ExitReason::NoEntry`]. A candle whose
/// timestamp does not advance past the previous processed candle is treated
/// as out of range and skipped.
///
/// Within a candle the high is taken to print before the low: the high
/// extends the peak, and can arm a trailing stop, before the low is tested
/// against the trail. A stop and a target crossed on the same candle resolve
/// by the policy's [`TieBreak`]; a trailing policy's hard stop beats its trail.
///
/// `fees` charges taker fee plus slippage on both legs as a flat bps
/// deduction from the realized return.
pub fn execute_policy(
    candles: &[Candle],
    entry_ts_ms: i64,
    policy: &Policy,
    fees: Option<&FeeSchedule>,
) -> PolicyExecutionResult {
    let Some(entry_idx) = candles
        .iter()
        .position(|c| c.timestamp_ms() >= entry_ts_ms)
    else {
        tracing::debug!(entry_ts_ms, candles = candles.len(), "no candle at or after entry");
        return PolicyExecutionResult::no_entry(entry_ts_ms);
    };

    let path = &candles[entry_idx..];
    if let Some(bad) = path.iter().find(|c| !c.has_sane_prices()) {
        tracing::warn!(
            timestamp = bad.timestamp,
            "malformed candle after entry, treating as no entry"
        );
        return PolicyExecutionResult::no_entry(entry_ts_ms);
    }

    let entry = &path[0];
    let entry_px = entry.open;
    let entry_ts = entry.timestamp_ms();

    let mut state = ExitState::new(policy, entry_px, entry_ts);
    let mut peak_px = entry_px;
    let mut trough_px = entry_px;
    let mut last = entry;
    let mut skipped = 0usize;
    let mut exit: Option<Exit> = None;

    for (i, candle) in path.iter().enumerate() {
        if i > 0 && candle.timestamp <= last.timestamp {
            skipped += 1;
            tracing::warn!(
                timestamp = candle.timestamp,
                previous = last.timestamp,
                "skipping out-of-order candle"
            );
            continue;
        }
        last = candle;
        peak_px = peak_px.max(candle.high);
        trough_px = trough_px.min(candle.low);

        if let Some(hit) = state.on_candle(candle, peak_px, entry_px) {
            exit = Some(hit);
            break;
        }
    }

    let exit_ts_ms = last.timestamp_ms();
    let exit = exit.unwrap_or_else(|| {
        state.close_remaining(last.close, exit_ts_ms);
        Exit {
            px: last.close,
            reason: ExitReason::EndOfData,
        }
    });

    let fills = state.into_fills();
    let exit_px = if fills.is_empty() {
        exit.px
    } else {
        fills.iter().map(|f| f.fraction * f.price).sum()
    };

    let gross_bps = if fills.is_empty() {
        return_bps(exit_px, entry_px)
    } else {
        fills
            .iter()
            .map(|f| f.fraction * return_bps(f.price, entry_px))
            .sum()
    };
    let realized_return_bps = gross_bps - fees.map_or(0.0, FeeSchedule::round_trip_bps);
    let peak_return_bps = return_bps(peak_px, entry_px);
    let tail_capture = (peak_return_bps > 0.0).then(|| realized_return_bps / peak_return_bps);

    let result = PolicyExecutionResult {
        entry_px,
        entry_ts_ms: entry_ts,
        exit_px,
        exit_ts_ms,
        exit_reason: exit.reason,
        stop_out: exit.reason.is_stop(),
        realized_return_bps,
        peak_return_bps,
        tail_capture,
        time_exposed_ms: exit_ts_ms - entry_ts,
        max_adverse_excursion_bps: return_bps(trough_px, entry_px).min(0.0),
        fills,
        skipped_candles: skipped,
    };

    if let Err(violation) = result.check_invariants() {
        tracing::error!(%violation, policy = policy.kind(), "policy execution broke invariant");
        if cfg!(debug_assertions) {
            panic!("policy execution broke invariant: {violation}");
        }
    }

    tracing::debug!(
        policy = policy.kind(),
        reason = %result.exit_reason,
        realized_bps = result.realized_return_bps,
        peak_bps = result.peak_return_bps,
        "policy executed"
    );

    result
}
