//! Exit policy module
//!
//! Closed set of exit policies and the candle-walking executor that turns a
//! policy plus an entry time into a [`PolicyExecutionResult`].

mod executor;
mod types;

pub use executor::execute_policy;
pub use types::{
    ExitReason, FeeSchedule, InvariantViolation, LadderFill, PolicyExecutionResult,
};

use crate::validation::{
    check_non_negative, check_positive, check_range, check_unit, from_json_validated,
    ValidationError,
};
use serde::{Deserialize, Serialize};

/// Which side wins when the stop and a profit target are both crossed
/// inside one candle
///
/// Candles carry no intrabar ordering, so the executor has to pick one.
/// Backtests default to the stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    #[default]
    StopFirst,
    TargetFirst,
}

/// One rung of a ladder exit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LadderLevel {
    /// Price multiple of entry at which this rung fills (e.g. 2.0 = 2x)
    pub multiple: f64,
    /// Fraction of the *remaining* position released at this rung
    pub fraction: f64,
}

/// Exit policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Policy {
    /// Static stop-loss and take-profit off entry
    FixedStop {
        stop_pct: f64,
        take_profit_pct: f64,
        #[serde(default)]
        tie_break: TieBreak,
    },
    /// Forced exit after a fixed holding duration
    TimeStop { max_hold_ms: u64 },
    /// Hard stop until `activation_pct` gain, then trail `trail_pct` below peak
    TrailingStop {
        activation_pct: f64,
        trail_pct: f64,
        hard_stop_pct: f64,
    },
    /// Partial exits at ascending multiples with a hard stop on the remainder
    Ladder {
        levels: Vec<LadderLevel>,
        stop_pct: f64,
        #[serde(default)]
        tie_break: TieBreak,
    },
}

impl Policy {
    /// Validated fixed stop/take-profit policy
    pub fn fixed_stop(stop_pct: f64, take_profit_pct: f64) -> Result<Self, ValidationError> {
        let policy = Policy::FixedStop {
            stop_pct,
            take_profit_pct,
            tie_break: TieBreak::default(),
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Validated time stop
    pub fn time_stop(max_hold_ms: u64) -> Result<Self, ValidationError> {
        let policy = Policy::TimeStop { max_hold_ms };
        policy.validate()?;
        Ok(policy)
    }

    /// Validated trailing stop
    pub fn trailing_stop(
        activation_pct: f64,
        trail_pct: f64,
        hard_stop_pct: f64,
    ) -> Result<Self, ValidationError> {
        let policy = Policy::TrailingStop {
            activation_pct,
            trail_pct,
            hard_stop_pct,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Validated ladder
    pub fn ladder(levels: Vec<LadderLevel>, stop_pct: f64) -> Result<Self, ValidationError> {
        let policy = Policy::Ladder {
            levels,
            stop_pct,
            tie_break: TieBreak::default(),
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Override the same-candle tie-break (no-op for policies without one)
    pub fn with_tie_break(mut self, rule: TieBreak) -> Self {
        match &mut self {
            Policy::FixedStop { tie_break, .. } | Policy::Ladder { tie_break, .. } => {
                *tie_break = rule;
            }
            Policy::TimeStop { .. } | Policy::TrailingStop { .. } => {}
        }
        self
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Policy::FixedStop { .. } => "fixed_stop",
            Policy::TimeStop { .. } => "time_stop",
            Policy::TrailingStop { .. } => "trailing_stop",
            Policy::Ladder { .. } => "ladder",
        }
    }

    /// Load and validate a policy artifact
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        from_json_validated(json, Self::validate)
    }

    /// Check parameter ranges and cross-field consistency
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Policy::FixedStop {
                stop_pct,
                take_profit_pct,
                ..
            } => {
                check_positive("stop_pct", *stop_pct)?;
                check_unit("stop_pct", *stop_pct)?;
                check_positive("take_profit_pct", *take_profit_pct)?;
            }
            Policy::TimeStop { max_hold_ms } => {
                if *max_hold_ms == 0 {
                    return Err(ValidationError::Inconsistent {
                        context: "time_stop",
                        message: "max_hold_ms must be positive".to_string(),
                    });
                }
            }
            Policy::TrailingStop {
                activation_pct,
                trail_pct,
                hard_stop_pct,
            } => {
                check_non_negative("activation_pct", *activation_pct)?;
                check_positive("trail_pct", *trail_pct)?;
                check_range("trail_pct", *trail_pct, 0.0, 1.0 - f64::EPSILON)?;
                check_positive("hard_stop_pct", *hard_stop_pct)?;
                check_unit("hard_stop_pct", *hard_stop_pct)?;
            }
            Policy::Ladder {
                levels, stop_pct, ..
            } => {
                check_positive("stop_pct", *stop_pct)?;
                check_unit("stop_pct", *stop_pct)?;
                validate_ladder(levels)?;
            }
        }
        Ok(())
    }
}

fn validate_ladder(levels: &[LadderLevel]) -> Result<(), ValidationError> {
    if levels.is_empty() {
        return Err(ValidationError::Inconsistent {
            context: "ladder",
            message: "at least one level is required".to_string(),
        });
    }

    let mut previous = 1.0;
    for (i, level) in levels.iter().enumerate() {
        check_positive("ladder.multiple", level.multiple)?;
        check_positive("ladder.fraction", level.fraction)?;
        check_unit("ladder.fraction", level.fraction)?;
        if level.multiple <= previous {
            return Err(ValidationError::Inconsistent {
                context: "ladder",
                message: format!(
                    "level {} multiple {} must exceed {} (multiples are > 1 and strictly ascending)",
                    i, level.multiple, previous
                ),
            });
        }
        previous = level.multiple;
    }
    Ok(())
}
