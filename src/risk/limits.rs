//! Circuit-breaker limits and drawdown controls

use crate::validation::{check_decimal, ValidationError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Circuit-breaker thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Maximum drawdown from peak equity, as a fraction
    pub max_drawdown_pct: Decimal,
    /// Maximum loss since the start of the UTC day, as a fraction of that day's opening equity
    pub max_daily_loss_pct: Decimal,
    pub max_consecutive_losses: u32,
    /// Open notional allowed for one strategy, in quote currency
    pub max_strategy_exposure: Decimal,
    /// Open notional allowed across all strategies, in quote currency
    pub max_total_exposure: Decimal,
    pub max_trades_per_hour: u32,
    pub max_trades_per_day: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_drawdown_pct: dec!(0.20),
            max_daily_loss_pct: dec!(0.05),
            max_consecutive_losses: 5,
            max_strategy_exposure: dec!(1000),
            max_total_exposure: dec!(5000),
            max_trades_per_hour: 20,
            max_trades_per_day: 100,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_decimal("risk.max_drawdown_pct", self.max_drawdown_pct, 0.0, 1.0)?;
        check_decimal("risk.max_daily_loss_pct", self.max_daily_loss_pct, 0.0, 1.0)?;
        check_decimal(
            "risk.max_strategy_exposure",
            self.max_strategy_exposure,
            0.0,
            f64::MAX,
        )?;
        check_decimal(
            "risk.max_total_exposure",
            self.max_total_exposure,
            0.0,
            f64::MAX,
        )?;
        if self.max_strategy_exposure > self.max_total_exposure {
            return Err(ValidationError::Inconsistent {
                context: "risk",
                message: format!(
                    "max_strategy_exposure {} exceeds max_total_exposure {}",
                    self.max_strategy_exposure, self.max_total_exposure
                ),
            });
        }
        if self.max_trades_per_hour > self.max_trades_per_day {
            return Err(ValidationError::Inconsistent {
                context: "risk",
                message: format!(
                    "max_trades_per_hour {} exceeds max_trades_per_day {}",
                    self.max_trades_per_hour, self.max_trades_per_day
                ),
            });
        }
        Ok(())
    }
}

/// Reason for a trading halt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum HaltReason {
    MaxDrawdownReached { drawdown: Decimal, limit: Decimal },
    MaxDailyLossReached { loss: Decimal, limit: Decimal },
    ConsecutiveLosses { count: u32, limit: u32 },
    StrategyExposureReached { exposure: Decimal, limit: Decimal },
    TotalExposureReached { exposure: Decimal, limit: Decimal },
    HourlyTradeRate { count: u32, limit: u32 },
    DailyTradeRate { count: u32, limit: u32 },
}

impl HaltReason {
    /// Loss-driven halts stay tripped until an explicit reset; exposure and
    /// rate halts clear on their own once the state changes
    pub fn is_latching(&self) -> bool {
        matches!(
            self,
            HaltReason::MaxDrawdownReached { .. }
                | HaltReason::MaxDailyLossReached { .. }
                | HaltReason::ConsecutiveLosses { .. }
        )
    }
}

/// Outcome of a circuit-breaker check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerDecision {
    pub allowed: bool,
    pub reason: Option<HaltReason>,
}

impl CircuitBreakerDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn halt(reason: HaltReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Rolling portfolio snapshot the breaker is evaluated against
///
/// Owned and updated by the caller between simulated trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingRiskState {
    /// Peak equity value
    pub peak_equity: Decimal,
    /// Current equity value
    pub current_equity: Decimal,
    /// Equity at start of day
    pub daily_start_equity: Decimal,
    pub consecutive_losses: u32,
    /// Open notional of the strategy about to trade
    pub strategy_exposure: Decimal,
    pub total_exposure: Decimal,
    pub trades_last_hour: u32,
    pub trades_today: u32,
}

impl RollingRiskState {
    pub fn new(initial_equity: Decimal) -> Self {
        Self {
            peak_equity: initial_equity,
            current_equity: initial_equity,
            daily_start_equity: initial_equity,
            consecutive_losses: 0,
            strategy_exposure: dec!(0),
            total_exposure: dec!(0),
            trades_last_hour: 0,
            trades_today: 0,
        }
    }

    /// Update with new equity value
    pub fn update_equity(&mut self, new_equity: Decimal) {
        self.current_equity = new_equity;
        if new_equity > self.peak_equity {
            self.peak_equity = new_equity;
        }
    }

    /// Apply a closed trade's PnL and update the loss streak
    pub fn record_pnl(&mut self, pnl: Decimal) {
        self.update_equity(self.current_equity + pnl);
        if pnl < dec!(0) {
            self.consecutive_losses += 1;
        } else {
            self.consecutive_losses = 0;
        }
    }

    /// Current drawdown from peak
    pub fn current_drawdown(&self) -> Decimal {
        if self.peak_equity <= dec!(0) {
            return dec!(0);
        }
        ((self.peak_equity - self.current_equity) / self.peak_equity).max(dec!(0))
    }

    /// Loss since the start of day as a fraction; zero when up on the day
    pub fn daily_loss(&self) -> Decimal {
        if self.daily_start_equity <= dec!(0) {
            return dec!(0);
        }
        ((self.daily_start_equity - self.current_equity) / self.daily_start_equity).max(dec!(0))
    }

    /// Reset for new trading day
    pub fn reset_daily(&mut self) {
        self.daily_start_equity = self.current_equity;
        self.trades_today = 0;
    }
}

/// Evaluate the breaker against a state snapshot
///
/// Checks run in a fixed order: drawdown, daily loss, consecutive losses,
/// strategy exposure, total exposure, hourly trade rate, daily trade rate.
/// The first breach is returned. Loss thresholds trip when strictly
/// exceeded; count and exposure limits trip once reached, since the next
/// trade would go past them.
pub fn check_circuit_breaker(
    config: &CircuitBreakerConfig,
    state: &RollingRiskState,
) -> CircuitBreakerDecision {
    let drawdown = state.current_drawdown();
    if drawdown > config.max_drawdown_pct {
        return CircuitBreakerDecision::halt(HaltReason::MaxDrawdownReached {
            drawdown,
            limit: config.max_drawdown_pct,
        });
    }

    let loss = state.daily_loss();
    if loss > config.max_daily_loss_pct {
        return CircuitBreakerDecision::halt(HaltReason::MaxDailyLossReached {
            loss,
            limit: config.max_daily_loss_pct,
        });
    }

    if state.consecutive_losses >= config.max_consecutive_losses {
        return CircuitBreakerDecision::halt(HaltReason::ConsecutiveLosses {
            count: state.consecutive_losses,
            limit: config.max_consecutive_losses,
        });
    }

    if state.strategy_exposure >= config.max_strategy_exposure {
        return CircuitBreakerDecision::halt(HaltReason::StrategyExposureReached {
            exposure: state.strategy_exposure,
            limit: config.max_strategy_exposure,
        });
    }

    if state.total_exposure >= config.max_total_exposure {
        return CircuitBreakerDecision::halt(HaltReason::TotalExposureReached {
            exposure: state.total_exposure,
            limit: config.max_total_exposure,
        });
    }

    if state.trades_last_hour >= config.max_trades_per_hour {
        return CircuitBreakerDecision::halt(HaltReason::HourlyTradeRate {
            count: state.trades_last_hour,
            limit: config.max_trades_per_hour,
        });
    }

    if state.trades_today >= config.max_trades_per_day {
        return CircuitBreakerDecision::halt(HaltReason::DailyTradeRate {
            count: state.trades_today,
            limit: config.max_trades_per_day,
        });
    }

    CircuitBreakerDecision::allow()
}
