//! Risk gating across a sequence of simulated trades

use crate::{random_path, t0_ms};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tradesim::policy::{execute_policy, Policy};
use tradesim::risk::{
    check_circuit_breaker, BreakerOverrides, CircuitBreakerConfig, HaltReason, RiskError,
    RiskFramework, RiskSession, RollingRiskState,
};

fn ts(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap()
}

#[test]
fn test_breaker_priority_order() {
    let config = CircuitBreakerConfig::default();
    let mut state = RollingRiskState::new(dec!(1000));
    state.update_equity(dec!(700));
    state.consecutive_losses = 10;
    state.total_exposure = dec!(10000);
    state.trades_last_hour = 1_000;
    // Everything is breached; drawdown is reported first
    assert!(matches!(
        check_circuit_breaker(&config, &state).reason,
        Some(HaltReason::MaxDrawdownReached { .. })
    ));
}

#[test]
fn test_checks_do_not_mutate_snapshot() {
    let config = CircuitBreakerConfig::default();
    let state = RollingRiskState::new(dec!(1000));
    let before = state.clone();
    let _ = check_circuit_breaker(&config, &state);
    assert_eq!(state, before);
}

#[test]
fn test_session_gates_a_losing_streak() {
    let framework = RiskFramework::new(CircuitBreakerConfig {
        max_consecutive_losses: 3,
        max_daily_loss_pct: dec!(1),
        max_drawdown_pct: dec!(1),
        max_trades_per_hour: 1_000,
        max_trades_per_day: 1_000,
        ..Default::default()
    });
    let mut session = RiskSession::new(framework, "raydium", dec!(10000), ts(t0_ms()));
    let policy = Policy::fixed_stop(0.05, 0.05).unwrap();
    let size = dec!(100);

    let mut blocked = None;
    for seed in 0..200u64 {
        let now = ts(t0_ms() + seed as i64 * 60_000);
        match session.try_open("scalp", size, now) {
            Ok(()) => {}
            Err(RiskError::TradingHalted(reason)) => {
                blocked = Some(reason);
                break;
            }
            Err(other) => panic!("unexpected {other}"),
        }
        let result = execute_policy(&random_path(seed, 30), t0_ms(), &policy, None);
        let pnl = size * Decimal::try_from(result.realized_return_bps / 10_000.0).unwrap();
        session.close_position("scalp", size, pnl, now).unwrap();
    }

    assert_eq!(
        blocked,
        Some(HaltReason::ConsecutiveLosses { count: 3, limit: 3 })
    );
    assert_eq!(session.tripped(), blocked.as_ref());
    session.reset();
    assert!(session.tripped().is_none());
    assert_eq!(session.state().consecutive_losses, 0);
}

#[test]
fn test_independent_sessions_share_nothing() {
    let framework = RiskFramework::default();
    let mut a = RiskSession::new(framework.clone(), "raydium", dec!(1000), ts(t0_ms()));
    let b = RiskSession::new(framework, "raydium", dec!(1000), ts(t0_ms()));
    a.open_position("s", dec!(500), ts(t0_ms()));
    assert_eq!(a.state().total_exposure, dec!(500));
    assert_eq!(b.state().total_exposure, dec!(0));
}

#[test]
fn test_venue_override_applies_to_session() {
    let framework = RiskFramework::default().with_venue_override(
        "pump",
        BreakerOverrides {
            max_strategy_exposure: Some(dec!(100)),
            ..Default::default()
        },
    );
    let mut pump = RiskSession::new(framework.clone(), "pump", dec!(10000), ts(t0_ms()));
    let mut ray = RiskSession::new(framework, "raydium", dec!(10000), ts(t0_ms()));
    pump.open_position("s", dec!(100), ts(t0_ms()));
    ray.open_position("s", dec!(100), ts(t0_ms()));
    assert!(!pump.check_circuit_breaker("s", ts(t0_ms() + 1)).allowed);
    assert!(ray.check_circuit_breaker("s", ts(t0_ms() + 1)).allowed);
}
