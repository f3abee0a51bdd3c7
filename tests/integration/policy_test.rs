//! Policy executor scenarios and path-independent properties

use crate::{bar, flat, random_path, t0_ms};
use tradesim::candle::validate_candles;
use tradesim::policy::{execute_policy, ExitReason, FeeSchedule, LadderLevel, Policy, TieBreak};

fn policies() -> Vec<Policy> {
    vec![
        Policy::fixed_stop(0.2, 1.0).unwrap(),
        Policy::fixed_stop(0.1, 0.3)
            .unwrap()
            .with_tie_break(TieBreak::TargetFirst),
        Policy::time_stop(15 * 60_000).unwrap(),
        Policy::trailing_stop(0.3, 0.15, 0.25).unwrap(),
        Policy::ladder(
            vec![
                LadderLevel {
                    multiple: 1.5,
                    fraction: 0.3,
                },
                LadderLevel {
                    multiple: 2.0,
                    fraction: 0.5,
                },
                LadderLevel {
                    multiple: 3.0,
                    fraction: 1.0,
                },
            ],
            0.3,
        )
        .unwrap(),
    ]
}

#[test]
fn test_fixed_stop_loss_scenario() {
    let policy = Policy::fixed_stop(0.2, 1.0).unwrap();
    let candles = vec![flat(0, 1.0), bar(1, 1.0, 1.0, 0.75, 0.9), flat(2, 1.0)];
    let result = execute_policy(&candles, t0_ms(), &policy, None);
    assert_eq!(result.exit_reason, ExitReason::StopLoss);
    assert!((result.exit_px - 0.8).abs() < 1e-12);
    assert!(result.stop_out);
}

#[test]
fn test_fixed_take_profit_scenario() {
    let policy = Policy::fixed_stop(0.2, 1.0).unwrap();
    let candles = vec![flat(0, 1.0), bar(1, 1.0, 2.1, 1.0, 2.05), flat(2, 2.0)];
    let result = execute_policy(&candles, t0_ms(), &policy, None);
    assert_eq!(result.exit_reason, ExitReason::TakeProfit);
    assert!((result.exit_px - 2.0).abs() < 1e-12);
    assert!(!result.stop_out);
}

#[test]
fn test_no_exit_hit_scenario() {
    let policy = Policy::fixed_stop(0.2, 1.0).unwrap();
    let candles = vec![flat(0, 1.0), bar(1, 1.0, 1.1, 0.95, 1.05), bar(2, 1.05, 1.2, 1.0, 1.15)];
    let result = execute_policy(&candles, t0_ms(), &policy, None);
    assert_eq!(result.exit_reason, ExitReason::EndOfData);
    assert_eq!(result.exit_px, 1.15);
}

#[test]
fn test_fees_scenario() {
    let policy = Policy::fixed_stop(0.2, 1.0).unwrap();
    let fees = FeeSchedule::new(30.0, 10.0).unwrap();
    let candles = vec![flat(0, 1.0), flat(1, 1.0)];
    let result = execute_policy(&candles, t0_ms(), &policy, Some(&fees));
    assert!((result.realized_return_bps + 80.0).abs() < 1e-9);
}

#[test]
fn test_empty_candles_scenario() {
    for policy in policies() {
        let result = execute_policy(&[], t0_ms(), &policy, None);
        assert_eq!(result.exit_reason, ExitReason::NoEntry);
        assert_eq!(result.realized_return_bps, 0.0);
        assert_eq!(result.time_exposed_ms, 0);
    }
}

#[test]
fn test_ladder_complete_scenario() {
    let policy = Policy::ladder(
        vec![
            LadderLevel {
                multiple: 2.0,
                fraction: 0.5,
            },
            LadderLevel {
                multiple: 3.0,
                fraction: 0.5,
            },
            LadderLevel {
                multiple: 4.0,
                fraction: 1.0,
            },
        ],
        0.25,
    )
    .unwrap();
    let candles = vec![
        flat(0, 1.0),
        bar(1, 1.0, 2.1, 1.0, 2.0),
        bar(2, 2.0, 3.1, 2.0, 3.0),
        bar(3, 3.0, 4.2, 3.0, 4.0),
    ];
    let result = execute_policy(&candles, t0_ms(), &policy, None);
    assert_eq!(result.exit_reason, ExitReason::LadderComplete);
    assert!(result.realized_return_bps > 0.0);
    assert!(result.realized_return_bps <= result.peak_return_bps);
    assert_eq!(result.fills.len(), 3);
}

#[test]
fn test_single_candle_exits_at_entry_time() {
    for policy in policies() {
        let result = execute_policy(&[bar(0, 1.0, 1.05, 0.98, 1.02)], t0_ms(), &policy, None);
        assert_eq!(result.exit_reason, ExitReason::EndOfData, "{}", policy.kind());
        assert_eq!(result.time_exposed_ms, 0);
        assert_eq!(result.exit_ts_ms, result.entry_ts_ms);
    }
}

#[test]
fn test_invariants_hold_on_random_paths() {
    let fees = FeeSchedule::new(30.0, 10.0).unwrap();
    for seed in 0..200u64 {
        let candles = random_path(seed, 60);
        validate_candles(&candles).unwrap();
        let entry_ts_ms = t0_ms() + (seed as i64 % 5) * 60_000;
        for policy in policies() {
            for fee in [None, Some(&fees)] {
                let result = execute_policy(&candles, entry_ts_ms, &policy, fee);
                assert!(result.entered(), "seed {seed}");
                result
                    .check_invariants()
                    .unwrap_or_else(|v| panic!("seed {seed} {}: {v}", policy.kind()));
                assert!(result.max_adverse_excursion_bps <= 0.0);
                assert!(result.exit_ts_ms >= result.entry_ts_ms);
                assert!(result.time_exposed_ms >= 0);
                assert!(result.realized_return_bps <= result.peak_return_bps + 1e-6);
                if let Some(capture) = result.tail_capture {
                    assert!(capture <= 1.0 + 1e-9);
                }
            }
        }
    }
}

#[test]
fn test_execution_is_deterministic() {
    let candles = random_path(42, 120);
    for policy in policies() {
        let a = execute_policy(&candles, t0_ms(), &policy, None);
        let b = execute_policy(&candles, t0_ms(), &policy, None);
        assert_eq!(a, b);
    }
}

#[test]
fn test_no_lookahead() {
    // Truncating the path after the exit candle must not change the result
    let candles = random_path(7, 90);
    for policy in policies() {
        let full = execute_policy(&candles, t0_ms(), &policy, None);
        if full.exit_reason == ExitReason::EndOfData {
            continue;
        }
        let exit_idx = candles
            .iter()
            .position(|c| c.timestamp_ms() == full.exit_ts_ms)
            .unwrap();
        let truncated = execute_policy(&candles[..=exit_idx], t0_ms(), &policy, None);
        assert_eq!(truncated.exit_reason, full.exit_reason);
        assert_eq!(truncated.exit_px, full.exit_px);
    }
}

#[test]
fn test_policy_json_artifact() {
    for policy in policies() {
        let json = serde_json::to_string(&policy).unwrap();
        assert_eq!(Policy::from_json(&json).unwrap(), policy);
    }
    let bad = r#"{"kind":"ladder","stop_pct":0.2,"levels":[{"multiple":3.0,"fraction":0.5},{"multiple":2.0,"fraction":0.5}]}"#;
    assert!(Policy::from_json(bad).is_err());
}
