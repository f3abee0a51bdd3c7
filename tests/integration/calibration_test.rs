//! Calibration end to end: records in, loadable model out

use crate::{random_path, t0_ms};
use chrono::{TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tradesim::calibration::{
    calibrate_execution_model, calibrate_execution_model_with, CalibrationError,
    CalibrationOptions, LiveTradeRecord,
};
use tradesim::execution::{apply_execution_reality, ExecutionModel, SeededRng, TradeContext};
use tradesim::policy::{execute_policy, Policy};

fn synthetic_records(n: usize, seed: u64) -> Vec<LiveTradeRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let size = rng.gen_range(50.0..5_000.0);
            let congestion = rng.gen_range(0.0..1.0);
            if rng.gen_bool(0.05 + 0.1 * congestion) {
                return LiveTradeRecord {
                    congestion_level: congestion,
                    ..LiveTradeRecord::failed(size)
                };
            }
            let mut record = LiveTradeRecord::filled(
                size,
                rng.gen_range(150.0..1_500.0) * (1.0 + congestion),
                0.6 * f64::sqrt(size) * rng.gen_range(0.8..1.2),
            );
            record.congestion_level = congestion;
            if rng.gen_bool(0.08) {
                record.fill_fraction = Some(rng.gen_range(0.2..0.95));
            }
            if rng.gen_bool(0.02) {
                record.reorg_depth = rng.gen_range(1..=3);
            }
            record.priority_fee_micro_lamports_per_cu = Some(rng.gen_range(1_000.0..50_000.0));
            record.compute_units = Some(rng.gen_range(80_000..250_000));
            record
        })
        .collect()
}

#[test]
fn test_calibrated_model_drives_simulation() {
    let model = calibrate_execution_model(&synthetic_records(2_000, 1), "raydium").unwrap();
    assert!(model.validate().is_ok());
    assert!(model.failure.base_failure_rate > 0.0);
    assert!(model.failure.congestion_failure_rate > 0.0);

    let ideal = execute_policy(
        &random_path(3, 60),
        t0_ms(),
        &Policy::time_stop(20 * 60_000).unwrap(),
        None,
    );
    let ctx = TradeContext::new(1_000.0, 150.0).with_congestion(0.3);
    let a = apply_execution_reality(&ideal, &model, &ctx, &mut SeededRng::new(8)).unwrap();
    let b = apply_execution_reality(&ideal, &model, &ctx, &mut SeededRng::new(8)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_calibration_is_idempotent_modulo_timestamp() {
    let records = synthetic_records(300, 2);
    let mut a = calibrate_execution_model(&records, "raydium").unwrap();
    let mut b = calibrate_execution_model(&records, "raydium").unwrap();
    let stamp = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    for model in [&mut a, &mut b] {
        model.calibration.as_mut().unwrap().calibrated_at = stamp;
    }
    assert_eq!(a, b);
}

#[test]
fn test_artifact_round_trip() {
    let options = CalibrationOptions {
        calibrated_at: Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
        source: "synthetic".to_string(),
        ..Default::default()
    };
    let model = calibrate_execution_model_with(&synthetic_records(200, 3), "orca", &options).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orca.json");
    std::fs::write(&path, model.to_json_pretty().unwrap()).unwrap();
    let loaded = ExecutionModel::load(&path).unwrap();
    assert_eq!(loaded, model);
    assert_eq!(loaded.calibration.unwrap().source, "synthetic");
}

#[test]
fn test_small_sample_reports_count() {
    let err = calibrate_execution_model(&synthetic_records(12, 4), "raydium").unwrap_err();
    assert_eq!(
        err,
        CalibrationError::InsufficientSamples {
            metric: "records",
            count: 12,
            required: 30,
        }
    );
    assert!(err.to_string().contains("12"));
}
