//! Configuration loading

use std::path::Path;
use tradesim::config::Config;
use tradesim::telemetry::LogFormat;

#[test]
fn test_example_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.toml.example");
    let config = Config::load(path).unwrap();
    assert_eq!(config.policy.kind(), "ladder");
    assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
    let risk = config.risk.unwrap();
    assert!(risk.anomaly.is_some());
    assert_eq!(risk.breakers_for("pump").max_trades_per_hour, 5);
}

#[test]
fn test_invalid_policy_fails_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
            [policy]
            kind = "ladder"
            stop_pct = 0.2
            levels = [{ multiple = 0.5, fraction = 0.5 }]
        "#,
    )
    .unwrap();
    assert!(Config::load(&path).is_err());
}

#[test]
fn test_unknown_policy_kind_fails_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
            [policy]
            kind = "martingale"
        "#,
    )
    .unwrap();
    assert!(Config::load(&path).is_err());
}
