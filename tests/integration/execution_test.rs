//! Execution reality and cost pipeline

use crate::{random_path, t0_ms};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tradesim::cost::{apply_cost_model, CostModel, Liquidity, TradeCostInput, TradeSide};
use tradesim::execution::{
    apply_execution_reality, sample_failure, sample_latency, sample_partial_fill, sample_reorg,
    sample_slippage, ExecutionModel, FailureModel, FillFractionDistribution, LatencyModel,
    PartialFillModel, ReorgModel, SeededRng, SlippageKind, SlippageModel, TradeContext,
    UniformRng,
};
use tradesim::policy::{execute_policy, Policy};

fn model() -> ExecutionModel {
    ExecutionModel {
        venue: "orca".to_string(),
        latency: LatencyModel::percentile(300.0, 800.0, 2_000.0).with_jitter(20.0),
        slippage: SlippageModel::new(SlippageKind::Linear { coefficient: 0.02 }, 2.0, 300.0),
        failure: FailureModel {
            base_failure_rate: 0.05,
            congestion_failure_rate: 0.1,
            fee_shortfall_failure_rate: 0.1,
            max_failure_rate: 0.25,
        },
        partial_fill: PartialFillModel {
            probability: 0.1,
            fill_fraction: FillFractionDistribution::Uniform { min: 0.3, max: 0.9 },
        },
        reorg: ReorgModel {
            probability: 0.02,
            average_depth: 2.0,
            max_depth: 5,
        },
        cost: CostModel::default(),
        slot_time_ms: 400.0,
        calibration: None,
    }
}

#[test]
fn test_model_artifact_validates_on_load() {
    let json = model().to_json_pretty().unwrap();
    assert_eq!(ExecutionModel::from_json(&json).unwrap(), model());

    let tampered = json.replace("\"max_depth\": 5", "\"max_depth\": 1");
    assert!(ExecutionModel::from_json(&tampered).is_err());
}

#[test]
fn test_samplers_deterministic_under_seed() {
    let m = model();
    let ctx = TradeContext::new(2_000.0, 150.0).with_congestion(0.4);
    let draw = |seed: u64| {
        let mut rng = SeededRng::new(seed);
        (
            sample_latency(&m.latency, &ctx, &mut rng),
            sample_slippage(&m.slippage, &ctx, &mut rng),
            sample_failure(&m.failure, &ctx, &mut rng),
            sample_partial_fill(&m.partial_fill, &ctx, &mut rng),
            sample_reorg(&m.reorg, &ctx, &mut rng),
        )
    };
    assert_eq!(draw(11), draw(11));
    assert_ne!(draw(11).0, draw(12).0);
}

#[test]
fn test_sampler_outputs_within_bounds() {
    let m = model();
    let ctx = TradeContext::new(50_000.0, 150.0).with_congestion(1.0);
    let mut rng = SeededRng::new(3);
    for _ in 0..5_000 {
        assert!(sample_latency(&m.latency, &ctx, &mut rng) >= 0.0);
        let slip = sample_slippage(&m.slippage, &ctx, &mut rng);
        assert!((2.0..=300.0).contains(&slip));
        let failure = sample_failure(&m.failure, &ctx, &mut rng);
        assert!(failure.probability <= 0.25);
        let fill = sample_partial_fill(&m.partial_fill, &ctx, &mut rng);
        assert!((0.0..=1.0).contains(&fill.fill_fraction));
        let reorg = sample_reorg(&m.reorg, &ctx, &mut rng);
        assert!(reorg.depth <= 5);
        assert_eq!(reorg.reorged, reorg.depth > 0);
    }
}

#[test]
fn test_custom_rng_is_threaded_through() {
    struct Constant(f64);
    impl UniformRng for Constant {
        fn next_f64(&mut self) -> f64 {
            self.0
        }
    }
    let m = model();
    let ctx = TradeContext::new(1_000.0, 150.0);
    // 0.5 quantile is p50, 0.5 jitter is half of 20 ms
    let latency = sample_latency(&m.latency, &ctx, &mut Constant(0.5));
    assert!((latency - 310.0).abs() < 1e-9);
}

#[test]
fn test_policy_then_reality_pipeline() {
    let policy = Policy::trailing_stop(0.2, 0.1, 0.3).unwrap();
    let ctx = TradeContext::new(1_000.0, 150.0);
    let mut rng = SeededRng::new(2024);
    let mut executed = 0;
    for seed in 0..100u64 {
        let ideal = execute_policy(&random_path(seed, 60), t0_ms(), &policy, None);
        let realized = apply_execution_reality(&ideal, &model(), &ctx, &mut rng).unwrap();
        if !realized.executed {
            assert!(realized.net_return_bps <= 0.0);
            continue;
        }
        executed += 1;
        assert!(realized.entry_px >= ideal.entry_px);
        assert!(realized.exit_px <= ideal.exit_px);
        assert!(realized.entry_ts_ms >= ideal.entry_ts_ms);
        assert!(realized.exit_ts_ms >= realized.entry_ts_ms);
        assert!(realized.net_return_bps < realized.gross_return_bps);
        assert!(realized.gross_return_bps <= ideal.realized_return_bps + 1e-6);
    }
    assert!(executed > 50);
}

#[test]
fn test_cost_components_are_reported() {
    let trade = TradeCostInput {
        size: dec!(5),
        price: dec!(200),
        side: TradeSide::Short,
        liquidity: Liquidity::Taker,
        native_price: dec!(100),
        holding_ms: 86_400_000,
    };
    let mut cost = CostModel::default();
    cost.borrow_apr = dec!(0.365);
    let result = apply_cost_model(&cost, &trade).unwrap();
    assert_eq!(result.trading_fee, dec!(3));
    assert_eq!(result.borrow_fee, dec!(1));
    assert_eq!(
        result.total_cost,
        result.base_fee + result.priority_fee + result.trading_fee + result.borrow_fee
    );
    assert!(result.base_fee > Decimal::ZERO);
}
