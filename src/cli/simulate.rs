//! Simulate command implementation

use crate::candle::{validate_candles, Candle};
use crate::config::Config;
use crate::execution::{apply_execution_reality, ExecutionModel, RealizedExecution, SeededRng, TradeContext};
use crate::policy::{execute_policy, PolicyExecutionResult};
use crate::risk::{CircuitBreakerDecision, RiskError, RiskSession, RollingRiskState};
use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// JSON array of candles
    #[arg(long)]
    pub candles: PathBuf,

    /// Entry time in unix milliseconds
    #[arg(long)]
    pub entry_ts_ms: i64,

    /// Execution model artifact to apply on top of the idealized result
    #[arg(long)]
    pub execution_model: Option<PathBuf>,

    /// RNG seed; overrides the configured one
    #[arg(long)]
    pub seed: Option<u64>,

    /// Strategy name used for exposure accounting
    #[arg(long, default_value = "cli")]
    pub strategy: String,
}

/// Everything the simulate command prints
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub policy: &'static str,
    pub result: PolicyExecutionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realized: Option<RealizedExecution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<CircuitBreakerDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_state: Option<RollingRiskState>,
}

fn load_candles(path: &Path) -> anyhow::Result<Vec<Candle>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading candles from {}", path.display()))?;
    let candles: Vec<Candle> = serde_json::from_str(&content)
        .with_context(|| format!("parsing candles from {}", path.display()))?;
    validate_candles(&candles)?;
    Ok(candles)
}

impl SimulateArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<SimulationReport> {
        let candles = load_candles(&self.candles)?;
        tracing::info!(
            candles = candles.len(),
            policy = config.policy.kind(),
            entry_ts_ms = self.entry_ts_ms,
            "Simulating trade"
        );

        let sim = &config.simulation;
        let mut report = SimulationReport {
            policy: config.policy.kind(),
            result: PolicyExecutionResult::no_entry(self.entry_ts_ms),
            realized: None,
            risk: None,
            risk_state: None,
        };

        let entry_time: DateTime<Utc> = DateTime::from_timestamp_millis(self.entry_ts_ms)
            .context("entry timestamp out of range")?;
        let notional = Decimal::try_from(sim.trade_size)?;

        let mut session = config
            .risk
            .clone()
            .map(|framework| RiskSession::new(framework, sim.venue.clone(), sim.initial_equity, entry_time));
        if let Some(session) = session.as_mut() {
            match session.try_open(&self.strategy, notional, entry_time) {
                Ok(()) => report.risk = Some(CircuitBreakerDecision::allow()),
                Err(RiskError::TradingHalted(reason)) => {
                    tracing::warn!(?reason, "Trade blocked by circuit breaker");
                    report.risk = Some(CircuitBreakerDecision::halt(reason));
                    report.risk_state = Some(session.state().clone());
                    return Ok(report);
                }
                Err(e) => return Err(e.into()),
            }
        }

        report.result = execute_policy(&candles, self.entry_ts_ms, &config.policy, sim.fees.as_ref());
        let mut net_return_bps = report.result.realized_return_bps;
        let mut exit_ts_ms = report.result.exit_ts_ms;

        if let Some(path) = &self.execution_model {
            let model = ExecutionModel::load(path)
                .with_context(|| format!("loading execution model from {}", path.display()))?;
            if model.venue != sim.venue {
                tracing::warn!(model = %model.venue, configured = %sim.venue, "Execution model venue differs from configured venue");
            }
            let ctx = TradeContext::new(sim.trade_size, sim.native_price).with_congestion(sim.congestion_level);
            let mut rng = SeededRng::new(self.seed.unwrap_or(sim.seed));
            let realized = apply_execution_reality(&report.result, &model, &ctx, &mut rng)?;
            net_return_bps = realized.net_return_bps;
            exit_ts_ms = realized.exit_ts_ms;
            report.realized = Some(realized);
        }

        if let Some(session) = session.as_mut() {
            let pnl = notional * Decimal::try_from(net_return_bps / 10_000.0).unwrap_or(Decimal::ZERO);
            let exit_time = DateTime::from_timestamp_millis(exit_ts_ms).unwrap_or(entry_time);
            session.close_position(&self.strategy, notional, pnl, exit_time)?;
            report.risk_state = Some(session.state().clone());
        }

        tracing::info!(
            exit_reason = %report.result.exit_reason,
            realized_bps = report.result.realized_return_bps,
            net_bps = net_return_bps,
            "Simulation complete"
        );
        Ok(report)
    }
}
