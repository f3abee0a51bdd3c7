//! Execution reality composer
//!
//! Turns an idealized [`PolicyExecutionResult`] into what a live bot would
//! plausibly have realized: delayed fills, adverse slippage on both legs,
//! failed or partial transactions, reorg delay, and venue costs.
//!
//! Draw order per call is fixed (entry failure, entry latency, entry reorg,
//! partial fill, entry slippage, exit failure, exit latency, exit reorg, exit
//! slippage, then the retry draws if the exit failed) so a seeded RNG replays
//! exactly.

use super::{
    sample_failure, sample_latency, sample_partial_fill, sample_reorg, sample_slippage,
    ExecutionModel, TradeContext, UniformRng,
};
use crate::cost::{apply_cost_model, CostError, CostResult, Liquidity, TradeCostInput, TradeSide};
use crate::policy::{ExitReason, PolicyExecutionResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const BPS: f64 = 10_000.0;

/// Multiplier on slippage for an exit resubmitted after a failure
const RETRY_SLIPPAGE_MULTIPLIER: f64 = 2.0;

/// Where a simulated trade did not go through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Entry transaction failed; no position
    Entry,
    /// Entry landed but filled nothing
    Unfilled,
}

/// Execution-adjusted outcome of one simulated trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedExecution {
    pub executed: bool,
    pub failure: Option<FailureStage>,
    pub exit_reason: ExitReason,
    pub entry_px: f64,
    pub exit_px: f64,
    pub entry_ts_ms: i64,
    pub exit_ts_ms: i64,
    pub fill_fraction: f64,
    pub entry_latency_ms: f64,
    pub exit_latency_ms: f64,
    pub entry_slippage_bps: f64,
    pub exit_slippage_bps: f64,
    pub entry_reorg_depth: u32,
    pub exit_reorg_depth: u32,
    pub exit_retries: u32,
    pub costs: CostResult,
    /// Price return of the filled quantity
    pub gross_return_bps: f64,
    /// Costs as bps of the filled entry notional
    pub cost_bps: f64,
    pub net_return_bps: f64,
}

impl RealizedExecution {
    fn not_executed(
        ideal: &PolicyExecutionResult,
        failure: Option<FailureStage>,
        costs: CostResult,
        notional: f64,
    ) -> Self {
        let cost_bps = if notional > 0.0 {
            costs.total_cost.to_f64().unwrap_or(0.0) / notional * BPS
        } else {
            0.0
        };
        Self {
            executed: false,
            failure,
            exit_reason: ideal.exit_reason,
            entry_px: 0.0,
            exit_px: 0.0,
            entry_ts_ms: ideal.entry_ts_ms,
            exit_ts_ms: ideal.entry_ts_ms,
            fill_fraction: 0.0,
            entry_latency_ms: 0.0,
            exit_latency_ms: 0.0,
            entry_slippage_bps: 0.0,
            exit_slippage_bps: 0.0,
            entry_reorg_depth: 0,
            exit_reorg_depth: 0,
            exit_retries: 0,
            costs,
            gross_return_bps: 0.0,
            cost_bps,
            net_return_bps: -cost_bps,
        }
    }
}

fn to_decimal(component: &'static str, value: f64) -> Result<Decimal, CostError> {
    Decimal::try_from(value).map_err(|_| CostError::Overflow { component })
}

fn to_ms(latency_ms: f64) -> i64 {
    latency_ms.round() as i64
}

/// Apply the execution model to an idealized policy result
///
/// `ctx.trade_size` is the intended entry notional in quote currency. A
/// failed entry costs the network fees of the landed-but-reverted
/// transaction. A failed exit is resubmitted once with fresh latency and
/// doubled slippage. Only cost arithmetic can fail, on notionals beyond the
/// decimal range.
pub fn apply_execution_reality<R: UniformRng + ?Sized>(
    ideal: &PolicyExecutionResult,
    model: &ExecutionModel,
    ctx: &TradeContext,
    rng: &mut R,
) -> Result<RealizedExecution, CostError> {
    if !ideal.entered() {
        return Ok(RealizedExecution::not_executed(ideal, None, CostResult::default(), 0.0));
    }

    let native_price = to_decimal("native_price", ctx.native_price)?;
    let network_only = |px: f64| -> Result<TradeCostInput, CostError> {
        Ok(TradeCostInput {
            size: Decimal::ZERO,
            price: to_decimal("price", px)?,
            side: TradeSide::Buy,
            liquidity: Liquidity::Taker,
            native_price,
            holding_ms: 0,
        })
    };

    // Entry leg
    let entry_failure = sample_failure(&model.failure, ctx, rng);
    if entry_failure.failed {
        let costs = apply_cost_model(&model.cost, &network_only(ideal.entry_px)?)?;
        tracing::debug!(
            probability = entry_failure.probability,
            "simulated entry transaction failed"
        );
        return Ok(RealizedExecution::not_executed(
            ideal,
            Some(FailureStage::Entry),
            costs,
            ctx.trade_size,
        ));
    }

    let mut entry_latency_ms = sample_latency(&model.latency, ctx, rng);
    let entry_reorg = sample_reorg(&model.reorg, ctx, rng);
    entry_latency_ms += f64::from(entry_reorg.depth) * model.slot_time_ms;

    let fill = sample_partial_fill(&model.partial_fill, ctx, rng);
    if fill.fill_fraction <= 0.0 {
        let costs = apply_cost_model(&model.cost, &network_only(ideal.entry_px)?)?;
        return Ok(RealizedExecution::not_executed(
            ideal,
            Some(FailureStage::Unfilled),
            costs,
            ctx.trade_size,
        ));
    }

    let entry_slippage_bps = sample_slippage(&model.slippage, ctx, rng);
    let entry_px = ideal.entry_px * (1.0 + entry_slippage_bps / BPS);
    let filled_notional = ctx.trade_size * fill.fill_fraction;
    let quantity = if entry_px > 0.0 {
        filled_notional / entry_px
    } else {
        0.0
    };

    // Exit leg
    let exit_failure = sample_failure(&model.failure, ctx, rng);
    let mut exit_latency_ms = sample_latency(&model.latency, ctx, rng);
    let exit_reorg = sample_reorg(&model.reorg, ctx, rng);
    exit_latency_ms += f64::from(exit_reorg.depth) * model.slot_time_ms;
    let mut exit_slippage_bps = sample_slippage(&model.slippage, ctx, rng);

    let mut exit_retries = 0;
    let mut wasted_exit = CostResult::default();
    if exit_failure.failed {
        exit_retries = 1;
        wasted_exit = apply_cost_model(&model.cost, &network_only(ideal.exit_px)?)?;
        exit_latency_ms += sample_latency(&model.latency, ctx, rng);
        exit_slippage_bps = (sample_slippage(&model.slippage, ctx, rng)
            * RETRY_SLIPPAGE_MULTIPLIER)
            .min(BPS);
    }
    let exit_px = ideal.exit_px * (1.0 - exit_slippage_bps / BPS);

    let entry_ts_ms = ideal.entry_ts_ms + to_ms(entry_latency_ms);
    let exit_ts_ms = (ideal.exit_ts_ms + to_ms(exit_latency_ms)).max(entry_ts_ms);

    let quantity = to_decimal("quantity", quantity)?;
    let entry_cost = apply_cost_model(
        &model.cost,
        &TradeCostInput {
            size: quantity,
            price: to_decimal("price", entry_px)?,
            side: TradeSide::Buy,
            liquidity: Liquidity::Taker,
            native_price,
            holding_ms: 0,
        },
    )?;
    let exit_cost = apply_cost_model(
        &model.cost,
        &TradeCostInput {
            size: quantity,
            price: to_decimal("price", exit_px)?,
            side: TradeSide::Sell,
            liquidity: Liquidity::Taker,
            native_price,
            holding_ms: u64::try_from(exit_ts_ms - entry_ts_ms).unwrap_or(0),
        },
    )?;
    let costs = entry_cost.combine(&exit_cost).combine(&wasted_exit);

    let gross_return_bps = (exit_px / entry_px - 1.0) * BPS;
    let cost_bps = if filled_notional > 0.0 {
        costs.total_cost.to_f64().unwrap_or(0.0) / filled_notional * BPS
    } else {
        0.0
    };

    let realized = RealizedExecution {
        executed: true,
        failure: None,
        exit_reason: ideal.exit_reason,
        entry_px,
        exit_px,
        entry_ts_ms,
        exit_ts_ms,
        fill_fraction: fill.fill_fraction,
        entry_latency_ms,
        exit_latency_ms,
        entry_slippage_bps,
        exit_slippage_bps,
        entry_reorg_depth: entry_reorg.depth,
        exit_reorg_depth: exit_reorg.depth,
        exit_retries,
        costs,
        gross_return_bps,
        cost_bps,
        net_return_bps: gross_return_bps - cost_bps,
    };

    tracing::debug!(
        venue = %model.venue,
        ideal_bps = ideal.realized_return_bps,
        net_bps = realized.net_return_bps,
        fill_fraction = realized.fill_fraction,
        "execution reality applied"
    );

    Ok(realized)
}
