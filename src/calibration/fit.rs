//! Fitting execution-model parameters from live trade records

use super::{CalibrationError, CalibrationMetadata, CalibrationOptions, LiveTradeRecord};
use crate::cost::CostModel;
use crate::execution::{
    ExecutionModel, FailureModel, FillFractionDistribution, LatencyModel, PartialFillModel,
    ReorgModel, SlippageKind, SlippageModel,
};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const MAX_BPS: f64 = 10_000.0;
const CONGESTED: f64 = 0.5;

fn require(metric: &'static str, count: usize, required: usize) -> Result<(), CalibrationError> {
    if count < required {
        return Err(CalibrationError::InsufficientSamples {
            metric,
            count,
            required,
        });
    }
    Ok(())
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Least-squares slope of `ys` on `xs`; zero when `xs` has no spread
fn ols_slope(xs: &[f64], ys: &[f64]) -> f64 {
    let var_x = variance(xs);
    if var_x <= 0.0 {
        return 0.0;
    }
    let mx = mean(xs);
    let my = mean(ys);
    let cov = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (x - mx) * (y - my))
        .sum::<f64>()
        / xs.len() as f64;
    cov / var_x
}

fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values
}

/// Linearly interpolated quantile of sorted, non-empty data
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

fn check_records(records: &[&LiveTradeRecord]) -> Result<(), CalibrationError> {
    let finite = |v: Option<f64>| v.map_or(true, f64::is_finite);
    for (index, r) in records.iter().enumerate() {
        let bad = if !r.trade_size.is_finite() || r.trade_size < 0.0 {
            Some("trade_size")
        } else if !finite(r.latency_ms) {
            Some("latency")
        } else if !finite(r.slippage_bps) {
            Some("slippage")
        } else if !finite(r.fill_fraction) {
            Some("fill_fraction")
        } else if !r.congestion_level.is_finite() || !r.fee_shortfall.is_finite() {
            Some("failure")
        } else if !finite(r.priority_fee_micro_lamports_per_cu) {
            Some("priority_fee")
        } else {
            None
        };
        if let Some(metric) = bad {
            return Err(CalibrationError::BadRecord { metric, index });
        }
    }
    Ok(())
}

fn fit_latency(landed: &[&LiveTradeRecord], min_samples: usize) -> Result<LatencyModel, CalibrationError> {
    let samples: Vec<(f64, f64)> = landed
        .iter()
        .filter_map(|r| r.latency_ms.map(|l| (l.max(0.0), r.congestion_level)))
        .collect();
    require("latency", samples.len(), min_samples)?;

    let values: Vec<f64> = samples.iter().map(|(l, _)| *l).collect();
    if variance(&values) <= 0.0 {
        return Err(CalibrationError::DegenerateDistribution {
            metric: "latency",
            count: values.len(),
        });
    }

    let (congested, calm): (Vec<_>, Vec<_>) = samples.iter().partition(|(_, c)| *c >= CONGESTED);
    let congested: Vec<f64> = congested.iter().map(|(l, _)| *l).collect();
    let calm: Vec<f64> = calm.iter().map(|(l, _)| *l).collect();
    let cap = if !congested.is_empty() && mean(&calm) > 0.0 {
        (mean(&congested) / mean(&calm)).clamp(1.0, 1_000.0)
    } else {
        1.0
    };

    let sorted = sorted(values);
    Ok(LatencyModel::percentile(
        percentile(&sorted, 0.50),
        percentile(&sorted, 0.90),
        percentile(&sorted, 0.99),
    )
    .with_congestion_cap(cap))
}

/// Sqrt-impact coefficient by least squares through the origin
fn fit_slippage(landed: &[&LiveTradeRecord], min_samples: usize) -> Result<SlippageModel, CalibrationError> {
    let pairs: Vec<(f64, f64)> = landed
        .iter()
        .filter_map(|r| r.slippage_bps.map(|s| (r.trade_size, s.clamp(0.0, MAX_BPS))))
        .collect();
    require("slippage", pairs.len(), min_samples)?;

    let slips: Vec<f64> = pairs.iter().map(|(_, s)| *s).collect();
    if variance(&slips) <= 0.0 {
        return Err(CalibrationError::DegenerateDistribution {
            metric: "slippage",
            count: slips.len(),
        });
    }

    let sum_size: f64 = pairs.iter().map(|(size, _)| size).sum();
    let kind = if sum_size > 0.0 {
        let weighted: f64 = pairs.iter().map(|(size, s)| s * size.sqrt()).sum();
        SlippageKind::Sqrt {
            coefficient: weighted / sum_size,
        }
    } else {
        SlippageKind::Fixed { bps: mean(&slips) }
    };

    let sorted = sorted(slips);
    Ok(SlippageModel::new(kind, sorted[0], sorted[sorted.len() - 1]))
}

/// Base rate plus congestion and fee-shortfall slopes, each fitted alone
fn fit_failure(records: &[&LiveTradeRecord]) -> FailureModel {
    let failed: Vec<f64> = records
        .iter()
        .map(|r| if r.failed { 1.0 } else { 0.0 })
        .collect();
    let congestion: Vec<f64> = records.iter().map(|r| r.congestion_level.clamp(0.0, 1.0)).collect();
    let shortfall: Vec<f64> = records.iter().map(|r| r.fee_shortfall.clamp(0.0, 1.0)).collect();

    let rate = mean(&failed);
    let congestion_slope = ols_slope(&congestion, &failed).clamp(0.0, 1.0);
    let shortfall_slope = ols_slope(&shortfall, &failed).clamp(0.0, 1.0);
    let base = (rate - congestion_slope * mean(&congestion) - shortfall_slope * mean(&shortfall))
        .clamp(0.0, 1.0);

    FailureModel {
        base_failure_rate: base,
        congestion_failure_rate: congestion_slope,
        fee_shortfall_failure_rate: shortfall_slope,
        max_failure_rate: (base + congestion_slope + shortfall_slope).clamp(base, 1.0),
    }
}

/// Partial-fill rate and a method-of-moments beta over partial fractions
fn fit_partial_fill(landed: &[&LiveTradeRecord]) -> PartialFillModel {
    let fractions: Vec<f64> = landed
        .iter()
        .filter_map(|r| r.fill_fraction)
        .map(|f| f.clamp(0.0, 1.0))
        .filter(|f| *f < 1.0)
        .collect();
    if fractions.is_empty() || landed.is_empty() {
        return PartialFillModel::never();
    }

    let probability = fractions.len() as f64 / landed.len() as f64;
    let m = mean(&fractions);
    let v = variance(&fractions);
    let common = if v > 0.0 { m * (1.0 - m) / v - 1.0 } else { 0.0 };

    let fill_fraction = if common > 0.0 && m > 0.0 && m < 1.0 {
        FillFractionDistribution::Beta {
            alpha: m * common,
            beta: (1.0 - m) * common,
        }
    } else {
        let sorted = sorted(fractions);
        FillFractionDistribution::Uniform {
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        }
    };

    PartialFillModel {
        probability,
        fill_fraction,
    }
}

fn fit_reorg(landed: &[&LiveTradeRecord]) -> ReorgModel {
    let depths: Vec<u32> = landed
        .iter()
        .map(|r| r.reorg_depth)
        .filter(|d| *d > 0)
        .collect();
    let max_depth = match depths.iter().max() {
        Some(max) => *max,
        None => return ReorgModel::never(),
    };
    let as_f64: Vec<f64> = depths.iter().map(|d| f64::from(*d)).collect();
    ReorgModel {
        probability: depths.len() as f64 / landed.len() as f64,
        average_depth: mean(&as_f64),
        max_depth,
    }
}

/// Priority-fee median and max, mean compute units; fees from the template
fn fit_cost(landed: &[&LiveTradeRecord], template: &CostModel) -> CostModel {
    let mut cost = template.clone();

    let fees: Vec<f64> = landed
        .iter()
        .filter_map(|r| r.priority_fee_micro_lamports_per_cu)
        .map(|f| f.max(0.0))
        .collect();
    if !fees.is_empty() {
        let fees = sorted(fees);
        if let (Ok(median), Ok(max)) = (
            Decimal::try_from(percentile(&fees, 0.5)),
            Decimal::try_from(fees[fees.len() - 1]),
        ) {
            cost.priority_fee.base_micro_lamports_per_cu = median;
            cost.priority_fee.max_micro_lamports_per_cu = max;
            cost.priority_fee.congestion_multiplier = dec!(1);
        }
    }

    let units: Vec<f64> = landed
        .iter()
        .filter_map(|r| r.compute_units)
        .map(|u| u as f64)
        .collect();
    if !units.is_empty() {
        cost.average_compute_units = mean(&units).round() as u64;
    }

    cost
}

/// Fit an execution model for `venue` with default options
pub fn calibrate_execution_model(
    records: &[LiveTradeRecord],
    venue: &str,
) -> Result<ExecutionModel, CalibrationError> {
    calibrate_execution_model_with(records, venue, &CalibrationOptions::default())
}

/// Fit an execution model for `venue`
///
/// Records tagged with a different venue are dropped first. The remaining
/// set, and every per-metric subset a distribution is fitted from, must hold
/// at least `options.min_samples` records. Output depends only on the
/// records and options, apart from the timestamp when none is fixed.
pub fn calibrate_execution_model_with(
    records: &[LiveTradeRecord],
    venue: &str,
    options: &CalibrationOptions,
) -> Result<ExecutionModel, CalibrationError> {
    let records: Vec<&LiveTradeRecord> = records.iter().filter(|r| r.matches_venue(venue)).collect();
    require("records", records.len(), options.min_samples)?;
    check_records(&records)?;

    let landed: Vec<&LiveTradeRecord> = records.iter().copied().filter(|r| !r.failed).collect();

    let model = ExecutionModel {
        venue: venue.to_string(),
        latency: fit_latency(&landed, options.min_samples)?,
        slippage: fit_slippage(&landed, options.min_samples)?,
        failure: fit_failure(&records),
        partial_fill: fit_partial_fill(&landed),
        reorg: fit_reorg(&landed),
        cost: fit_cost(&landed, &options.cost_template),
        slot_time_ms: options.slot_time_ms,
        calibration: Some(CalibrationMetadata {
            calibrated_at: options.calibrated_at.unwrap_or_else(Utc::now),
            source: options.source.clone(),
            sample_size: records.len(),
            venue: venue.to_string(),
        }),
    };
    model.validate()?;

    tracing::info!(
        venue,
        sample_size = records.len(),
        landed = landed.len(),
        failure_rate = model.failure.base_failure_rate,
        "execution model calibrated"
    );

    Ok(model)
}
