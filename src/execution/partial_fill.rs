//! Partial fill model

use super::rng::{bernoulli, beta, standard_normal, UniformRng};
use super::TradeContext;
use crate::validation::{check_non_negative, check_ordered, check_positive, check_unit, ValidationError};
use serde::{Deserialize, Serialize};

/// Distribution of the filled fraction when a fill is partial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "distribution", rename_all = "snake_case")]
pub enum FillFractionDistribution {
    Uniform { min: f64, max: f64 },
    /// Clamped to `[0, 1]`
    Normal { mean: f64, stddev: f64 },
    Beta { alpha: f64, beta: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialFillModel {
    pub probability: f64,
    pub fill_fraction: FillFractionDistribution,
}

impl PartialFillModel {
    /// Model that always fills completely
    pub fn never() -> Self {
        Self {
            probability: 0.0,
            fill_fraction: FillFractionDistribution::Uniform { min: 1.0, max: 1.0 },
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_unit("partial_fill.probability", self.probability)?;
        match self.fill_fraction {
            FillFractionDistribution::Uniform { min, max } => {
                check_unit("partial_fill.min", min)?;
                check_unit("partial_fill.max", max)?;
                check_ordered("partial_fill.min", min, "partial_fill.max", max)?;
            }
            FillFractionDistribution::Normal { mean, stddev } => {
                check_unit("partial_fill.mean", mean)?;
                check_non_negative("partial_fill.stddev", stddev)?;
            }
            FillFractionDistribution::Beta { alpha, beta } => {
                check_positive("partial_fill.alpha", alpha)?;
                check_positive("partial_fill.beta", beta)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartialFillOutcome {
    pub partial: bool,
    /// 1.0 for a complete fill
    pub fill_fraction: f64,
}

/// Bernoulli draw for a partial fill, then the filled fraction
///
/// Fill behaviour is calibrated per venue, so the trade context does not
/// shift it.
pub fn sample_partial_fill<R: UniformRng + ?Sized>(
    model: &PartialFillModel,
    _ctx: &TradeContext,
    rng: &mut R,
) -> PartialFillOutcome {
    if !bernoulli(rng, model.probability) {
        return PartialFillOutcome {
            partial: false,
            fill_fraction: 1.0,
        };
    }

    let fraction = match model.fill_fraction {
        FillFractionDistribution::Uniform { min, max } => min + (max - min) * rng.next_f64(),
        FillFractionDistribution::Normal { mean, stddev } => mean + stddev * standard_normal(rng),
        FillFractionDistribution::Beta { alpha, beta: b } => beta(rng, alpha, b),
    };

    PartialFillOutcome {
        partial: true,
        fill_fraction: fraction.clamp(0.0, 1.0),
    }
}
