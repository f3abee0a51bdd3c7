//! Transaction failure model

use super::rng::{bernoulli, UniformRng};
use super::TradeContext;
use crate::validation::{check_ordered, check_unit, ValidationError};
use serde::{Deserialize, Serialize};

/// Additive failure-probability model, capped at `max_failure_rate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureModel {
    pub base_failure_rate: f64,
    /// Added per unit of congestion level
    pub congestion_failure_rate: f64,
    /// Added per unit of priority-fee shortfall
    pub fee_shortfall_failure_rate: f64,
    pub max_failure_rate: f64,
}

impl FailureModel {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_unit("failure.base_failure_rate", self.base_failure_rate)?;
        check_unit("failure.congestion_failure_rate", self.congestion_failure_rate)?;
        check_unit(
            "failure.fee_shortfall_failure_rate",
            self.fee_shortfall_failure_rate,
        )?;
        check_unit("failure.max_failure_rate", self.max_failure_rate)?;
        check_ordered(
            "failure.base_failure_rate",
            self.base_failure_rate,
            "failure.max_failure_rate",
            self.max_failure_rate,
        )
    }

    /// Failure probability for a trade context
    pub fn probability(&self, ctx: &TradeContext) -> f64 {
        let p = self.base_failure_rate
            + self.congestion_failure_rate * ctx.congestion_level.clamp(0.0, 1.0)
            + self.fee_shortfall_failure_rate * ctx.fee_shortfall.clamp(0.0, 1.0);
        p.min(self.max_failure_rate).max(0.0)
    }
}

/// Result of one failure draw
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FailureOutcome {
    pub failed: bool,
    pub probability: f64,
}

/// Bernoulli draw against the context's failure probability
pub fn sample_failure<R: UniformRng + ?Sized>(
    model: &FailureModel,
    ctx: &TradeContext,
    rng: &mut R,
) -> FailureOutcome {
    let probability = model.probability(ctx);
    FailureOutcome {
        failed: bernoulli(rng, probability),
        probability,
    }
}
