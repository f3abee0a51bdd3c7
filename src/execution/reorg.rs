//! Chain reorganization model

use super::rng::{bernoulli, triangular, UniformRng};
use super::TradeContext;
use crate::validation::{check_range, check_unit, ValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorgModel {
    pub probability: f64,
    /// Mode of the depth distribution, in blocks
    pub average_depth: f64,
    pub max_depth: u32,
}

impl ReorgModel {
    pub fn never() -> Self {
        Self {
            probability: 0.0,
            average_depth: 1.0,
            max_depth: 1,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_unit("reorg.probability", self.probability)?;
        if self.max_depth == 0 {
            return Err(ValidationError::Inconsistent {
                context: "reorg",
                message: "max_depth must be at least 1".to_string(),
            });
        }
        check_range(
            "reorg.average_depth",
            self.average_depth,
            1.0,
            f64::from(self.max_depth),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorgOutcome {
    pub reorged: bool,
    /// Blocks rolled back; 0 when no reorg
    pub depth: u32,
}

/// Bernoulli draw for a reorg, then a depth in `[1, max_depth]`
///
/// Depth is triangular with its mode at `average_depth`, rounded to whole
/// blocks. Reorgs are a chain property; the trade context does not shift
/// them.
pub fn sample_reorg<R: UniformRng + ?Sized>(
    model: &ReorgModel,
    _ctx: &TradeContext,
    rng: &mut R,
) -> ReorgOutcome {
    if !bernoulli(rng, model.probability) {
        return ReorgOutcome {
            reorged: false,
            depth: 0,
        };
    }

    let max = f64::from(model.max_depth.max(1));
    let mode = model.average_depth.clamp(1.0, max);
    let depth = triangular(rng, 1.0, mode, max).round().clamp(1.0, max);

    ReorgOutcome {
        reorged: true,
        depth: depth as u32,
    }
}
