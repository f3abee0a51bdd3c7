//! Slippage model

use super::rng::UniformRng;
use super::TradeContext;
use crate::validation::{check_bps, check_non_negative, check_ordered, check_unit, ValidationError};
use serde::{Deserialize, Serialize};

const MAX_BPS: f64 = 10_000.0;

/// How raw slippage scales with trade size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlippageKind {
    /// Constant bps
    Fixed { bps: f64 },
    /// `size * coefficient`
    Linear { coefficient: f64 },
    /// `sqrt(size) * coefficient`
    Sqrt { coefficient: f64 },
    /// `size / volume_24h * impact_bps`
    VolumeBased { impact_bps: f64 },
}

/// Slippage model for one venue, in bps of the reference price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlippageModel {
    pub kind: SlippageKind,
    pub min_bps: f64,
    pub max_bps: f64,
    /// Symmetric multiplicative noise: raw * (1 ± noise_pct)
    #[serde(default)]
    pub noise_pct: f64,
}

impl SlippageModel {
    pub fn new(kind: SlippageKind, min_bps: f64, max_bps: f64) -> Self {
        Self {
            kind,
            min_bps,
            max_bps,
            noise_pct: 0.0,
        }
    }

    pub fn with_noise(mut self, noise_pct: f64) -> Self {
        self.noise_pct = noise_pct;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.kind {
            SlippageKind::Fixed { bps } => check_bps("slippage.bps", bps)?,
            SlippageKind::Linear { coefficient } => {
                check_non_negative("slippage.coefficient", coefficient)?
            }
            SlippageKind::Sqrt { coefficient } => {
                check_non_negative("slippage.coefficient", coefficient)?
            }
            SlippageKind::VolumeBased { impact_bps } => {
                check_bps("slippage.impact_bps", impact_bps)?
            }
        }
        check_bps("slippage.min_bps", self.min_bps)?;
        check_bps("slippage.max_bps", self.max_bps)?;
        check_ordered("slippage.min_bps", self.min_bps, "slippage.max_bps", self.max_bps)?;
        check_unit("slippage.noise_pct", self.noise_pct)
    }

    /// Deterministic slippage before noise and clamping
    pub fn raw_bps(&self, ctx: &TradeContext) -> f64 {
        let size = ctx.trade_size.max(0.0);
        match self.kind {
            SlippageKind::Fixed { bps } => bps,
            SlippageKind::Linear { coefficient } => size * coefficient,
            SlippageKind::Sqrt { coefficient } => size.sqrt() * coefficient,
            SlippageKind::VolumeBased { impact_bps } => match ctx.market_volume_24h {
                Some(volume) if volume > 0.0 => size / volume * impact_bps,
                // Unknown liquidity: assume the worst
                _ => self.max_bps,
            },
        }
    }
}

/// Draw slippage in bps for one fill
///
/// Raw impact is perturbed by the noise draw, clamped to
/// `[min_bps, max_bps]`, then scaled by the context's volatility multiplier.
pub fn sample_slippage<R: UniformRng + ?Sized>(
    model: &SlippageModel,
    ctx: &TradeContext,
    rng: &mut R,
) -> f64 {
    let noise = 1.0 + model.noise_pct * (2.0 * rng.next_f64() - 1.0);
    let clamped = (model.raw_bps(ctx) * noise).clamp(model.min_bps, model.max_bps);
    let vol = ctx.volatility_multiplier.unwrap_or(1.0).max(0.0);
    (clamped * vol).min(MAX_BPS)
}
