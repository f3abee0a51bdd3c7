//! Network + confirmation latency model

use super::rng::{standard_normal, UniformRng};
use super::TradeContext;
use crate::validation::{check_non_negative, check_ordered, check_range, ValidationError};
use serde::{Deserialize, Serialize};

/// Shape of the latency distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LatencyDistribution {
    /// Piecewise-linear quantile function through p50/p90/p99
    Percentile {
        p50_ms: f64,
        p90_ms: f64,
        p99_ms: f64,
    },
    /// Gaussian, floored at zero
    Normal { mean_ms: f64, stddev_ms: f64 },
}

/// Latency model for one venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyModel {
    pub distribution: LatencyDistribution,
    /// Uniform jitter added on top of the drawn latency
    #[serde(default)]
    pub jitter_ms: f64,
    /// Multiplier applied at full congestion; interpolated from 1 below that
    #[serde(default = "default_congestion_cap")]
    pub congestion_multiplier_cap: f64,
}

fn default_congestion_cap() -> f64 {
    1.0
}

impl LatencyModel {
    pub fn percentile(p50_ms: f64, p90_ms: f64, p99_ms: f64) -> Self {
        Self {
            distribution: LatencyDistribution::Percentile {
                p50_ms,
                p90_ms,
                p99_ms,
            },
            jitter_ms: 0.0,
            congestion_multiplier_cap: 1.0,
        }
    }

    pub fn normal(mean_ms: f64, stddev_ms: f64) -> Self {
        Self {
            distribution: LatencyDistribution::Normal { mean_ms, stddev_ms },
            jitter_ms: 0.0,
            congestion_multiplier_cap: 1.0,
        }
    }

    pub fn with_jitter(mut self, jitter_ms: f64) -> Self {
        self.jitter_ms = jitter_ms;
        self
    }

    pub fn with_congestion_cap(mut self, cap: f64) -> Self {
        self.congestion_multiplier_cap = cap;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.distribution {
            LatencyDistribution::Percentile {
                p50_ms,
                p90_ms,
                p99_ms,
            } => {
                check_non_negative("latency.p50_ms", p50_ms)?;
                check_non_negative("latency.p90_ms", p90_ms)?;
                check_non_negative("latency.p99_ms", p99_ms)?;
                check_ordered("latency.p50_ms", p50_ms, "latency.p90_ms", p90_ms)?;
                check_ordered("latency.p90_ms", p90_ms, "latency.p99_ms", p99_ms)?;
            }
            LatencyDistribution::Normal { mean_ms, stddev_ms } => {
                check_non_negative("latency.mean_ms", mean_ms)?;
                check_non_negative("latency.stddev_ms", stddev_ms)?;
            }
        }
        check_non_negative("latency.jitter_ms", self.jitter_ms)?;
        check_range(
            "latency.congestion_multiplier_cap",
            self.congestion_multiplier_cap,
            1.0,
            1_000.0,
        )
    }

    /// Multiplier for a congestion level in `[0, 1]`
    pub fn congestion_multiplier(&self, congestion_level: f64) -> f64 {
        1.0 + (self.congestion_multiplier_cap - 1.0) * congestion_level.clamp(0.0, 1.0)
    }
}

/// Latency at quantile `q` of the piecewise-linear percentile curve
///
/// Breakpoints are `(0, p50/2)`, `(0.5, p50)`, `(0.9, p90)`, `(0.99, p99)` and
/// `(1, p99 + (p99 - p90))`.
fn percentile_quantile(q: f64, p50: f64, p90: f64, p99: f64) -> f64 {
    let points = [
        (0.0, p50 * 0.5),
        (0.5, p50),
        (0.9, p90),
        (0.99, p99),
        (1.0, p99 + (p99 - p90)),
    ];
    let q = q.clamp(0.0, 1.0);
    for pair in points.windows(2) {
        let (q0, v0) = pair[0];
        let (q1, v1) = pair[1];
        if q <= q1 {
            return v0 + (v1 - v0) * (q - q0) / (q1 - q0);
        }
    }
    points[points.len() - 1].1
}

/// Draw one latency in milliseconds
///
/// Draws the quantile, then the jitter, in that order, so the stream
/// consumption per call is fixed.
pub fn sample_latency<R: UniformRng + ?Sized>(
    model: &LatencyModel,
    ctx: &TradeContext,
    rng: &mut R,
) -> f64 {
    let base = match model.distribution {
        LatencyDistribution::Percentile {
            p50_ms,
            p90_ms,
            p99_ms,
        } => percentile_quantile(rng.next_f64(), p50_ms, p90_ms, p99_ms),
        LatencyDistribution::Normal { mean_ms, stddev_ms } => {
            mean_ms + stddev_ms * standard_normal(rng)
        }
    };
    let jitter = rng.next_f64() * model.jitter_ms;

    ((base.max(0.0) + jitter) * model.congestion_multiplier(ctx.congestion_level)).max(0.0)
}
