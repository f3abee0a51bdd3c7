//! Execution reality module
//!
//! Stochastic models for what happens between deciding to trade and the
//! trade settling: latency, slippage, transaction failure, partial fills and
//! chain reorganizations. Samplers are pure given an RNG.

mod failure;
mod latency;
pub(crate) mod model;
mod partial_fill;
mod reality;
mod reorg;
mod rng;
mod slippage;

pub use failure::{sample_failure, FailureModel, FailureOutcome};
pub use latency::{sample_latency, LatencyDistribution, LatencyModel};
pub use model::ExecutionModel;
pub use partial_fill::{
    sample_partial_fill, FillFractionDistribution, PartialFillModel, PartialFillOutcome,
};
pub use reality::{apply_execution_reality, FailureStage, RealizedExecution};
pub use reorg::{sample_reorg, ReorgModel, ReorgOutcome};
pub use rng::{SeededRng, SequenceRng, UniformRng};
pub use slippage::{sample_slippage, SlippageKind, SlippageModel};

use serde::{Deserialize, Serialize};

/// Market conditions a single trade executes under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeContext {
    /// Intended notional in quote currency
    pub trade_size: f64,
    #[serde(default)]
    pub market_volume_24h: Option<f64>,
    /// Scales sampled slippage; 1.0 when absent
    #[serde(default)]
    pub volatility_multiplier: Option<f64>,
    /// Network congestion in `[0, 1]`
    #[serde(default)]
    pub congestion_level: f64,
    /// How far the bid priority fee falls short of the going rate, in `[0, 1]`
    #[serde(default)]
    pub fee_shortfall: f64,
    /// Native chain token price in quote currency
    pub native_price: f64,
}

impl TradeContext {
    pub fn new(trade_size: f64, native_price: f64) -> Self {
        Self {
            trade_size,
            market_volume_24h: None,
            volatility_multiplier: None,
            congestion_level: 0.0,
            fee_shortfall: 0.0,
            native_price,
        }
    }

    pub fn with_congestion(mut self, level: f64) -> Self {
        self.congestion_level = level;
        self
    }

    pub fn with_volume(mut self, volume_24h: f64) -> Self {
        self.market_volume_24h = Some(volume_24h);
        self
    }

    pub fn with_volatility(mut self, multiplier: f64) -> Self {
        self.volatility_multiplier = Some(multiplier);
        self
    }

    pub fn with_fee_shortfall(mut self, shortfall: f64) -> Self {
        self.fee_shortfall = shortfall;
        self
    }
}
