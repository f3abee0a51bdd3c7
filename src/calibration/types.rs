//! Calibration inputs, options, and errors

use crate::cost::CostModel;
use crate::validation::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One observed live trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveTradeRecord {
    /// Records tagged with another venue are ignored
    #[serde(default)]
    pub venue: Option<String>,
    /// Notional in quote currency
    pub trade_size: f64,
    pub failed: bool,
    /// Submit-to-confirm latency; absent for failed transactions
    #[serde(default)]
    pub latency_ms: Option<f64>,
    /// Adverse slippage against the quote
    #[serde(default)]
    pub slippage_bps: Option<f64>,
    #[serde(default)]
    pub congestion_level: f64,
    #[serde(default)]
    pub fee_shortfall: f64,
    /// Absent means a full fill
    #[serde(default)]
    pub fill_fraction: Option<f64>,
    #[serde(default)]
    pub reorg_depth: u32,
    #[serde(default)]
    pub priority_fee_micro_lamports_per_cu: Option<f64>,
    #[serde(default)]
    pub compute_units: Option<u64>,
}

impl LiveTradeRecord {
    /// A confirmed, fully filled trade
    pub fn filled(trade_size: f64, latency_ms: f64, slippage_bps: f64) -> Self {
        Self {
            venue: None,
            trade_size,
            failed: false,
            latency_ms: Some(latency_ms),
            slippage_bps: Some(slippage_bps),
            congestion_level: 0.0,
            fee_shortfall: 0.0,
            fill_fraction: None,
            reorg_depth: 0,
            priority_fee_micro_lamports_per_cu: None,
            compute_units: None,
        }
    }

    /// A transaction that never landed
    pub fn failed(trade_size: f64) -> Self {
        Self {
            failed: true,
            latency_ms: None,
            slippage_bps: None,
            ..Self::filled(trade_size, 0.0, 0.0)
        }
    }

    pub(crate) fn matches_venue(&self, venue: &str) -> bool {
        self.venue.as_deref().map_or(true, |v| v == venue)
    }
}

/// Calibration knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOptions {
    /// Smallest sample any fitted distribution may come from
    pub min_samples: usize,
    pub source: String,
    /// Fees are not observable from fills; fee fields come from here
    pub cost_template: CostModel,
    /// Fixed stamp for reproducible artifacts; now when absent
    pub calibrated_at: Option<DateTime<Utc>>,
    pub slot_time_ms: f64,
}

impl Default for CalibrationOptions {
    fn default() -> Self {
        Self {
            min_samples: 30,
            source: "live_trades".to_string(),
            cost_template: CostModel::default(),
            calibrated_at: None,
            slot_time_ms: 400.0,
        }
    }
}

/// Provenance attached to a calibrated model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationMetadata {
    pub calibrated_at: DateTime<Utc>,
    pub source: String,
    pub sample_size: usize,
    pub venue: String,
}

/// Calibration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("insufficient samples for {metric}: {count} < {required}")]
    InsufficientSamples {
        metric: &'static str,
        count: usize,
        required: usize,
    },
    #[error("degenerate {metric} distribution: {count} samples with zero variance")]
    DegenerateDistribution { metric: &'static str, count: usize },
    #[error("non-finite {metric} value in record {index}")]
    BadRecord { metric: &'static str, index: usize },
    /// Fitted parameters fell outside the model's declared ranges
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}
