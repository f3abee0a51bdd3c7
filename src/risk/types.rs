//! Risk management types

use super::{AnomalyKind, HaltReason};
use rust_decimal::Decimal;
use thiserror::Error;

/// Risk management errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    /// A circuit breaker is tripped
    #[error("Trading halted: {0:?}")]
    TradingHalted(HaltReason),
    /// Execution metrics are spiking
    #[error("Execution anomaly detected: {0:?}")]
    Anomaly(AnomalyKind),
    /// Closing more than is open for a strategy
    #[error("Strategy {strategy} has {open} open, cannot close {requested}")]
    ExposureUnderflow {
        strategy: String,
        open: Decimal,
        requested: Decimal,
    },
}
