//! Risk management module
//!
//! Circuit breakers and anomaly detectors that decide whether a simulated
//! trade would have been allowed. The checks are pure functions of a
//! caller-held snapshot; [`RiskSession`] is the owner-side state holder.

mod anomaly;
mod framework;
mod limits;
mod session;
mod types;

pub use anomaly::{
    check_anomalies, AnomalyConfig, AnomalyDecision, AnomalyKind, ExecutionSample, MetricsWindow,
    RollingMetrics,
};
pub use framework::{BreakerOverrides, RiskFramework};
pub use limits::{
    check_circuit_breaker, CircuitBreakerConfig, CircuitBreakerDecision, HaltReason,
    RollingRiskState,
};
pub use session::RiskSession;
pub use types::RiskError;
