//! Risk framework configuration with per-venue overrides

use super::{AnomalyConfig, CircuitBreakerConfig};
use crate::validation::{from_json_validated, ValidationError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Partial circuit-breaker config layered over the base for one venue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerOverrides {
    pub max_drawdown_pct: Option<Decimal>,
    pub max_daily_loss_pct: Option<Decimal>,
    pub max_consecutive_losses: Option<u32>,
    pub max_strategy_exposure: Option<Decimal>,
    pub max_total_exposure: Option<Decimal>,
    pub max_trades_per_hour: Option<u32>,
    pub max_trades_per_day: Option<u32>,
}

impl BreakerOverrides {
    pub fn apply(&self, base: &CircuitBreakerConfig) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            max_drawdown_pct: self.max_drawdown_pct.unwrap_or(base.max_drawdown_pct),
            max_daily_loss_pct: self.max_daily_loss_pct.unwrap_or(base.max_daily_loss_pct),
            max_consecutive_losses: self
                .max_consecutive_losses
                .unwrap_or(base.max_consecutive_losses),
            max_strategy_exposure: self
                .max_strategy_exposure
                .unwrap_or(base.max_strategy_exposure),
            max_total_exposure: self.max_total_exposure.unwrap_or(base.max_total_exposure),
            max_trades_per_hour: self.max_trades_per_hour.unwrap_or(base.max_trades_per_hour),
            max_trades_per_day: self.max_trades_per_day.unwrap_or(base.max_trades_per_day),
        }
    }
}

/// Circuit breakers, optional anomaly detection, and venue overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskFramework {
    pub circuit_breakers: CircuitBreakerConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<AnomalyConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub venue_overrides: BTreeMap<String, BreakerOverrides>,
}

impl RiskFramework {
    pub fn new(circuit_breakers: CircuitBreakerConfig) -> Self {
        Self {
            circuit_breakers,
            anomaly: None,
            venue_overrides: BTreeMap::new(),
        }
    }

    pub fn with_anomaly_detection(mut self, anomaly: AnomalyConfig) -> Self {
        self.anomaly = Some(anomaly);
        self
    }

    pub fn with_venue_override(mut self, venue: impl Into<String>, overrides: BreakerOverrides) -> Self {
        self.venue_overrides.insert(venue.into(), overrides);
        self
    }

    /// Effective breaker config for a venue
    pub fn breakers_for(&self, venue: &str) -> CircuitBreakerConfig {
        match self.venue_overrides.get(venue) {
            Some(overrides) => overrides.apply(&self.circuit_breakers),
            None => self.circuit_breakers.clone(),
        }
    }

    /// Validates the base config and every merged venue config
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.circuit_breakers.validate()?;
        if let Some(anomaly) = &self.anomaly {
            anomaly.validate()?;
        }
        for venue in self.venue_overrides.keys() {
            self.breakers_for(venue).validate()?;
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        from_json_validated(json, Self::validate)
    }
}
