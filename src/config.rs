//! Configuration types for tradesim

use crate::policy::{FeeSchedule, Policy, TieBreak};
use crate::risk::RiskFramework;
use crate::telemetry::LogFormat;
use crate::validation::{check_positive, check_range, check_unit, ValidationError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    pub policy: Policy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskFramework>,
}

/// Telemetry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

/// Largest entry notional the simulator accepts, in quote currency
pub const MAX_TRADE_SIZE: f64 = 1e12;
/// Largest native token price the simulator accepts, in quote currency
pub const MAX_NATIVE_PRICE: f64 = 1e9;

/// Simulation defaults for the binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// RNG seed for execution-reality draws
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Network congestion in `[0, 1]`
    #[serde(default)]
    pub congestion_level: f64,
    /// Flat fees applied to idealized results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fees: Option<FeeSchedule>,
    /// Entry notional in quote currency
    #[serde(default = "default_trade_size")]
    pub trade_size: f64,
    /// Native token price in quote currency
    #[serde(default = "default_native_price")]
    pub native_price: f64,
    #[serde(default = "default_venue")]
    pub venue: String,
    /// Starting equity for risk checks
    #[serde(default = "default_initial_equity")]
    pub initial_equity: Decimal,
}

fn default_seed() -> u64 {
    42
}
fn default_trade_size() -> f64 {
    1_000.0
}
fn default_native_price() -> f64 {
    150.0
}
fn default_venue() -> String {
    "default".to_string()
}
fn default_initial_equity() -> Decimal {
    Decimal::new(10_000, 0)
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            congestion_level: 0.0,
            fees: None,
            trade_size: default_trade_size(),
            native_price: default_native_price(),
            venue: default_venue(),
            initial_equity: default_initial_equity(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_unit("simulation.congestion_level", self.congestion_level)?;
        check_positive("simulation.trade_size", self.trade_size)?;
        check_range("simulation.trade_size", self.trade_size, 0.0, MAX_TRADE_SIZE)?;
        check_positive("simulation.native_price", self.native_price)?;
        check_range("simulation.native_price", self.native_price, 0.0, MAX_NATIVE_PRICE)?;
        if let Some(fees) = &self.fees {
            fees.validate()?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telemetry: TelemetryConfig::default(),
            simulation: SimulationConfig::default(),
            policy: Policy::FixedStop {
                stop_pct: 0.2,
                take_profit_pct: 1.0,
                tie_break: TieBreak::StopFirst,
            },
            risk: None,
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.simulation.validate()?;
        self.policy.validate()?;
        if let Some(risk) = &self.risk {
            risk.validate()?;
        }
        Ok(())
    }
}
