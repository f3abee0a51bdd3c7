//! CLI interface for tradesim
//!
//! Provides subcommands for:
//! - `simulate`: Run the configured exit policy over a candle file
//! - `calibrate`: Fit an execution model from live trade records
//! - `config`: Show configuration

mod calibrate;
mod simulate;

pub use calibrate::CalibrateArgs;
pub use simulate::{SimulateArgs, SimulationReport};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tradesim")]
#[command(about = "Trade-exit simulation with execution-reality, cost and risk models")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Simulate one trade from a candle file
    Simulate(SimulateArgs),
    /// Calibrate an execution model from live trade records
    Calibrate(CalibrateArgs),
    /// Show configuration
    Config,
}
