use clap::Parser;
use tradesim::cli::{Cli, Commands};
use tradesim::config::Config;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using default configuration");
            Config::from_toml(include_str!("../config.toml.example"))?
        }
    };

    // Initialize telemetry
    tradesim::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Simulate(args) => {
            tracing::info!("Starting simulation");
            let report = args.execute(&config)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Calibrate(args) => {
            tracing::info!("Starting calibration");
            args.execute()?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Policy: {}", config.policy.kind());
            println!(
                "  Simulation: venue={} seed={} trade_size={} congestion={}",
                config.simulation.venue,
                config.simulation.seed,
                config.simulation.trade_size,
                config.simulation.congestion_level
            );
            match &config.simulation.fees {
                Some(fees) => println!("  Fees: {} bps round trip", fees.round_trip_bps()),
                None => println!("  Fees: none"),
            }
            match &config.risk {
                Some(risk) => println!(
                    "  Risk: MaxDD={}%, DailyLoss={}%, venue overrides={}",
                    risk.circuit_breakers.max_drawdown_pct * rust_decimal_macros::dec!(100),
                    risk.circuit_breakers.max_daily_loss_pct * rust_decimal_macros::dec!(100),
                    risk.venue_overrides.len()
                ),
                None => println!("  Risk: disabled"),
            }
            println!();
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
