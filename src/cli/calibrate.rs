//! Calibrate command implementation

use crate::calibration::{calibrate_execution_model_with, CalibrationOptions, LiveTradeRecord};
use crate::execution::ExecutionModel;
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CalibrateArgs {
    /// JSON array of live trade records
    #[arg(long)]
    pub records: PathBuf,

    /// Venue the model is fitted for
    #[arg(long)]
    pub venue: String,

    /// Where to write the model; stdout when omitted
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Minimum records per fitted distribution
    #[arg(long)]
    pub min_samples: Option<usize>,
}

impl CalibrateArgs {
    pub fn execute(&self) -> anyhow::Result<ExecutionModel> {
        let content = std::fs::read_to_string(&self.records)
            .with_context(|| format!("reading records from {}", self.records.display()))?;
        let records: Vec<LiveTradeRecord> = serde_json::from_str(&content)
            .with_context(|| format!("parsing records from {}", self.records.display()))?;

        let mut options = CalibrationOptions {
            source: self.records.display().to_string(),
            ..Default::default()
        };
        if let Some(min_samples) = self.min_samples {
            options.min_samples = min_samples;
        }

        tracing::info!(records = records.len(), venue = %self.venue, "Calibrating execution model");
        let model = calibrate_execution_model_with(&records, &self.venue, &options)?;

        let json = model.to_json_pretty()?;
        match &self.output {
            Some(path) => {
                std::fs::write(path, json)
                    .with_context(|| format!("writing model to {}", path.display()))?;
                tracing::info!(path = %path.display(), "Execution model written");
            }
            None => println!("{json}"),
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibrate_writes_loadable_model() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<LiveTradeRecord> = (0..40)
            .map(|i| LiveTradeRecord::filled(100.0 + 10.0 * i as f64, 200.0 + i as f64, 5.0 + i as f64))
            .collect();
        let records_path = dir.path().join("trades.json");
        std::fs::write(&records_path, serde_json::to_string(&records).unwrap()).unwrap();
        let output = dir.path().join("model.json");

        let args = CalibrateArgs {
            records: records_path,
            venue: "raydium".to_string(),
            output: Some(output.clone()),
            min_samples: None,
        };
        let model = args.execute().unwrap();
        assert_eq!(ExecutionModel::load(&output).unwrap(), model);
    }

    #[test]
    fn test_calibrate_too_few_records() {
        let dir = tempfile::tempdir().unwrap();
        let records_path = dir.path().join("trades.json");
        std::fs::write(&records_path, "[]").unwrap();
        let args = CalibrateArgs {
            records: records_path,
            venue: "raydium".to_string(),
            output: None,
            min_samples: None,
        };
        assert!(args.execute().is_err());
    }
}
