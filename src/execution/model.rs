//! Venue-scoped execution model

use super::{FailureModel, LatencyModel, PartialFillModel, ReorgModel, SlippageModel};
use crate::calibration::CalibrationMetadata;
use crate::cost::CostModel;
use crate::validation::{check_non_negative, from_json_validated, ValidationError};
use serde::{Deserialize, Serialize};

/// Everything needed to perturb an idealized fill into a realistic one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionModel {
    pub venue: String,
    pub latency: LatencyModel,
    pub slippage: SlippageModel,
    pub failure: FailureModel,
    pub partial_fill: PartialFillModel,
    pub reorg: ReorgModel,
    pub cost: CostModel,
    /// Block time used to convert reorg depth into delay
    #[serde(default = "default_slot_time_ms")]
    pub slot_time_ms: f64,
    /// Present when the model came out of calibration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration: Option<CalibrationMetadata>,
}

fn default_slot_time_ms() -> f64 {
    400.0
}

impl ExecutionModel {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.venue.trim().is_empty() {
            return Err(ValidationError::Inconsistent {
                context: "execution_model",
                message: "venue must not be empty".to_string(),
            });
        }
        self.latency.validate()?;
        self.slippage.validate()?;
        self.failure.validate()?;
        self.partial_fill.validate()?;
        self.reorg.validate()?;
        self.cost.validate()?;
        check_non_negative("slot_time_ms", self.slot_time_ms)
    }

    /// Load and validate a model artifact
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        from_json_validated(json, Self::validate)
    }

    /// Load and validate a model artifact from disk
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::sample_model;
    use super::*;

    #[test]
    fn test_sample_model_is_valid() {
        assert!(sample_model().validate().is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let model = sample_model();
        let json = model.to_json_pretty().unwrap();
        assert!(!json.contains("calibration"));
        assert_eq!(ExecutionModel::from_json(&json).unwrap(), model);
    }

    #[test]
    fn test_from_json_rejects_out_of_range() {
        let mut model = sample_model();
        model.failure.base_failure_rate = 1.2;
        let json = serde_json::to_string(&model).unwrap();
        assert!(matches!(
            ExecutionModel::from_json(&json),
            Err(ValidationError::OutOfRange {
                field: "failure.base_failure_rate",
                ..
            })
        ));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            ExecutionModel::from_json("{not json"),
            Err(ValidationError::Parse { .. })
        ));
    }

    #[test]
    fn test_empty_venue_rejected() {
        let mut model = sample_model();
        model.venue = " ".to_string();
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, sample_model().to_json_pretty().unwrap()).unwrap();
        assert_eq!(ExecutionModel::load(&path).unwrap(), sample_model());
        assert!(ExecutionModel::load(dir.path().join("missing.json")).is_err());
    }
}
