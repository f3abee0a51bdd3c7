//! Calibration module
//!
//! Fits execution-model distributions from observed live trades and stamps
//! the result with provenance metadata.

mod fit;
mod types;

pub use fit::{calibrate_execution_model, calibrate_execution_model_with};
pub use types::{CalibrationError, CalibrationMetadata, CalibrationOptions, LiveTradeRecord};
