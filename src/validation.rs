//! Range validation shared by every persisted model type

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

/// Configuration validation errors
///
/// Raised when a model is constructed or loaded, never during simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Numeric field outside its declared range
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// Numeric field is NaN or infinite
    #[error("{field} must be finite, got {value}")]
    NotFinite { field: &'static str, value: f64 },
    /// Two fields that must be ordered are not
    #[error("{lower} ({lower_value}) must not exceed {upper} ({upper_value})")]
    Misordered {
        lower: &'static str,
        lower_value: f64,
        upper: &'static str,
        upper_value: f64,
    },
    /// Parameters that are individually valid but inconsistent together
    #[error("inconsistent {context}: {message}")]
    Inconsistent {
        context: &'static str,
        message: String,
    },
    /// Artifact could not be parsed
    #[error("failed to parse {format} config: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },
}

/// Check that `value` is finite and within `[min, max]`
pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite { field, value });
    }
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Fraction or probability in `[0, 1]`
pub fn check_unit(field: &'static str, value: f64) -> Result<(), ValidationError> {
    check_range(field, value, 0.0, 1.0)
}

/// Basis points in `[0, 10000]`
pub fn check_bps(field: &'static str, value: f64) -> Result<(), ValidationError> {
    check_range(field, value, 0.0, 10_000.0)
}

/// Finite and `>= 0`
pub fn check_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    check_range(field, value, 0.0, f64::MAX)
}

/// Finite and strictly positive
pub fn check_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    check_non_negative(field, value)?;
    if value == 0.0 {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min: f64::MIN_POSITIVE,
            max: f64::MAX,
        });
    }
    Ok(())
}

/// Decimal variant of [`check_range`]
pub fn check_decimal(
    field: &'static str,
    value: Decimal,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    check_range(field, value.to_f64().unwrap_or(f64::NAN), min, max)
}

/// `lower <= upper`
pub fn check_ordered(
    lower: &'static str,
    lower_value: f64,
    upper: &'static str,
    upper_value: f64,
) -> Result<(), ValidationError> {
    if lower_value > upper_value {
        return Err(ValidationError::Misordered {
            lower,
            lower_value,
            upper,
            upper_value,
        });
    }
    Ok(())
}

/// Deserialize a JSON artifact and run its validation
pub(crate) fn from_json_validated<T, F>(json: &str, validate: F) -> Result<T, ValidationError>
where
    T: serde::de::DeserializeOwned,
    F: FnOnce(&T) -> Result<(), ValidationError>,
{
    let value: T = serde_json::from_str(json).map_err(|e| ValidationError::Parse {
        format: "json",
        message: e.to_string(),
    })?;
    validate(&value)?;
    Ok(value)
}
