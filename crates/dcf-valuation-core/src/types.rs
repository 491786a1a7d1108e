use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DcfError;
use crate::DcfResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
/// The unit (e.g. millions) is chosen by the caller and must stay consistent
/// within a single run.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// A single period in a financial projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionPeriod {
    pub year: i32,
    pub label: String,
    pub is_terminal: bool,
}

impl ProjectionPeriod {
    /// Ordinal period `index` (1-based), optionally anchored to a calendar year.
    ///
    /// Fails when the resulting year does not fit an `i32`.
    pub fn new(index: u32, first_year: Option<i32>) -> DcfResult<Self> {
        let ordinal = i32::try_from(index).map_err(|_| DcfError::InvalidInput {
            field: "horizon_periods".into(),
            reason: format!("Period {index} exceeds the supported horizon"),
        })?;
        match first_year {
            Some(first) => {
                let year = first
                    .checked_add(ordinal - 1)
                    .ok_or_else(|| DcfError::InvalidInput {
                        field: "first_forecast_year".into(),
                        reason: format!("Period {index} from year {first} overflows the year range"),
                    })?;
                Ok(ProjectionPeriod {
                    year,
                    label: year.to_string(),
                    is_terminal: false,
                })
            }
            None => Ok(ProjectionPeriod {
                year: ordinal,
                label: format!("Year {index}"),
                is_terminal: false,
            }),
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

/// Convert an externally sourced `f64` into `Money`, rejecting NaN and infinities.
pub fn money_from_f64(field: &str, value: f64) -> DcfResult<Money> {
    if !value.is_finite() {
        return Err(DcfError::InvalidInput {
            field: field.into(),
            reason: format!("Value must be finite, got {value}"),
        });
    }
    Decimal::from_f64(value).ok_or_else(|| DcfError::InvalidInput {
        field: field.into(),
        reason: format!("Value {value} is outside the decimal range"),
    })
}

/// Convert a decimal into `f64` for the floating-point engines.
pub fn decimal_to_f64(field: &str, value: Decimal) -> DcfResult<f64> {
    value.to_f64().ok_or_else(|| DcfError::InvalidInput {
        field: field.into(),
        reason: format!("Value {value} cannot be represented as f64"),
    })
}
