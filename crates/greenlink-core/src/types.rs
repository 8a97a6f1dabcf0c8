use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::GreenlinkError;
use crate::GreenlinkResult;

/// Energy in kilowatt-hours. Wraps Decimal to prevent accidental f64 usage.
pub type Kwh = Decimal;

/// Greenhouse-gas mass in tonnes of CO2-equivalent.
pub type Tco2e = Decimal;

/// Water volume in liters.
pub type Liters = Decimal;

/// Basis points (1/100th of a percentage point). Margin adjustments only.
pub type Bps = Decimal;

/// Shares expressed as decimals in [0, 1] (0.125 = 12.5%). Never percentages.
pub type Fraction = Decimal;

/// A closed observation interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> GreenlinkResult<Self> {
        if start >= end {
            return Err(GreenlinkError::InvalidInput {
                field: "period".into(),
                reason: format!("period start {start} must precede end {end}"),
            });
        }
        Ok(Period { start, end })
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
