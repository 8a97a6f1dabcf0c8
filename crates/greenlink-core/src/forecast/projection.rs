//! Cumulative forward projection over monthly aggregates.
//!
//! Covers:
//! 1. **Cumulative series** -- running sum over zero-filled history.
//! 2. **OLS fit** -- y = slope*x + intercept over the non-zero monthly
//!    deltas only, x being the 0-based month index. Zero months are left out
//!    of the regression so pre-footprint periods do not drag the slope down.
//! 3. **Projection** -- each projected month is floored at zero (consumption
//!    cannot regress below zero) and accumulated onto the last historical
//!    cumulative, so the series is continuous at the boundary.
//! 4. **Underdetermined fit** -- fewer than 3 non-zero points yields the
//!    historical points with no projection and a warning, never an error.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Instant;

use crate::error::GreenlinkError;
use crate::types::{with_metadata, ComputationOutput};
use crate::GreenlinkResult;

// ---------------------------------------------------------------------------
// Month keys
// ---------------------------------------------------------------------------

/// A calendar month bucket, serialized as `"yyyy-MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> GreenlinkResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(GreenlinkError::InvalidInput {
                field: "month".into(),
                reason: format!("month {month} out of range 1-12"),
            });
        }
        Ok(MonthKey { year, month })
    }

    /// The following calendar month.
    pub fn next(self) -> MonthKey {
        if self.month == 12 {
            MonthKey {
                year: self.year + 1,
                month: 1,
            }
        } else {
            MonthKey {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = GreenlinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GreenlinkError::InvalidInput {
            field: "month_key".into(),
            reason: format!("expected yyyy-MM, got {s:?}"),
        };
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        MonthKey::new(year, month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|e: GreenlinkError| D::Error::custom(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Series types
// ---------------------------------------------------------------------------

/// One month's total, pre-aggregated and zero-filled for inactive months.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyTotal {
    pub month: MonthKey,
    pub value: Decimal,
}

/// A point on the historical-plus-projected cumulative curve. Projected
/// points are chart data, never persisted as ground truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub month: MonthKey,
    pub cumulative: Decimal,
    pub is_projected: bool,
}

/// Minimum non-zero months required before a regression is attempted.
pub const MIN_REGRESSION_POINTS: usize = 3;

// ---------------------------------------------------------------------------
// Forecasting
// ---------------------------------------------------------------------------

/// Project the cumulative series `horizon_months` past the end of history.
pub fn forecast_cumulative(
    history: &[MonthlyTotal],
    horizon_months: usize,
) -> GreenlinkResult<ComputationOutput<Vec<ForecastPoint>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_history(history)?;

    // Cumulative totals over the full zero-filled history.
    let mut points: Vec<ForecastPoint> = Vec::with_capacity(history.len() + horizon_months);
    let mut cumulative = Decimal::ZERO;
    for entry in history {
        cumulative += entry.value;
        points.push(ForecastPoint {
            month: entry.month,
            cumulative,
            is_projected: false,
        });
    }

    // Regression input: non-zero monthly deltas, x = 0-based month index.
    let samples: Vec<(Decimal, Decimal)> = history
        .iter()
        .enumerate()
        .filter(|(_, e)| e.value != Decimal::ZERO)
        .map(|(i, e)| (Decimal::from(i as u64), e.value))
        .collect();

    if samples.len() < MIN_REGRESSION_POINTS {
        warnings.push(format!(
            "Only {} non-zero months; at least {MIN_REGRESSION_POINTS} required for a projection.",
            samples.len()
        ));
    } else if horizon_months > 0 {
        let (slope, intercept) = ols_fit(&samples);
        let n = history.len();
        let mut month = history.last().map(|e| e.month).unwrap_or(MonthKey {
            year: 1970,
            month: 1,
        });

        for i in 1..=horizon_months {
            let x = Decimal::from((n + i - 1) as u64);
            let monthly = (slope * x + intercept).max(Decimal::ZERO);
            cumulative += monthly;
            month = month.next();
            points.push(ForecastPoint {
                month,
                cumulative,
                is_projected: true,
            });
        }

        if slope < Decimal::ZERO {
            warnings.push("Fitted slope is negative; projected months are floored at zero.".into());
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "model": "ordinary least squares over non-zero monthly deltas",
        "x_axis": "0-based month index, chronological",
        "floor": "projected monthly values clamped at 0",
        "min_regression_points": MIN_REGRESSION_POINTS,
    });

    Ok(with_metadata(
        "Cumulative Forward Projection (OLS over monthly deltas)",
        &assumptions,
        warnings,
        elapsed,
        points,
    ))
}

/// History must be chronological and gap-free so month indices line up with
/// calendar months.
fn validate_history(history: &[MonthlyTotal]) -> GreenlinkResult<()> {
    for window in history.windows(2) {
        if window[1].month != window[0].month.next() {
            return Err(GreenlinkError::InvalidInput {
                field: "history".into(),
                reason: format!(
                    "months must be consecutive: {} is not followed by {}",
                    window[0].month, window[1].month
                ),
            });
        }
    }
    Ok(())
}

/// Least-squares fit `y = slope*x + intercept`.
fn ols_fit(samples: &[(Decimal, Decimal)]) -> (Decimal, Decimal) {
    let n = Decimal::from(samples.len() as u64);
    let x_bar: Decimal = samples.iter().map(|(x, _)| *x).sum::<Decimal>() / n;
    let y_bar: Decimal = samples.iter().map(|(_, y)| *y).sum::<Decimal>() / n;

    let mut numerator = Decimal::ZERO;
    let mut denominator = Decimal::ZERO;
    for (x, y) in samples {
        let x_diff = x - x_bar;
        numerator += x_diff * (y - y_bar);
        denominator += x_diff * x_diff;
    }

    if denominator == Decimal::ZERO {
        return (Decimal::ZERO, y_bar);
    }
    let slope = numerator / denominator;
    (slope, y_bar - slope * x_bar)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
