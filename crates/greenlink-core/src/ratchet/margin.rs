//! Margin ratchet: KPI outcomes to signed basis-point adjustments.
//!
//! A pass earns a favorable (negative) adjustment of `step_up_bps`; a fail
//! costs `step_down_bps`; a pending outcome adjusts nothing. This component
//! computes the proposed single-period delta only — the clamped running total
//! over a loan's life lives in [`crate::ratchet::accumulator`]. When several
//! ratchets reference one KPI, each produces its own proposal; aggregation
//! across ratchets is a caller decision.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::GreenlinkError;
use crate::kpi::KpiStatus;
use crate::types::Bps;
use crate::GreenlinkResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Borrower-configured ratchet parameters for one KPI. Read-only to the
/// engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginRatchet {
    pub kpi_id: String,
    /// Favorable adjustment magnitude applied when the KPI passes.
    pub step_up_bps: Bps,
    /// Unfavorable adjustment magnitude applied when the KPI fails.
    pub step_down_bps: Bps,
    /// Absolute cap on the cumulative adjustment over the loan's life.
    pub max_adjustment_bps: Bps,
}

impl MarginRatchet {
    pub fn validate(&self) -> GreenlinkResult<()> {
        for (field, value) in [
            ("step_up_bps", self.step_up_bps),
            ("step_down_bps", self.step_down_bps),
            ("max_adjustment_bps", self.max_adjustment_bps),
        ] {
            if value < Decimal::ZERO {
                return Err(GreenlinkError::ConfigurationError {
                    kpi_id: self.kpi_id.clone(),
                    reason: format!("{field} cannot be negative"),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Proposed single-period margin adjustment for one evaluation outcome.
/// Negative is favorable to the borrower.
pub fn period_adjustment_bps(status: KpiStatus, ratchet: &MarginRatchet) -> Bps {
    match status {
        KpiStatus::Passed => -ratchet.step_up_bps,
        KpiStatus::Failed => ratchet.step_down_bps,
        KpiStatus::Pending => Decimal::ZERO,
    }
}

/// Margin after applying a cumulative adjustment to the loan's base margin.
pub fn adjusted_margin_bps(base_margin_bps: Bps, cumulative_adjustment_bps: Bps) -> Bps {
    base_margin_bps + cumulative_adjustment_bps
}

/// Annual interest impact of a cumulative adjustment on a facility amount.
/// Negative means savings for the borrower.
pub fn annual_interest_impact(facility_amount: Decimal, cumulative_adjustment_bps: Bps) -> Decimal {
    facility_amount * cumulative_adjustment_bps / dec!(10_000)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
