//! Bounded running total of margin adjustments over a loan's life.
//!
//! Policy v1: the total accumulates for the loan lifetime, never resets, and
//! is clamped symmetrically to `[-max, +max]`. Ten consecutive fails at
//! 8 bps against a 25 bps cap settle at +25, not +80; subsequent passes claw
//! back from the cap. A future per-year or resetting policy must bump
//! [`ACCUMULATOR_POLICY_VERSION`] and live alongside this one.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Bps;

/// Accumulation policy identifier, persisted next to the running total so a
/// stored balance is never reinterpreted under a different policy.
pub const ACCUMULATOR_POLICY_VERSION: u32 = 1;

/// Clamped loan-lifetime running total of margin adjustments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatchetAccumulator {
    cumulative_bps: Bps,
    max_adjustment_bps: Bps,
    policy_version: u32,
}

impl RatchetAccumulator {
    pub fn new(max_adjustment_bps: Bps) -> Self {
        RatchetAccumulator {
            cumulative_bps: Decimal::ZERO,
            max_adjustment_bps: max_adjustment_bps.abs(),
            policy_version: ACCUMULATOR_POLICY_VERSION,
        }
    }

    /// Apply one period's proposed delta. The stored total is clamped to
    /// `[-max, +max]`; the return value is the delta that actually took
    /// effect after clamping.
    pub fn apply(&mut self, proposed_delta_bps: Bps) -> Bps {
        let before = self.cumulative_bps;
        self.cumulative_bps = (before + proposed_delta_bps)
            .max(-self.max_adjustment_bps)
            .min(self.max_adjustment_bps);
        self.cumulative_bps - before
    }

    pub fn cumulative_bps(&self) -> Bps {
        self.cumulative_bps
    }

    pub fn max_adjustment_bps(&self) -> Bps {
        self.max_adjustment_bps
    }

    pub fn policy_version(&self) -> u32 {
        self.policy_version
    }
}
