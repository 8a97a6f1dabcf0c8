//! Regional emission and efficiency factor tables.
//!
//! Covers:
//! 1. **Grid emission factors** -- tCO2e per kWh of purchased electricity.
//! 2. **PUE** -- Power Usage Effectiveness, facility overhead multiplier.
//! 3. **WUE** -- Water Usage Effectiveness, liters per kWh of IT energy.
//!
//! Factors are reference data versioned by year; lookups always resolve to the
//! latest entry for a region. Unmapped regions resolve to a documented default
//! per factor kind rather than an error, so downstream accounting stays total.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which scalar a factor entry carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactorKind {
    /// Grid emission factor, tCO2e/kWh.
    EmissionFactor,
    /// Power Usage Effectiveness, dimensionless, >= 1.
    Pue,
    /// Water Usage Effectiveness, L/kWh.
    Wue,
}

/// One (region, year) -> scalar mapping for a single factor kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorEntry {
    pub region: String,
    /// Dataset vintage; the latest year for a region wins.
    pub year: u16,
    pub value: Decimal,
}

/// Read-only factor lookup, injected into the metric derivation so tables can
/// be swapped for synthetic test sets or revised yearly datasets.
pub trait FactorProvider {
    /// Grid emission factor (tCO2e/kWh) for a region.
    fn emission_factor(&self, region: &str) -> Decimal;
    /// Power Usage Effectiveness for a region.
    fn pue(&self, region: &str) -> Decimal;
    /// Water Usage Effectiveness (L/kWh) for a region.
    fn wue(&self, region: &str) -> Decimal;
}

// ---------------------------------------------------------------------------
// Documented defaults for unmapped regions
// ---------------------------------------------------------------------------

/// Global average grid emission factor, tCO2e/kWh (436 gCO2e/kWh).
pub const DEFAULT_EMISSION_FACTOR: Decimal = dec!(0.000436);

/// Industry-typical data-center PUE.
pub const DEFAULT_PUE: Decimal = dec!(1.2);

/// Industry-typical data-center WUE, L/kWh.
pub const DEFAULT_WUE: Decimal = dec!(1.8);

// ---------------------------------------------------------------------------
// Static table implementation
// ---------------------------------------------------------------------------

/// Factor tables backed by in-memory entry lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticFactorTable {
    emission_factors: Vec<FactorEntry>,
    pue: Vec<FactorEntry>,
    wue: Vec<FactorEntry>,
}

impl StaticFactorTable {
    pub fn new(
        emission_factors: Vec<FactorEntry>,
        pue: Vec<FactorEntry>,
        wue: Vec<FactorEntry>,
    ) -> Self {
        StaticFactorTable {
            emission_factors,
            pue,
            wue,
        }
    }

    /// Built-in dataset covering common AWS/Azure/GCP regions (2024 vintage).
    pub fn builtin() -> Self {
        fn entries(rows: &[(&str, Decimal)]) -> Vec<FactorEntry> {
            rows.iter()
                .map(|(region, value)| FactorEntry {
                    region: (*region).to_string(),
                    year: 2024,
                    value: *value,
                })
                .collect()
        }

        let emission_factors = entries(&[
            ("us-east-1", dec!(0.000379)),
            ("us-west-2", dec!(0.000136)),
            ("eu-west-1", dec!(0.000279)),
            ("eu-north-1", dec!(0.000013)),
            ("ap-southeast-1", dec!(0.000408)),
            ("ap-southeast-2", dec!(0.000660)),
            ("eastus", dec!(0.000379)),
            ("westeurope", dec!(0.000390)),
            ("europe-north1", dec!(0.000086)),
            ("us-central1", dec!(0.000456)),
        ]);

        let pue = entries(&[
            ("us-east-1", dec!(1.135)),
            ("us-west-2", dec!(1.135)),
            ("eu-west-1", dec!(1.135)),
            ("eu-north-1", dec!(1.135)),
            ("ap-southeast-1", dec!(1.135)),
            ("ap-southeast-2", dec!(1.135)),
            ("eastus", dec!(1.185)),
            ("westeurope", dec!(1.185)),
            ("europe-north1", dec!(1.09)),
            ("us-central1", dec!(1.11)),
        ]);

        let wue = entries(&[
            ("us-east-1", dec!(1.8)),
            ("us-west-2", dec!(1.55)),
            ("eu-west-1", dec!(1.2)),
            ("eu-north-1", dec!(0.9)),
            ("ap-southeast-2", dec!(2.1)),
            ("eastus", dec!(0.49)),
            ("europe-north1", dec!(0.6)),
        ]);

        StaticFactorTable::new(emission_factors, pue, wue)
    }

    /// Latest-year entry for a region, or the kind's default when unmapped.
    fn lookup(entries: &[FactorEntry], region: &str, default: Decimal) -> Decimal {
        entries
            .iter()
            .filter(|e| e.region == region)
            .max_by_key(|e| e.year)
            .map(|e| e.value)
            .unwrap_or(default)
    }
}

impl FactorProvider for StaticFactorTable {
    fn emission_factor(&self, region: &str) -> Decimal {
        Self::lookup(&self.emission_factors, region, DEFAULT_EMISSION_FACTOR)
    }

    fn pue(&self, region: &str) -> Decimal {
        Self::lookup(&self.pue, region, DEFAULT_PUE)
    }

    fn wue(&self, region: &str) -> Decimal {
        Self::lookup(&self.wue, region, DEFAULT_WUE)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
