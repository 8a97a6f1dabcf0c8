//! Scalar sustainability metrics derived from an aggregated energy mix.
//!
//! Covers:
//! 1. **Source fractions** -- per-source share of total weighted energy.
//! 2. **Composite shares** -- renewable, low-carbon, fossil, carbon-free.
//! 3. **Water withdrawal** -- per-region energy x WUE, complete coverage.
//! 4. **CO2e** -- precomputed per record when present, else kWh x EF x PUE.
//!
//! All shares are fractions in [0, 1]; callers multiply by 100 for display.
//! Pure and stateless: factor access goes through the injected provider.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::factors::FactorProvider;
use crate::mix::{AggregatedMix, EnergySource, UsageRecord};
use crate::types::{Fraction, Kwh, Liters, Tco2e};

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Derived sustainability metrics for one organization and period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SustainabilityMetrics {
    /// Total weighted energy (kWh) behind the source fractions.
    pub total_energy_kwh: Kwh,
    /// Per-source share of total energy, each in [0, 1].
    pub source_breakdown: BTreeMap<EnergySource, Fraction>,
    /// Wind + solar + hydro + geothermal + biomass.
    pub renewable_pct: Fraction,
    /// Renewable + nuclear.
    pub low_carbon_pct: Fraction,
    /// Coal + gas + oil.
    pub fossil_pct: Fraction,
    /// Wind + solar + hydro + geothermal + nuclear (biomass excluded).
    pub carbon_free_pct: Fraction,
    /// Total emissions over the period, tCO2e.
    pub total_co2e_tonnes: Tco2e,
    /// Total water withdrawal over the period, liters.
    pub total_water_liters: Liters,
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Derive the full metric set from an aggregated mix and the raw records the
/// aggregation was built from.
pub fn derive_metrics(
    records: &[UsageRecord],
    aggregated: &AggregatedMix,
    factors: &dyn FactorProvider,
) -> SustainabilityMetrics {
    let source_breakdown = source_fractions(aggregated);

    let share = |pred: fn(EnergySource) -> bool| -> Fraction {
        source_breakdown
            .iter()
            .filter(|(s, _)| pred(**s))
            .map(|(_, f)| *f)
            .sum()
    };

    SustainabilityMetrics {
        total_energy_kwh: aggregated.total_energy,
        renewable_pct: share(EnergySource::is_renewable),
        low_carbon_pct: share(EnergySource::is_low_carbon),
        fossil_pct: share(EnergySource::is_fossil),
        carbon_free_pct: share(EnergySource::is_carbon_free),
        total_co2e_tonnes: total_co2e(records, factors),
        total_water_liters: total_water(aggregated, factors),
        source_breakdown,
    }
}

/// Per-source fraction of total weighted energy. All zero when the total is
/// zero — a div-by-zero guard, not an error.
pub fn source_fractions(aggregated: &AggregatedMix) -> BTreeMap<EnergySource, Fraction> {
    if aggregated.total_energy <= Decimal::ZERO {
        return aggregated
            .weighted_mix
            .keys()
            .map(|s| (*s, Decimal::ZERO))
            .collect();
    }
    aggregated
        .weighted_mix
        .iter()
        .map(|(s, energy)| (*s, energy / aggregated.total_energy))
        .collect()
}

/// Water withdrawal across every region with recorded energy. Unmapped
/// regions use the default WUE — water accounting is conservative and
/// complete, unlike the mix exclusion policy.
pub fn total_water(aggregated: &AggregatedMix, factors: &dyn FactorProvider) -> Liters {
    aggregated
        .by_region
        .iter()
        .map(|(region, energy)| energy * factors.wue(region))
        .sum()
}

/// Total CO2e across records. Precomputed CO2e on a record is summed
/// directly; only records without it are derived from kWh x emission factor
/// x PUE, so a record never contributes twice.
pub fn total_co2e(records: &[UsageRecord], factors: &dyn FactorProvider) -> Tco2e {
    records
        .iter()
        .filter_map(|record| match (record.co2e_tonnes, record.kilowatt_hours) {
            (Some(precomputed), _) => Some(precomputed),
            (None, Some(kwh)) => {
                Some(kwh * factors.emission_factor(&record.region) * factors.pue(&record.region))
            }
            (None, None) => None,
        })
        .sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
