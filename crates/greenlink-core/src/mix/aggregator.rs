//! Consumption-weighted regional energy mix aggregation.
//!
//! Covers:
//! 1. **Usage records** -- per (region, provider, period) cloud consumption.
//! 2. **Grid mix snapshots** -- generation-source composition per region.
//! 3. **Snapshot selection** -- latest snapshot at or before the period end.
//! 4. **Weighted aggregation** -- per-source energy weighted by regional
//!    consumption, restricted to regions with usable mix data.
//!
//! Regions with absent energy or missing/zero-sum mix snapshots are silently
//! excluded from the weighted sums: absent data must not bias the resulting
//! metric toward either extreme. The per-region energy map retains every
//! region with recorded energy so water and CO2e accounting stay complete.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::GreenlinkError;
use crate::types::{Kwh, Tco2e};
use crate::GreenlinkResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CloudProvider {
    Aws,
    Azure,
    Gcp,
}

/// Generation source in a grid mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnergySource {
    Nuclear,
    Wind,
    Solar,
    Hydro,
    Geothermal,
    Biomass,
    Coal,
    Gas,
    Oil,
    Unknown,
}

impl EnergySource {
    pub const ALL: [EnergySource; 10] = [
        EnergySource::Nuclear,
        EnergySource::Wind,
        EnergySource::Solar,
        EnergySource::Hydro,
        EnergySource::Geothermal,
        EnergySource::Biomass,
        EnergySource::Coal,
        EnergySource::Gas,
        EnergySource::Oil,
        EnergySource::Unknown,
    ];

    pub fn is_renewable(self) -> bool {
        matches!(
            self,
            EnergySource::Wind
                | EnergySource::Solar
                | EnergySource::Hydro
                | EnergySource::Geothermal
                | EnergySource::Biomass
        )
    }

    pub fn is_fossil(self) -> bool {
        matches!(
            self,
            EnergySource::Coal | EnergySource::Gas | EnergySource::Oil
        )
    }

    /// Renewable + nuclear (low-carbon generation).
    pub fn is_low_carbon(self) -> bool {
        self.is_renewable() || self == EnergySource::Nuclear
    }

    /// Zero stack emissions: excludes biomass, which emits on combustion.
    pub fn is_carbon_free(self) -> bool {
        self.is_low_carbon() && self != EnergySource::Biomass
    }
}

/// One observation of cloud resource consumption for a (region, provider)
/// tuple over `[period_start, period_end)`. Immutable once recorded;
/// re-ingestion supersedes, never mutates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub region: String,
    pub provider: CloudProvider,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kilowatt_hours: Option<Kwh>,
    /// CO2e already attributed to this record upstream, if precomputed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub co2e_tonnes: Option<Tco2e>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<Decimal>,
}

impl UsageRecord {
    pub fn validate(&self) -> GreenlinkResult<()> {
        if self.period_start >= self.period_end {
            return Err(GreenlinkError::InvalidInput {
                field: format!("usage_record[{}]", self.region),
                reason: "period_start must precede period_end".into(),
            });
        }
        Ok(())
    }
}

/// Generation-source composition for a (region, provider) pair at a point in
/// time. Quantities are absolute power, not yet normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridMixSnapshot {
    pub region: String,
    pub provider: CloudProvider,
    pub datetime: NaiveDateTime,
    pub mix: BTreeMap<EnergySource, Decimal>,
}

impl GridMixSnapshot {
    pub fn source_total(&self) -> Decimal {
        self.mix.values().copied().sum()
    }
}

/// Output of the regional aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedMix {
    /// Per-source energy (kWh), consumption-weighted across regions with
    /// usable mix data.
    pub weighted_mix: BTreeMap<EnergySource, Kwh>,
    /// Total energy (kWh) across regions contributing to `weighted_mix`.
    pub total_energy: Kwh,
    /// Energy (kWh) per region, for every region with recorded energy —
    /// including regions excluded from the weighted mix.
    pub by_region: BTreeMap<String, Kwh>,
}

impl AggregatedMix {
    pub fn empty() -> Self {
        AggregatedMix {
            weighted_mix: BTreeMap::new(),
            total_energy: Decimal::ZERO,
            by_region: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Combine usage records with per-region grid mix snapshots into a single
/// consumption-weighted mix for the period ending at `period_end`.
pub fn aggregate_regional_mix(
    records: &[UsageRecord],
    snapshots: &[GridMixSnapshot],
    period_end: NaiveDate,
) -> AggregatedMix {
    // Single pass: sum energy per (region, provider) so multiple records for
    // the same target are summed, never overwritten.
    let mut energy_by_target: BTreeMap<(String, CloudProvider), Kwh> = BTreeMap::new();
    let mut by_region: BTreeMap<String, Kwh> = BTreeMap::new();

    for record in records {
        let Some(kwh) = record.kilowatt_hours else {
            continue;
        };
        *energy_by_target
            .entry((record.region.clone(), record.provider))
            .or_insert(Decimal::ZERO) += kwh;
        *by_region.entry(record.region.clone()).or_insert(Decimal::ZERO) += kwh;
    }

    let mut weighted_mix: BTreeMap<EnergySource, Kwh> = BTreeMap::new();
    let mut total_energy = Decimal::ZERO;

    for ((region, provider), energy) in &energy_by_target {
        let Some(snapshot) = latest_snapshot(snapshots, region, *provider, period_end) else {
            continue;
        };
        let source_total = snapshot.source_total();
        if source_total <= Decimal::ZERO {
            continue;
        }

        for (source, quantity) in &snapshot.mix {
            let share = quantity / source_total;
            *weighted_mix.entry(*source).or_insert(Decimal::ZERO) += *energy * share;
        }
        total_energy += *energy;
    }

    AggregatedMix {
        weighted_mix,
        total_energy,
        by_region,
    }
}

/// Latest snapshot for (region, provider) at or before the period end.
pub fn latest_snapshot<'a>(
    snapshots: &'a [GridMixSnapshot],
    region: &str,
    provider: CloudProvider,
    period_end: NaiveDate,
) -> Option<&'a GridMixSnapshot> {
    let cutoff = period_end.and_hms_opt(23, 59, 59)?;
    snapshots
        .iter()
        .filter(|s| s.region == region && s.provider == provider && s.datetime <= cutoff)
        .max_by_key(|s| s.datetime)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
