//! KPI definitions and the closed metric-type catalog.
//!
//! KPI kinds are a closed enum rather than string keys: metric extraction,
//! formula text, and recommendation text dispatch through exhaustive matches,
//! so adding a kind is a compile error until every table is extended.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::GreenlinkError;
use crate::metrics::SustainabilityMetrics;
use crate::GreenlinkResult;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Metric kind a KPI is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KpiType {
    RenewablePercentage,
    LowCarbonPercentage,
    CarbonFreePercentage,
    TotalCo2e,
    WaterWithdrawal,
    EnergyConsumption,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KpiDirection {
    HigherIsBetter,
    LowerIsBetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservationFrequency {
    Monthly,
    Quarterly,
    Annual,
}

/// Review lifecycle. Mutated only by the human review workflow; the engine
/// evaluates `Accepted` KPIs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KpiLifecycle {
    Proposed,
    Accepted,
    Rejected,
}

// ---------------------------------------------------------------------------
// Definition
// ---------------------------------------------------------------------------

/// A sustainability KPI agreed between borrower and lender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiDefinition {
    pub id: String,
    pub kpi_type: KpiType,
    pub direction: KpiDirection,
    /// Absence is a configuration error at evaluation time, not a parse error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_min: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_max: Option<Decimal>,
    pub frequency: ObservationFrequency,
    pub lifecycle: KpiLifecycle,
}

impl KpiDefinition {
    /// Check the definition is evaluable. Failures are fatal to this KPI
    /// only; the batch carries on.
    pub fn validate(&self) -> GreenlinkResult<Decimal> {
        let Some(target) = self.target_value else {
            return Err(GreenlinkError::ConfigurationError {
                kpi_id: self.id.clone(),
                reason: "target_value is required".into(),
            });
        };
        if let (Some(min), Some(max)) = (self.threshold_min, self.threshold_max) {
            if min > max {
                return Err(GreenlinkError::ConfigurationError {
                    kpi_id: self.id.clone(),
                    reason: format!("threshold_min {min} exceeds threshold_max {max}"),
                });
            }
        }
        if self.kpi_type.is_quantity() && target < Decimal::ZERO {
            return Err(GreenlinkError::ConfigurationError {
                kpi_id: self.id.clone(),
                reason: "target for a quantity KPI cannot be negative".into(),
            });
        }
        Ok(target)
    }
}

// ---------------------------------------------------------------------------
// Catalog dispatch
// ---------------------------------------------------------------------------

impl KpiType {
    /// True for absolute quantities (tCO2e, liters, kWh) as opposed to shares.
    pub fn is_quantity(self) -> bool {
        matches!(
            self,
            KpiType::TotalCo2e | KpiType::WaterWithdrawal | KpiType::EnergyConsumption
        )
    }

    /// Pull this KPI's actual value out of a period's derived metrics.
    /// `None` means the upstream data was insufficient for this metric this
    /// period (the NO_DATA path, not an error).
    pub fn extract(self, metrics: &SustainabilityMetrics) -> Option<Decimal> {
        if !has_any_footprint(metrics) {
            return None;
        }
        // share KPIs need a weighted-energy denominator behind them
        let share = |value: Decimal| {
            (metrics.total_energy_kwh > Decimal::ZERO).then_some(value)
        };
        match self {
            KpiType::RenewablePercentage => share(metrics.renewable_pct),
            KpiType::LowCarbonPercentage => share(metrics.low_carbon_pct),
            KpiType::CarbonFreePercentage => share(metrics.carbon_free_pct),
            KpiType::TotalCo2e => Some(metrics.total_co2e_tonnes),
            KpiType::WaterWithdrawal => Some(metrics.total_water_liters),
            KpiType::EnergyConsumption => Some(metrics.total_energy_kwh),
        }
    }

    pub fn default_direction(self) -> KpiDirection {
        match self {
            KpiType::RenewablePercentage
            | KpiType::LowCarbonPercentage
            | KpiType::CarbonFreePercentage => KpiDirection::HigherIsBetter,
            KpiType::TotalCo2e | KpiType::WaterWithdrawal | KpiType::EnergyConsumption => {
                KpiDirection::LowerIsBetter
            }
        }
    }

    /// Dashboard formula text.
    pub fn formula_description(self) -> &'static str {
        match self {
            KpiType::RenewablePercentage => {
                "wind + solar + hydro + geothermal + biomass share of consumption-weighted energy"
            }
            KpiType::LowCarbonPercentage => "renewable share + nuclear share",
            KpiType::CarbonFreePercentage => {
                "wind + solar + hydro + geothermal + nuclear share (biomass excluded)"
            }
            KpiType::TotalCo2e => "sum of precomputed record CO2e, else kWh x emission factor x PUE",
            KpiType::WaterWithdrawal => "sum over regions of energy x WUE",
            KpiType::EnergyConsumption => "sum of recorded kilowatt-hours",
        }
    }

    /// Canned guidance for a pass/fail outcome.
    pub fn recommendation(self, passed: bool) -> &'static str {
        if passed {
            return "On track. Maintain current regional placement and procurement strategy.";
        }
        match self {
            KpiType::RenewablePercentage | KpiType::CarbonFreePercentage => {
                "Shift workloads toward regions with higher renewable grid share or add PPAs."
            }
            KpiType::LowCarbonPercentage => {
                "Prioritize regions with nuclear or renewable-heavy grids for new deployments."
            }
            KpiType::TotalCo2e => {
                "Reduce compute footprint or migrate to lower-emission-factor regions."
            }
            KpiType::WaterWithdrawal => {
                "Favor regions with low WUE data centers; review cooling-intensive workloads."
            }
            KpiType::EnergyConsumption => {
                "Right-size instances and retire idle capacity to cut gross energy use."
            }
        }
    }
}

/// Whether the period produced any usable footprint data at all.
fn has_any_footprint(metrics: &SustainabilityMetrics) -> bool {
    metrics.total_energy_kwh > Decimal::ZERO
        || metrics.total_co2e_tonnes > Decimal::ZERO
        || metrics.total_water_liters > Decimal::ZERO
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn sample_metrics() -> SustainabilityMetrics {
        SustainabilityMetrics {
            total_energy_kwh: dec!(4000),
            source_breakdown: BTreeMap::new(),
            renewable_pct: dec!(0.125),
            low_carbon_pct: dec!(0.875),
            fossil_pct: dec!(0.125),
            carbon_free_pct: dec!(0.875),
            total_co2e_tonnes: dec!(1.7),
            total_water_liters: dec!(7200),
        }
    }

    fn sample_definition() -> KpiDefinition {
        KpiDefinition {
            id: "kpi-renewable".into(),
            kpi_type: KpiType::RenewablePercentage,
            direction: KpiDirection::HigherIsBetter,
            target_value: Some(dec!(0.10)),
            baseline_value: Some(dec!(0.05)),
            threshold_min: None,
            threshold_max: None,
            frequency: ObservationFrequency::Monthly,
            lifecycle: KpiLifecycle::Accepted,
        }
    }

    #[test]
    fn test_validate_requires_target() {
        let mut def = sample_definition();
        def.target_value = None;
        let err = def.validate().unwrap_err();
        match err {
            GreenlinkError::ConfigurationError { kpi_id, .. } => {
                assert_eq!(kpi_id, "kpi-renewable");
            }
            other => panic!("Expected ConfigurationError, got: {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let mut def = sample_definition();
        def.threshold_min = Some(dec!(0.6));
        def.threshold_max = Some(dec!(0.4));
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_quantity_target() {
        let mut def = sample_definition();
        def.kpi_type = KpiType::TotalCo2e;
        def.target_value = Some(dec!(-1));
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_extract_each_kind() {
        let m = sample_metrics();
        assert_eq!(KpiType::RenewablePercentage.extract(&m), Some(dec!(0.125)));
        assert_eq!(KpiType::LowCarbonPercentage.extract(&m), Some(dec!(0.875)));
        assert_eq!(KpiType::TotalCo2e.extract(&m), Some(dec!(1.7)));
        assert_eq!(KpiType::WaterWithdrawal.extract(&m), Some(dec!(7200)));
        assert_eq!(KpiType::EnergyConsumption.extract(&m), Some(dec!(4000)));
    }

    #[test]
    fn test_extract_percentage_without_energy_is_no_data() {
        let mut m = sample_metrics();
        m.total_energy_kwh = Decimal::ZERO;
        assert_eq!(KpiType::RenewablePercentage.extract(&m), None);
        // quantities remain available while any footprint exists
        assert_eq!(KpiType::TotalCo2e.extract(&m), Some(dec!(1.7)));
    }

    #[test]
    fn test_extract_empty_period_is_no_data_for_all_kinds() {
        let m = SustainabilityMetrics {
            total_energy_kwh: Decimal::ZERO,
            source_breakdown: BTreeMap::new(),
            renewable_pct: Decimal::ZERO,
            low_carbon_pct: Decimal::ZERO,
            fossil_pct: Decimal::ZERO,
            carbon_free_pct: Decimal::ZERO,
            total_co2e_tonnes: Decimal::ZERO,
            total_water_liters: Decimal::ZERO,
        };
        for kind in [
            KpiType::RenewablePercentage,
            KpiType::LowCarbonPercentage,
            KpiType::CarbonFreePercentage,
            KpiType::TotalCo2e,
            KpiType::WaterWithdrawal,
            KpiType::EnergyConsumption,
        ] {
            assert_eq!(kind.extract(&m), None, "{kind:?}");
        }
    }

    #[test]
    fn test_default_directions() {
        assert_eq!(
            KpiType::RenewablePercentage.default_direction(),
            KpiDirection::HigherIsBetter
        );
        assert_eq!(
            KpiType::TotalCo2e.default_direction(),
            KpiDirection::LowerIsBetter
        );
    }
}
