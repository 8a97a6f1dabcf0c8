//! KPI evaluation, result persistence, and trend computation.
//!
//! Covers:
//! 1. **Pass rule** -- directional comparison against the target, with
//!    optional threshold band (both conditions must hold).
//! 2. **NO_DATA** -- insufficient upstream data writes nothing and raises
//!    nothing; the ingestion collaborator retries a later run.
//! 3. **Idempotent results** -- one immutable result per (kpi, period),
//!    enforced by upsert-by-period semantics in the result store.
//! 4. **Trend** -- delta and percent change over the two most recent results.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::kpi::definition::{KpiDefinition, KpiDirection};
use crate::metrics::SustainabilityMetrics;
use crate::types::Period;
use crate::GreenlinkResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KpiStatus {
    Passed,
    Failed,
    Pending,
}

/// Immutable evaluation outcome for one KPI and period. The target is copied
/// at evaluation time: the definition's target may drift later, the result
/// keeps its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiResult {
    pub kpi_id: String,
    pub period: Period,
    pub actual_value: Decimal,
    pub target_value: Decimal,
    pub status: KpiStatus,
}

/// Outcome of evaluating one KPI for one period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KpiEvaluation {
    /// Insufficient upstream data for this period. Not an error.
    NoData,
    Evaluated(KpiResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// Movement between the two most recent results, rounded to 2 decimals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiTrend {
    pub delta: Decimal,
    pub pct_change: Decimal,
    pub direction: TrendDirection,
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate one KPI against a period's derived metrics.
pub fn evaluate_kpi(
    definition: &KpiDefinition,
    metrics: &SustainabilityMetrics,
    period: Period,
) -> GreenlinkResult<KpiEvaluation> {
    let target = definition.validate()?;

    let Some(actual) = definition.kpi_type.extract(metrics) else {
        return Ok(KpiEvaluation::NoData);
    };

    let meets_target = match definition.direction {
        KpiDirection::LowerIsBetter => actual <= target,
        KpiDirection::HigherIsBetter => actual >= target,
    };
    let within_thresholds = definition.threshold_min.is_none_or(|min| actual >= min)
        && definition.threshold_max.is_none_or(|max| actual <= max);

    let status = if meets_target && within_thresholds {
        KpiStatus::Passed
    } else {
        KpiStatus::Failed
    };

    Ok(KpiEvaluation::Evaluated(KpiResult {
        kpi_id: definition.id.clone(),
        period,
        actual_value: actual,
        target_value: target,
        status,
    }))
}

/// Trend over a KPI's result list, ordered by period end descending.
/// Requires at least two results; otherwise the trend is absent, not zero.
pub fn compute_trend(results_desc: &[KpiResult]) -> Option<KpiTrend> {
    let [latest, previous, ..] = results_desc else {
        return None;
    };

    let delta = latest.actual_value - previous.actual_value;
    let pct_change = if previous.actual_value != Decimal::ZERO {
        delta / previous.actual_value * dec!(100)
    } else {
        Decimal::ZERO
    };
    let direction = if delta > Decimal::ZERO {
        TrendDirection::Increasing
    } else if delta < Decimal::ZERO {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    Some(KpiTrend {
        delta: delta.round_dp(2),
        pct_change: pct_change.round_dp(2),
        direction,
    })
}

// ---------------------------------------------------------------------------
// Result store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// An identical-keyed result existed and was replaced; re-runs with the
    /// same inputs therefore never accumulate duplicates.
    Replaced,
}

/// Append-only result storage keyed by (kpi_id, period). The backing store's
/// unique constraint on that key is what makes concurrent same-period
/// evaluations safe.
pub trait KpiResultStore {
    fn upsert(&mut self, result: KpiResult) -> GreenlinkResult<UpsertOutcome>;
    /// Results for one KPI, ordered by period end descending.
    fn results_desc(&self, kpi_id: &str) -> Vec<KpiResult>;
}

/// In-memory store for tests and library embedding.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKpiResultStore {
    results: Vec<KpiResult>,
}

impl InMemoryKpiResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl KpiResultStore for InMemoryKpiResultStore {
    fn upsert(&mut self, result: KpiResult) -> GreenlinkResult<UpsertOutcome> {
        let existing = self
            .results
            .iter_mut()
            .find(|r| r.kpi_id == result.kpi_id && r.period == result.period);
        match existing {
            Some(slot) => {
                *slot = result;
                Ok(UpsertOutcome::Replaced)
            }
            None => {
                self.results.push(result);
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    fn results_desc(&self, kpi_id: &str) -> Vec<KpiResult> {
        let mut out: Vec<KpiResult> = self
            .results
            .iter()
            .filter(|r| r.kpi_id == kpi_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.period.end.cmp(&a.period.end));
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kpi::definition::{KpiLifecycle, KpiType, ObservationFrequency};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn period(month: u32) -> Period {
        Period::new(
            NaiveDate::from_ymd_opt(2025, month, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, month + 1, 1).unwrap(),
        )
        .unwrap()
    }

    fn metrics_with(renewable: Decimal) -> SustainabilityMetrics {
        SustainabilityMetrics {
            total_energy_kwh: dec!(1000),
            source_breakdown: BTreeMap::new(),
            renewable_pct: renewable,
            low_carbon_pct: renewable,
            fossil_pct: Decimal::ONE - renewable,
            carbon_free_pct: renewable,
            total_co2e_tonnes: dec!(0.5),
            total_water_liters: dec!(1800),
        }
    }

    fn definition(
        kpi_type: KpiType,
        direction: KpiDirection,
        target: Decimal,
    ) -> KpiDefinition {
        KpiDefinition {
            id: "kpi-1".into(),
            kpi_type,
            direction,
            target_value: Some(target),
            baseline_value: None,
            threshold_min: None,
            threshold_max: None,
            frequency: ObservationFrequency::Monthly,
            lifecycle: KpiLifecycle::Accepted,
        }
    }

    fn status_of(eval: KpiEvaluation) -> KpiStatus {
        match eval {
            KpiEvaluation::Evaluated(r) => r.status,
            KpiEvaluation::NoData => panic!("expected an evaluated result"),
        }
    }

    #[test]
    fn test_lower_is_better_direction() {
        let def = definition(KpiType::TotalCo2e, KpiDirection::LowerIsBetter, dec!(100));

        let mut m = metrics_with(dec!(0.5));
        m.total_co2e_tonnes = dec!(90);
        assert_eq!(
            status_of(evaluate_kpi(&def, &m, period(1)).unwrap()),
            KpiStatus::Passed
        );

        m.total_co2e_tonnes = dec!(110);
        assert_eq!(
            status_of(evaluate_kpi(&def, &m, period(1)).unwrap()),
            KpiStatus::Failed
        );
    }

    #[test]
    fn test_higher_is_better_direction() {
        let def = definition(
            KpiType::RenewablePercentage,
            KpiDirection::HigherIsBetter,
            dec!(0.5),
        );

        assert_eq!(
            status_of(evaluate_kpi(&def, &metrics_with(dec!(0.6)), period(1)).unwrap()),
            KpiStatus::Passed
        );
        assert_eq!(
            status_of(evaluate_kpi(&def, &metrics_with(dec!(0.4)), period(1)).unwrap()),
            KpiStatus::Failed
        );
    }

    #[test]
    fn test_boundary_equality_passes_both_directions() {
        let lower = definition(KpiType::TotalCo2e, KpiDirection::LowerIsBetter, dec!(0.5));
        let mut m = metrics_with(dec!(0.5));
        m.total_co2e_tonnes = dec!(0.5);
        assert_eq!(
            status_of(evaluate_kpi(&lower, &m, period(1)).unwrap()),
            KpiStatus::Passed
        );

        let higher = definition(
            KpiType::RenewablePercentage,
            KpiDirection::HigherIsBetter,
            dec!(0.5),
        );
        assert_eq!(
            status_of(evaluate_kpi(&higher, &metrics_with(dec!(0.5)), period(1)).unwrap()),
            KpiStatus::Passed
        );
    }

    #[test]
    fn test_threshold_and_semantics() {
        // target 0.5, band [0.4, 0.6]: exceeding the target is not enough
        let mut def = definition(
            KpiType::RenewablePercentage,
            KpiDirection::HigherIsBetter,
            dec!(0.5),
        );
        def.threshold_min = Some(dec!(0.4));
        def.threshold_max = Some(dec!(0.6));

        assert_eq!(
            status_of(evaluate_kpi(&def, &metrics_with(dec!(0.55)), period(1)).unwrap()),
            KpiStatus::Passed
        );
        // 0.65 beats the target but exceeds threshold_max
        assert_eq!(
            status_of(evaluate_kpi(&def, &metrics_with(dec!(0.65)), period(1)).unwrap()),
            KpiStatus::Failed
        );
    }

    #[test]
    fn test_no_data_writes_nothing() {
        let def = definition(
            KpiType::RenewablePercentage,
            KpiDirection::HigherIsBetter,
            dec!(0.5),
        );
        let mut m = metrics_with(dec!(0.5));
        m.total_energy_kwh = Decimal::ZERO;
        m.total_co2e_tonnes = Decimal::ZERO;
        m.total_water_liters = Decimal::ZERO;

        match evaluate_kpi(&def, &m, period(1)).unwrap() {
            KpiEvaluation::NoData => {}
            other => panic!("Expected NoData, got: {other:?}"),
        }
    }

    #[test]
    fn test_missing_target_is_configuration_error() {
        let mut def = definition(
            KpiType::RenewablePercentage,
            KpiDirection::HigherIsBetter,
            dec!(0.5),
        );
        def.target_value = None;
        assert!(evaluate_kpi(&def, &metrics_with(dec!(0.5)), period(1)).is_err());
    }

    #[test]
    fn test_upsert_is_idempotent_per_period() {
        let mut store = InMemoryKpiResultStore::new();
        let result = KpiResult {
            kpi_id: "kpi-1".into(),
            period: period(1),
            actual_value: dec!(0.6),
            target_value: dec!(0.5),
            status: KpiStatus::Passed,
        };

        assert_eq!(store.upsert(result.clone()).unwrap(), UpsertOutcome::Inserted);
        assert_eq!(store.upsert(result).unwrap(), UpsertOutcome::Replaced);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_results_desc_ordering() {
        let mut store = InMemoryKpiResultStore::new();
        for (month, actual) in [(1, dec!(0.40)), (3, dec!(0.50)), (2, dec!(0.45))] {
            store
                .upsert(KpiResult {
                    kpi_id: "kpi-1".into(),
                    period: period(month),
                    actual_value: actual,
                    target_value: dec!(0.5),
                    status: KpiStatus::Pending,
                })
                .unwrap();
        }

        let results = store.results_desc("kpi-1");
        assert_eq!(results[0].actual_value, dec!(0.50));
        assert_eq!(results[1].actual_value, dec!(0.45));
        assert_eq!(results[2].actual_value, dec!(0.40));
    }

    #[test]
    fn test_trend_requires_two_results() {
        let one = vec![KpiResult {
            kpi_id: "kpi-1".into(),
            period: period(1),
            actual_value: dec!(0.5),
            target_value: dec!(0.5),
            status: KpiStatus::Passed,
        }];
        assert!(compute_trend(&one).is_none());
        assert!(compute_trend(&[]).is_none());
    }

    #[test]
    fn test_trend_increasing_with_rounding() {
        let results = vec![
            KpiResult {
                kpi_id: "kpi-1".into(),
                period: period(2),
                actual_value: dec!(0.50),
                target_value: dec!(0.5),
                status: KpiStatus::Passed,
            },
            KpiResult {
                kpi_id: "kpi-1".into(),
                period: period(1),
                actual_value: dec!(0.45),
                target_value: dec!(0.5),
                status: KpiStatus::Failed,
            },
        ];

        let trend = compute_trend(&results).unwrap();
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert_eq!(trend.delta, dec!(0.05));
        // 0.05 / 0.45 * 100 = 11.11...
        assert_eq!(trend.pct_change, dec!(11.11));
    }

    #[test]
    fn test_trend_zero_previous_pct_change_is_zero() {
        let results = vec![
            KpiResult {
                kpi_id: "kpi-1".into(),
                period: period(2),
                actual_value: dec!(3),
                target_value: dec!(1),
                status: KpiStatus::Failed,
            },
            KpiResult {
                kpi_id: "kpi-1".into(),
                period: period(1),
                actual_value: Decimal::ZERO,
                target_value: dec!(1),
                status: KpiStatus::Passed,
            },
        ];

        let trend = compute_trend(&results).unwrap();
        assert_eq!(trend.pct_change, Decimal::ZERO);
        assert_eq!(trend.direction, TrendDirection::Increasing);
    }
}
