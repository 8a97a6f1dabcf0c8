//! Batch KPI evaluation for one organization and period.
//!
//! The pipeline is synchronous and single-pass: aggregate the period's usage
//! records into a weighted mix, derive the metric set, then evaluate every
//! accepted KPI against it. Failures never cross KPI boundaries — a
//! misconfigured KPI or ratchet lands in the per-item error list and the
//! batch carries on, so callers can report partial completion as a count plus
//! per-KPI messages.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::factors::FactorProvider;
use crate::kpi::{
    compute_trend, evaluate_kpi, KpiDefinition, KpiEvaluation, KpiLifecycle, KpiResultStore,
    KpiStatus, KpiTrend, KpiResult,
};
use crate::metrics::{derive_metrics, SustainabilityMetrics};
use crate::mix::{aggregate_regional_mix, GridMixSnapshot, UsageRecord};
use crate::ratchet::{period_adjustment_bps, MarginRatchet};
use crate::types::{with_metadata, Bps, ComputationOutput, Period};
use crate::GreenlinkResult;

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// Everything the engine needs for one (organization, period) unit of work,
/// pre-filtered to the organization by the ingestion collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationInput {
    pub organization_id: String,
    pub period: Period,
    pub records: Vec<UsageRecord>,
    pub snapshots: Vec<GridMixSnapshot>,
}

/// Proposed margin adjustment from one ratchet referencing a KPI. Ratchets
/// on the same KPI stay independent; cross-ratchet aggregation is a caller
/// decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatchetProposal {
    pub kpi_id: String,
    pub adjustment_bps: Bps,
    pub max_adjustment_bps: Bps,
}

/// One KPI's full evaluation outcome for the period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiOutcome {
    pub result: KpiResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<KpiTrend>,
    pub ratchet_proposals: Vec<RatchetProposal>,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiEvaluationError {
    pub kpi_id: String,
    pub message: String,
}

/// Partial-completion report: results and errors side by side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub organization_id: String,
    pub period: Period,
    pub metrics: SustainabilityMetrics,
    /// Results written this run (inserted or idempotently replaced).
    pub results_created: usize,
    /// KPIs with insufficient upstream data this period; retry a later run.
    pub no_data: Vec<String>,
    pub outcomes: Vec<KpiOutcome>,
    pub errors: Vec<KpiEvaluationError>,
}

// ---------------------------------------------------------------------------
// Batch evaluation
// ---------------------------------------------------------------------------

/// Evaluate every accepted KPI for one organization over one period.
pub fn evaluate_organization_kpis(
    input: &EvaluationInput,
    kpis: &[KpiDefinition],
    ratchets: &[MarginRatchet],
    factors: &dyn FactorProvider,
    store: &mut dyn KpiResultStore,
) -> GreenlinkResult<ComputationOutput<EvaluationReport>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // Malformed records are an ingestion defect; drop them with a warning
    // rather than failing the whole organization.
    let mut records: Vec<UsageRecord> = Vec::with_capacity(input.records.len());
    for record in &input.records {
        match record.validate() {
            Ok(()) => records.push(record.clone()),
            Err(e) => warnings.push(format!("Dropped usage record: {e}")),
        }
    }
    if records.is_empty() {
        warnings.push("No usable usage records for this period.".into());
    }

    let aggregated = aggregate_regional_mix(&records, &input.snapshots, input.period.end);
    let metrics = derive_metrics(&records, &aggregated, factors);

    let mut results_created = 0usize;
    let mut no_data: Vec<String> = Vec::new();
    let mut outcomes: Vec<KpiOutcome> = Vec::new();
    let mut errors: Vec<KpiEvaluationError> = Vec::new();

    for kpi in kpis {
        if kpi.lifecycle != KpiLifecycle::Accepted {
            continue;
        }

        let result = match evaluate_kpi(kpi, &metrics, input.period) {
            Ok(KpiEvaluation::Evaluated(result)) => result,
            Ok(KpiEvaluation::NoData) => {
                no_data.push(kpi.id.clone());
                continue;
            }
            Err(e) => {
                errors.push(KpiEvaluationError {
                    kpi_id: kpi.id.clone(),
                    message: e.to_string(),
                });
                continue;
            }
        };

        if let Err(e) = store.upsert(result.clone()) {
            errors.push(KpiEvaluationError {
                kpi_id: kpi.id.clone(),
                message: e.to_string(),
            });
            continue;
        }
        results_created += 1;

        let trend = compute_trend(&store.results_desc(&kpi.id));

        let mut ratchet_proposals = Vec::new();
        for ratchet in ratchets.iter().filter(|r| r.kpi_id == kpi.id) {
            match ratchet.validate() {
                Ok(()) => ratchet_proposals.push(RatchetProposal {
                    kpi_id: kpi.id.clone(),
                    adjustment_bps: period_adjustment_bps(result.status, ratchet),
                    max_adjustment_bps: ratchet.max_adjustment_bps,
                }),
                Err(e) => errors.push(KpiEvaluationError {
                    kpi_id: kpi.id.clone(),
                    message: e.to_string(),
                }),
            }
        }

        let recommendation = kpi
            .kpi_type
            .recommendation(result.status == KpiStatus::Passed)
            .to_string();

        outcomes.push(KpiOutcome {
            result,
            trend,
            ratchet_proposals,
            recommendation,
        });
    }

    if !errors.is_empty() {
        warnings.push(format!(
            "{} of {} KPIs reported errors; see the error list.",
            errors.len(),
            kpis.len()
        ));
    }

    let report = EvaluationReport {
        organization_id: input.organization_id.clone(),
        period: input.period,
        metrics,
        results_created,
        no_data,
        outcomes,
        errors,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "mix_gap_policy": "regions without usable snapshots excluded from weighting",
        "factor_gap_policy": "unmapped regions resolve to documented defaults",
        "co2e_policy": "prefer precomputed record CO2e, else kWh x EF x PUE",
        "idempotence": "results upserted by (kpi_id, period)",
        "lifecycle_filter": "Accepted KPIs only",
    });

    Ok(with_metadata(
        "Batch KPI Evaluation (consumption-weighted mix, directional targets)",
        &assumptions,
        warnings,
        elapsed,
        report,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
