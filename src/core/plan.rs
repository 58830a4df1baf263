use serde::Serialize;

use super::normalize::normalize_inputs;
use super::projection::project_retirement;
use super::returns::resolve_returns;
use super::scoring::score_financial_health;
use super::types::{
    CanonicalInputs, FinancialInputs, HealthScore, NormalizationNote, ProjectionResult,
    ResolvedReturns,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    pub inputs: CanonicalInputs,
    pub notes: Vec<NormalizationNote>,
    pub returns: ResolvedReturns,
    pub projection: ProjectionResult,
    pub health: HealthScore,
}

pub fn returns_for(inputs: &CanonicalInputs) -> ResolvedReturns {
    resolve_returns(
        &inputs.scenario,
        &inputs.allocation,
        Some(inputs.primary.years_to_retirement()),
    )
}

pub fn plan_retirement(raw: &FinancialInputs) -> PlanReport {
    let normalized = normalize_inputs(raw);
    let inputs = normalized.inputs;
    let returns = returns_for(&inputs);
    let projection = project_retirement(&inputs, &returns.assumptions, inputs.partner.as_ref());
    let health = score_financial_health(&inputs, Some(&projection));

    PlanReport {
        inputs,
        notes: normalized.notes,
        returns,
        projection,
        health,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plan_serializes_partner_breakdown_in_couple_mode() {
        let raw = FinancialInputs::from_value(json!({
            "planningMode": "couple",
            "currentAge": 40,
            "partner1": { "netSalary": 15_000 },
            "partner2": { "netSalary": 9_000 },
        }))
        .expect("object");
        let report = plan_retirement(&raw);
        let json = serde_json::to_value(&report).expect("serialize");
        assert!(json["projection"]["partner1"].is_object());
        assert!(json["projection"]["partner2"].is_object());
        assert!(json["health"]["overallScore"].is_number());
        assert_eq!(json["returns"]["scenario"], "moderate");
    }

    #[test]
    fn individual_plan_has_no_partner() {
        let raw = FinancialInputs::from_value(json!({ "salary": 12_000 })).expect("object");
        let report = plan_retirement(&raw);
        assert!(report.projection.partner.is_none());
        assert!(report.projection.total_savings > 0.0);
    }
}
