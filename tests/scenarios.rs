use std::collections::BTreeMap;

use nestegg::core::{
    FinancialInputs, PlanningMode, convert_currency, normalize_inputs, plan_retirement,
    project_retirement, returns_for, score_financial_health,
};
use serde_json::{Value, json};

fn raw(value: Value) -> FinancialInputs {
    FinancialInputs::from_value(value).expect("test payload is an object")
}

fn single_earner() -> FinancialInputs {
    raw(json!({
        "currentAge": 39,
        "retirementAge": 67,
        "country": "israel",
        "currentMonthlySalary": 20_000,
        "currentMonthlyExpenses": 35_000,
        "riskTolerance": "moderate",
        "monthlyCryptoContribution": 0,
        "cryptoBalance": 0,
        "realEstateValue": 0,
    }))
}

#[test]
fn single_earner_plan_is_finite_and_repeatable() {
    let input = single_earner();
    let first = plan_retirement(&input);
    let projection = &first.projection;

    assert_eq!(projection.years_to_retirement, 28);
    for value in [
        projection.total_savings,
        projection.total_savings_real,
        projection.monthly_income,
        projection.monthly_income_real,
        projection.readiness_score,
        first.health.overall_score,
    ] {
        assert!(value.is_finite(), "non-finite value in report: {value}");
    }
    assert!(projection.total_savings > 0.0);
    assert!(projection.years_of_income_coverage.is_some());
    assert!((0.0..=100.0).contains(&first.health.overall_score));

    for _ in 0..5 {
        let again = plan_retirement(&input);
        assert!((again.projection.total_savings - projection.total_savings).abs() <= 1e-2);
        assert!((again.projection.monthly_income - projection.monthly_income).abs() <= 1e-2);
        assert!((again.health.overall_score - first.health.overall_score).abs() <= 1e-2);
    }
}

#[test]
fn zero_exchange_rate_displays_not_available() {
    let rates: BTreeMap<String, f64> = [("USD".to_string(), 0.0)].into_iter().collect();
    let converted = convert_currency(1000.0, "USD", &rates);
    assert_eq!(converted, "N/A");
    assert_eq!(converted.to_string(), "N/A");
}

#[test]
fn couple_with_net_salaries_only_has_nonzero_savings_rate() {
    let inputs = normalize_inputs(&raw(json!({
        "planningMode": "couple",
        "currentAge": 35,
        "partner1": { "netSalary": 14_000 },
        "partner2": { "netSalary": 11_000 },
        "monthlyExpenses": 16_000,
    })))
    .inputs;

    assert_eq!(inputs.mode, PlanningMode::Couple);
    assert!(inputs.monthly_gross_income() > inputs.monthly_net_income());

    let health = score_financial_health(&inputs, None);
    assert!(health.savings_rate_score > 0.0);
    assert!(health.savings_rate.is_some());
}

#[test]
fn retiring_today_leaves_balances_unchanged() {
    let inputs = normalize_inputs(&raw(json!({
        "currentAge": 67,
        "retirementAge": 67,
        "salary": 15_000,
        "pensionBalance": 900_000,
        "portfolioBalance": 300_000,
    })))
    .inputs;
    let returns = returns_for(&inputs);
    let result = project_retirement(&inputs, &returns.assumptions, None);

    assert_eq!(result.years_to_retirement, 0);
    assert_eq!(result.balances, inputs.primary.balances);
    assert!((result.total_savings - 1_200_000.0).abs() < 1e-6);
    assert!(result.primary.yearly.is_empty());
}

#[test]
fn couple_totals_are_partner_sums() {
    let report = plan_retirement(&raw(json!({
        "planningMode": "couple",
        "currentAge": 42,
        "partner1": { "grossSalary": 22_000, "pensionBalance": 400_000 },
        "partner2": { "grossSalary": 16_000, "currentAge": 38, "portfolioBalance": 120_000 },
        "monthlyExpenses": 20_000,
    })));
    let projection = report.projection;
    let partner = projection.partner.as_ref().expect("couple projection has a partner");

    let summed = projection.primary.total_savings + partner.total_savings;
    assert!((projection.total_savings - summed).abs() < 1e-6);
    let income = projection.primary.monthly_income + partner.monthly_income;
    assert!((projection.monthly_income - income).abs() < 1e-6);
    assert_eq!(projection.balances, projection.primary.balances + partner.balances);
}
