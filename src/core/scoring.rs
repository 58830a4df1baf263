use super::projection::monthly_contributions;
use super::types::{CanonicalInputs, HealthCategory, HealthScore, ProjectionResult};

pub const SAVINGS_RATE_WEIGHT: f64 = 0.30;
pub const READINESS_WEIGHT: f64 = 0.35;
pub const DEBT_WEIGHT: f64 = 0.15;
pub const EXPENSE_WEIGHT: f64 = 0.20;

const TARGET_SAVINGS_RATE: f64 = 0.20;
const MAX_DEBT_TO_INCOME: f64 = 0.50;
const EXPENSE_RATIO_BOUNDS: (f64, f64) = (0.50, 1.00); // full score, zero score

const SAVINGS_MULTIPLE_BY_AGE: &[(u32, f64)] = &[
    (25, 0.5),
    (30, 1.0),
    (35, 2.0),
    (40, 3.0),
    (45, 4.0),
    (50, 6.0),
    (55, 7.0),
    (60, 8.0),
    (67, 10.0),
];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Factor {
    SavingsRate,
    Readiness,
    Debt,
    Expenses,
}

struct RecommendationRule {
    factor: Factor,
    below: f64,
    message: &'static str,
}

// first match per factor wins
const RULES: &[RecommendationRule] = &[
    RecommendationRule {
        factor: Factor::SavingsRate,
        below: 50.0,
        message: "Savings rate is below 10% of gross income: consider increasing pension or portfolio contributions.",
    },
    RecommendationRule {
        factor: Factor::SavingsRate,
        below: 100.0,
        message: "Savings rate is under the 20% target: small contribution increases compound significantly over time.",
    },
    RecommendationRule {
        factor: Factor::Readiness,
        below: 40.0,
        message: "Projected retirement income covers less than 40% of the target: consider retiring later or saving more.",
    },
    RecommendationRule {
        factor: Factor::Readiness,
        below: 70.0,
        message: "Retirement income is on track for part of the target: review return assumptions and fees.",
    },
    RecommendationRule {
        factor: Factor::Debt,
        below: 50.0,
        message: "Debt payments exceed 25% of gross income: prioritise paying down high-interest debt.",
    },
    RecommendationRule {
        factor: Factor::Debt,
        below: 100.0,
        message: "Keep debt repayments on schedule and avoid new consumer debt before retirement.",
    },
    RecommendationRule {
        factor: Factor::Expenses,
        below: 50.0,
        message: "Expenses exceed 75% of net income: review housing and discretionary spending.",
    },
    RecommendationRule {
        factor: Factor::Expenses,
        below: 100.0,
        message: "Expenses use more than half of net income: an emergency fund of 3-6 months is advisable.",
    },
];

const ON_TRACK: &str = "Your finances are on track: keep reviewing the plan once a year.";

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator > 0.0 && numerator.is_finite() && denominator.is_finite() {
        Some(numerator / denominator)
    } else {
        None
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn savings_rate_score(rate: Option<f64>) -> f64 {
    match rate {
        Some(rate) => clamp_score(rate / TARGET_SAVINGS_RATE * 100.0),
        None => 0.0,
    }
}

fn debt_score(monthly_payments: f64, total_debt: f64, dti: Option<f64>) -> f64 {
    if monthly_payments <= 0.0 && total_debt <= 0.0 {
        return 100.0;
    }
    match dti {
        Some(dti) => clamp_score(100.0 - dti / MAX_DEBT_TO_INCOME * 100.0),
        None if monthly_payments <= 0.0 => 100.0,
        None => 0.0,
    }
}

fn expense_score(expenses: f64, expense_ratio: Option<f64>) -> f64 {
    if expenses <= 0.0 {
        return 100.0;
    }
    let (low, high) = EXPENSE_RATIO_BOUNDS;
    match expense_ratio {
        Some(r) => clamp_score((high - r) / (high - low) * 100.0),
        None => 0.0,
    }
}

fn savings_multiple_target(age: u32) -> f64 {
    let (first_age, first_multiple) = SAVINGS_MULTIPLE_BY_AGE[0];
    if age <= first_age {
        return first_multiple;
    }
    for pair in SAVINGS_MULTIPLE_BY_AGE.windows(2) {
        let (a0, m0) = pair[0];
        let (a1, m1) = pair[1];
        if age <= a1 {
            let t = (age - a0) as f64 / (a1 - a0) as f64;
            return m0 + (m1 - m0) * t;
        }
    }
    SAVINGS_MULTIPLE_BY_AGE[SAVINGS_MULTIPLE_BY_AGE.len() - 1].1
}

fn heuristic_readiness(inputs: &CanonicalInputs) -> f64 {
    let annual_gross = inputs.monthly_gross_income() * 12.0;
    let target = annual_gross * savings_multiple_target(inputs.current_age);
    match ratio(inputs.current_savings(), target) {
        Some(r) => clamp_score(r * 100.0),
        None => 0.0,
    }
}

fn recommendations(scores: &[(Factor, f64)]) -> Vec<String> {
    let mut out = Vec::new();
    for (factor, score) in scores {
        if let Some(rule) = RULES
            .iter()
            .find(|rule| rule.factor == *factor && *score < rule.below)
        {
            out.push(rule.message.to_string());
        }
    }
    if out.is_empty() {
        out.push(ON_TRACK.to_string());
    }
    out
}

pub fn score_financial_health(
    inputs: &CanonicalInputs,
    projection: Option<&ProjectionResult>,
) -> HealthScore {
    let gross = inputs.monthly_gross_income();
    let net = inputs.monthly_net_income();
    let contributions: f64 = inputs
        .people()
        .map(|person| monthly_contributions(inputs.country, person).total())
        .sum();
    let expenses = inputs.expenses.total();

    let savings_rate = ratio(contributions, gross);
    let debt_to_income = ratio(inputs.debt.monthly_payments, gross);
    let expense_ratio = ratio(expenses, net);

    let savings_rate_score = savings_rate_score(savings_rate);
    let retirement_readiness_score = match projection {
        Some(projection) => clamp_score(projection.readiness_score),
        None => heuristic_readiness(inputs),
    };
    let debt_management_score = debt_score(
        inputs.debt.monthly_payments,
        inputs.debt.total_balance(),
        debt_to_income,
    );
    let expense_ratio_score = expense_score(expenses, expense_ratio);

    let overall_score = clamp_score(
        savings_rate_score * SAVINGS_RATE_WEIGHT
            + retirement_readiness_score * READINESS_WEIGHT
            + debt_management_score * DEBT_WEIGHT
            + expense_ratio_score * EXPENSE_WEIGHT,
    );

    let recommendations = recommendations(&[
        (Factor::SavingsRate, savings_rate_score),
        (Factor::Readiness, retirement_readiness_score),
        (Factor::Debt, debt_management_score),
        (Factor::Expenses, expense_ratio_score),
    ]);

    HealthScore {
        savings_rate_score,
        retirement_readiness_score,
        debt_management_score,
        expense_ratio_score,
        overall_score,
        category: HealthCategory::from_score(overall_score),
        savings_rate,
        debt_to_income,
        expense_ratio,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalize::normalize_inputs;
    use crate::core::types::FinancialInputs;
    use proptest::prelude::{prop_assert, proptest};
    use serde_json::json;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn inputs(value: serde_json::Value) -> CanonicalInputs {
        let raw = FinancialInputs::from_value(value).expect("object");
        normalize_inputs(&raw).inputs
    }

    fn assert_in_bounds(score: &HealthScore) {
        for value in [
            score.savings_rate_score,
            score.retirement_readiness_score,
            score.debt_management_score,
            score.expense_ratio_score,
            score.overall_score,
        ] {
            assert!(value.is_finite(), "non-finite score in {score:?}");
            assert!((0.0..=100.0).contains(&value), "out of bounds in {score:?}");
        }
    }

    #[test]
    fn weights_sum_to_one() {
        assert_approx(
            SAVINGS_RATE_WEIGHT + READINESS_WEIGHT + DEBT_WEIGHT + EXPENSE_WEIGHT,
            1.0,
        );
    }

    #[test]
    fn zero_income_gives_zero_savings_score_and_no_nan() {
        let score = score_financial_health(&inputs(json!({ "monthlyExpenses": 5_000 })), None);
        assert_approx(score.savings_rate_score, 0.0);
        assert_eq!(score.savings_rate, None);
        assert_approx(score.expense_ratio_score, 0.0);
        assert_approx(score.debt_management_score, 100.0);
        assert_in_bounds(&score);
    }

    #[test]
    fn empty_record_is_well_defined() {
        let score = score_financial_health(&inputs(json!({})), None);
        assert_in_bounds(&score);
        assert_approx(score.expense_ratio_score, 100.0);
    }

    #[test]
    fn savings_rate_curve_saturates_at_twenty_percent() {
        assert_approx(savings_rate_score(Some(0.10)), 50.0);
        assert_approx(savings_rate_score(Some(0.25)), 100.0);
        assert_approx(savings_rate_score(Some(0.0)), 0.0);
    }

    #[test]
    fn debt_score_is_inverse_of_debt_to_income() {
        assert_approx(debt_score(0.0, 0.0, Some(0.0)), 100.0);
        assert_approx(debt_score(2_500.0, 100_000.0, Some(0.25)), 50.0);
        assert_approx(debt_score(6_000.0, 100_000.0, Some(0.6)), 0.0);
        assert_approx(debt_score(1_000.0, 0.0, None), 0.0);
    }

    #[test]
    fn expense_score_interpolates_between_bounds() {
        assert_approx(expense_score(5_000.0, Some(0.5)), 100.0);
        assert_approx(expense_score(7_500.0, Some(0.75)), 50.0);
        assert_approx(expense_score(12_000.0, Some(1.2)), 0.0);
    }

    #[test]
    fn savings_multiple_interpolates_by_age() {
        assert_approx(savings_multiple_target(20), 0.5);
        assert_approx(savings_multiple_target(42), 3.4);
        assert_approx(savings_multiple_target(80), 10.0);
    }

    #[test]
    fn projection_readiness_is_used_when_supplied() {
        let canonical = inputs(json!({ "salary": 20_000, "currentAge": 39 }));
        let returns = canonical.scenario.returns();
        let mut projection =
            crate::core::projection::project_retirement(&canonical, &returns, None);
        projection.readiness_score = 42.0;
        let score = score_financial_health(&canonical, Some(&projection));
        assert_approx(score.retirement_readiness_score, 42.0);
    }

    #[test]
    fn healthy_household_gets_high_category_and_on_track_message() {
        let canonical = inputs(json!({
            "currentAge": 45,
            "country": "israel",
            "monthlyGrossSalary": 30_000,
            "monthlyNetSalary": 22_000,
            "monthlyPortfolioContribution": 2_000,
            "currentPensionBalance": 2_000_000,
            "currentPersonalPortfolio": 1_000_000,
            "monthlyExpenses": 9_000,
        }));
        let score = score_financial_health(&canonical, None);
        assert_eq!(score.category, HealthCategory::Excellent);
        assert_eq!(score.recommendations, vec![ON_TRACK.to_string()]);
    }

    #[test]
    fn low_savings_triggers_recommendation() {
        let canonical = inputs(json!({
            "monthlyGrossSalary": 10_000,
            "pensionContributionRate": 5,
            "trainingFundContributionRate": 0,
        }));
        let score = score_financial_health(&canonical, None);
        assert!(score
            .recommendations
            .iter()
            .any(|r| r.starts_with("Savings rate is below 10%")));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_scores_stay_in_bounds(
            salary in 0u32..60_000,
            net in 0u32..40_000,
            expenses in 0u32..80_000,
            payments in 0u32..30_000,
            pension in 0u32..3_000_000,
            age in 18u32..90,
        ) {
            let canonical = inputs(json!({
                "currentAge": age,
                "monthlyGrossSalary": salary,
                "monthlyNetSalary": net,
                "monthlyExpenses": expenses,
                "monthlyDebtPayments": payments,
                "currentPensionBalance": pension,
            }));
            let score = score_financial_health(&canonical, None);
            for value in [
                score.savings_rate_score,
                score.retirement_readiness_score,
                score.debt_management_score,
                score.expense_ratio_score,
                score.overall_score,
            ] {
                prop_assert!(value.is_finite());
                prop_assert!((0.0..=100.0).contains(&value));
            }
        }
    }
}
