use super::defaults;
use super::types::{
    AssetBreakdown, AssetClass, CanonicalInputs, Country, DrawdownMethod, PersonInputs,
    PersonProjection, ProjectionResult, ProjectionYear, ReturnAssumptions,
};

pub fn monthly_contributions(country: Country, person: &PersonInputs) -> AssetBreakdown {
    let gross = person.monthly_gross_salary.max(0.0);
    let training_fund_base = match defaults::training_fund_salary_cap(country) {
        Some(cap) => gross.min(cap),
        None => gross,
    };
    AssetBreakdown {
        pension: gross * person.pension_contribution_rate / 100.0,
        training_fund: training_fund_base * person.training_fund_contribution_rate / 100.0,
        portfolio: person.monthly_portfolio_contribution + person.annual_rsu_value / 12.0,
        real_estate: person.monthly_real_estate_contribution,
        crypto: person.monthly_crypto_contribution,
    }
    .map(|_, v| v.max(0.0))
}

fn deposit_fees(person: &PersonInputs) -> AssetBreakdown {
    AssetBreakdown {
        pension: person.pension_deposit_fee,
        ..AssetBreakdown::default()
    }
}

fn management_fees(person: &PersonInputs) -> AssetBreakdown {
    AssetBreakdown {
        pension: person.pension_management_fee,
        training_fund: person.training_fund_fee,
        portfolio: person.portfolio_fee,
        ..AssetBreakdown::default()
    }
}

fn price_index(inflation_rate: f64, years: u32) -> f64 {
    (1.0 + inflation_rate / 100.0).max(1e-9).powi(years as i32)
}

fn annuity_withdrawal_rate(real_return: f64, years_remaining: u32) -> f64 {
    let years = years_remaining.max(1) as f64;
    if real_return.abs() < 1e-9 {
        return (1.0 / years).clamp(0.0, 1.0);
    }

    if real_return <= -0.99 {
        return 1.0;
    }

    let denom = 1.0 - (1.0 + real_return).powf(-years);
    if denom <= 1e-9 {
        1.0
    } else {
        (real_return / denom).clamp(0.0, 1.0)
    }
}

fn monthly_income(
    inputs: &CanonicalInputs,
    person: &PersonInputs,
    returns: &ReturnAssumptions,
    balances: &AssetBreakdown,
    price_index: f64,
) -> f64 {
    let assumptions = &inputs.assumptions;
    let liquid = balances.training_fund + balances.portfolio + balances.crypto;

    let pension = if assumptions.annuity_coefficient > 0.0 {
        balances.pension / assumptions.annuity_coefficient
    } else {
        balances.pension * assumptions.withdrawal_rate / 100.0 / 12.0
    };
    let annual_drawdown_rate = match assumptions.drawdown {
        DrawdownMethod::WithdrawalRate => assumptions.withdrawal_rate / 100.0,
        DrawdownMethod::Annuity => {
            let payout_years = inputs.life_expectancy.saturating_sub(person.retirement_age);
            let real_return = (returns.portfolio - assumptions.inflation_rate) / 100.0;
            annuity_withdrawal_rate(real_return, payout_years)
        }
    };
    let from_liquid = liquid * annual_drawdown_rate / 12.0;
    let rental = balances.real_estate * assumptions.rental_yield / 100.0 / 12.0;
    let state_pension = person.monthly_state_pension * price_index;

    let gross = (pension + from_liquid + rental + state_pension).max(0.0);
    gross * (1.0 - assumptions.retirement_tax_rate / 100.0)
}

/// Accumulates one person's balances year by year until their retirement.
/// Each year: deposit the year's contributions net of deposit fees, compound
/// at the class return, then take the management fee off the balance.
pub fn project_person(
    inputs: &CanonicalInputs,
    returns: &ReturnAssumptions,
    person: &PersonInputs,
) -> PersonProjection {
    let years = person.years_to_retirement();
    let monthly = monthly_contributions(inputs.country, person);
    let deposit_fee = deposit_fees(person);
    let management_fee = management_fees(person);
    let growth = inputs.assumptions.salary_growth_rate / 100.0;

    let mut balances = person.balances.map(|_, v| v.max(0.0));
    let mut total_contributions = 0.0;
    let mut yearly = Vec::with_capacity(years as usize);

    for year in 0..years {
        let multiplier = (1.0 + growth).powi(year as i32);
        let mut contributed = 0.0;
        for class in AssetClass::ALL {
            let contribution = (monthly.get(class)
                * 12.0
                * multiplier
                * (1.0 - deposit_fee.get(class) / 100.0))
                .max(0.0);
            let growth_factor = (1.0 + returns.get(class) / 100.0).max(0.0);
            let fee_factor = (1.0 - management_fee.get(class) / 100.0).max(0.0);
            let balance = balances.get_mut(class);
            *balance = ((*balance + contribution) * growth_factor * fee_factor).max(0.0);
            contributed += contribution;
        }
        total_contributions += contributed;
        yearly.push(ProjectionYear {
            year: year + 1,
            age: person.current_age + year + 1,
            contribution: contributed,
            balances,
            total: balances.total(),
        });
    }

    let index = price_index(inputs.assumptions.inflation_rate, years);
    let total_savings = balances.total();
    let income = monthly_income(inputs, person, returns, &balances, index);

    PersonProjection {
        years_to_retirement: years,
        balances,
        total_savings,
        total_savings_real: total_savings / index,
        total_contributions,
        monthly_income: income,
        monthly_income_real: income / index,
        yearly,
    }
}

pub fn target_monthly_income(inputs: &CanonicalInputs) -> f64 {
    let gross = inputs.monthly_gross_income();
    if gross > 0.0 {
        gross * inputs.assumptions.replacement_ratio / 100.0
    } else {
        inputs.expenses.total().max(0.0)
    }
}

pub fn readiness_score(real_monthly_income: f64, target: f64) -> f64 {
    if target <= 0.0 || !real_monthly_income.is_finite() {
        return 0.0;
    }
    (real_monthly_income / target * 100.0).clamp(0.0, 100.0)
}

/// Projects savings at retirement. In couple mode pass the second partner;
/// combined totals are then the exact sum of the two partners' totals.
pub fn project_retirement(
    inputs: &CanonicalInputs,
    returns: &ReturnAssumptions,
    partner: Option<&PersonInputs>,
) -> ProjectionResult {
    let primary = project_person(inputs, returns, &inputs.primary);
    let partner = partner.map(|p| project_person(inputs, returns, p));

    let (balances, total_savings, total_savings_real, monthly_income, monthly_income_real) =
        match &partner {
            Some(second) => (
                primary.balances + second.balances,
                primary.total_savings + second.total_savings,
                primary.total_savings_real + second.total_savings_real,
                primary.monthly_income + second.monthly_income,
                primary.monthly_income_real + second.monthly_income_real,
            ),
            None => (
                primary.balances,
                primary.total_savings,
                primary.total_savings_real,
                primary.monthly_income,
                primary.monthly_income_real,
            ),
        };

    let annual_expenses = inputs.expenses.total() * 12.0;
    let years_of_income_coverage = if annual_expenses > 0.0 {
        Some(total_savings_real / annual_expenses)
    } else {
        None
    };
    let target = target_monthly_income(inputs);

    ProjectionResult {
        years_to_retirement: primary.years_to_retirement,
        balances,
        total_savings,
        total_savings_real,
        monthly_income,
        monthly_income_real,
        target_monthly_income: target,
        years_of_income_coverage,
        readiness_score: readiness_score(monthly_income_real, target),
        primary,
        partner,
    }
}
