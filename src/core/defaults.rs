use super::types::Country;

pub const DEFAULT_RETURN: f64 = 7.0;
pub const DEFAULT_PENSION_CONTRIBUTION_RATE: f64 = 17.5;
pub const DEFAULT_EFFECTIVE_TAX_RATE: f64 = 25.0;
pub const DEFAULT_RETIREMENT_TAX_RATE: f64 = 25.0;
pub const DEFAULT_RSU_TAX_RATE: f64 = 25.0;
pub const DEFAULT_WITHDRAWAL_RATE: f64 = 4.0;
pub const DEFAULT_ANNUITY_COEFFICIENT: f64 = 200.0;
pub const DEFAULT_REPLACEMENT_RATIO: f64 = 70.0;
pub const DEFAULT_INFLATION_RATE: f64 = 2.5;
pub const DEFAULT_RENTAL_YIELD: f64 = 3.0;
pub const DEFAULT_CURRENT_AGE: f64 = 30.0;
pub const DEFAULT_RETIREMENT_AGE: f64 = 67.0;
pub const DEFAULT_LIFE_EXPECTANCY: f64 = 90.0;
pub const DEFAULT_PENSION_MANAGEMENT_FEE: f64 = 0.5;
pub const DEFAULT_TRAINING_FUND_FEE: f64 = 0.6;
pub const DEFAULT_PORTFOLIO_FEE: f64 = 0.5;

pub const MAX_AGE: u32 = 120;

/// Approximate share of gross salary that reaches the employee.
///
/// This is a heuristic used only to infer a gross figure when the caller
/// supplied nothing but net pay. It is not a tax model.
pub fn take_home_fraction(country: Country) -> f64 {
    match country {
        Country::Israel => 0.75,
        Country::UnitedKingdom => 0.72,
        Country::UnitedStates => 0.70,
        Country::Other => 1.0 - DEFAULT_EFFECTIVE_TAX_RATE / 100.0,
    }
}

pub fn retirement_age(country: Country) -> Option<f64> {
    match country {
        Country::Israel | Country::UnitedKingdom | Country::UnitedStates => Some(67.0),
        Country::Other => None,
    }
}

pub fn pension_contribution_rate(country: Country) -> Option<f64> {
    match country {
        Country::Israel => Some(17.5),
        Country::UnitedKingdom => Some(8.0),
        Country::UnitedStates => Some(10.0),
        Country::Other => None,
    }
}

pub fn training_fund_contribution_rate(country: Country) -> Option<f64> {
    match country {
        Country::Israel => Some(10.0),
        Country::UnitedKingdom | Country::UnitedStates => Some(0.0),
        Country::Other => None,
    }
}

pub fn pension_deposit_fee(country: Country) -> Option<f64> {
    match country {
        Country::Israel => Some(1.5),
        _ => None,
    }
}

pub fn pension_management_fee(country: Country) -> Option<f64> {
    match country {
        Country::Israel => Some(0.22),
        Country::UnitedKingdom => Some(0.75),
        Country::UnitedStates => Some(0.5),
        Country::Other => None,
    }
}

pub fn retirement_tax_rate(country: Country) -> Option<f64> {
    match country {
        Country::Israel => Some(10.0),
        Country::UnitedKingdom => Some(20.0),
        Country::UnitedStates => Some(15.0),
        Country::Other => None,
    }
}

pub fn rsu_tax_rate(country: Country) -> Option<f64> {
    match country {
        Country::Israel => Some(25.0),
        Country::UnitedKingdom => Some(40.0),
        Country::UnitedStates => Some(35.0),
        Country::Other => None,
    }
}

pub fn training_fund_salary_cap(country: Country) -> Option<f64> {
    match country {
        Country::Israel => Some(15_712.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_country_take_home_matches_default_effective_tax() {
        assert!((take_home_fraction(Country::Other) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn take_home_fractions_are_proper_fractions() {
        for country in [
            Country::Israel,
            Country::UnitedKingdom,
            Country::UnitedStates,
            Country::Other,
        ] {
            let fraction = take_home_fraction(country);
            assert!(fraction > 0.0 && fraction <= 1.0, "{country:?}");
        }
    }
}
