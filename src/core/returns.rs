use tracing::warn;

use super::defaults::DEFAULT_RETURN;
use super::types::{
    AssetAllocation, AssetClass, ResolvedReturns, ReturnAssumptions, ReturnWarning, Scenario,
};

const CONSERVATIVE: ReturnAssumptions = ReturnAssumptions {
    pension: 4.0,
    training_fund: 3.5,
    portfolio: 5.0,
    real_estate: 3.0,
    crypto: 5.0,
};

const MODERATE: ReturnAssumptions = ReturnAssumptions {
    pension: 6.0,
    training_fund: 5.5,
    portfolio: 7.0,
    real_estate: 4.0,
    crypto: 10.0,
};

const AGGRESSIVE: ReturnAssumptions = ReturnAssumptions {
    pension: 8.0,
    training_fund: 7.0,
    portfolio: 9.0,
    real_estate: 5.0,
    crypto: 15.0,
};

impl Scenario {
    pub fn returns(&self) -> ReturnAssumptions {
        match self {
            Scenario::Conservative => CONSERVATIVE,
            Scenario::Moderate => MODERATE,
            Scenario::Aggressive => AGGRESSIVE,
            Scenario::Custom(overrides) => {
                MODERATE.map(|class, base| overrides.get(class).unwrap_or(base))
            }
        }
    }
}

fn plausible_ceiling(class: AssetClass) -> f64 {
    match class {
        AssetClass::Pension | AssetClass::TrainingFund | AssetClass::Portfolio => 10.0,
        AssetClass::RealEstate => 8.0,
        AssetClass::Crypto => 30.0,
    }
}

pub fn horizon_factor(horizon_years: Option<u32>) -> f64 {
    match horizon_years {
        Some(years) if years < 5 => 0.85,
        Some(years) if years < 10 => 0.93,
        Some(years) if years > 35 => 1.03,
        _ => 1.0,
    }
}

pub fn blended_return(returns: &ReturnAssumptions, allocation: &AssetAllocation) -> f64 {
    let mut weighted = 0.0;
    let mut weight_total = 0.0;
    for class in AssetClass::ALL {
        let weight = allocation.get(class).max(0.0);
        weighted += returns.get(class) * weight;
        weight_total += weight;
    }
    if weight_total <= 0.0 || !weighted.is_finite() {
        DEFAULT_RETURN
    } else {
        weighted / weight_total
    }
}

fn check_plausibility(scenario: &Scenario, returns: &ReturnAssumptions) -> Vec<ReturnWarning> {
    let Scenario::Custom(overrides) = scenario else {
        return Vec::new();
    };

    let mut warnings = Vec::new();
    for class in AssetClass::ALL {
        let Some(value) = overrides.get(class) else {
            continue;
        };
        let ceiling = plausible_ceiling(class);
        let message = if value < 0.0 {
            format!("{} return of {value}% is negative", class.key())
        } else if value > ceiling {
            format!(
                "{} return of {value}% exceeds the historically plausible {ceiling}%",
                class.key()
            )
        } else {
            continue;
        };
        warn!(asset_class = class.key(), value, "implausible return assumption");
        warnings.push(ReturnWarning {
            asset_class: class,
            value: returns.get(class),
            message,
        });
    }
    warnings
}

pub fn resolve_returns(
    scenario: &Scenario,
    allocation: &AssetAllocation,
    horizon_years: Option<u32>,
) -> ResolvedReturns {
    let base = scenario.returns();
    let warnings = check_plausibility(scenario, &base);
    let factor = horizon_factor(horizon_years);
    let assumptions = base.map(|class, value| match class {
        AssetClass::Crypto => value,
        _ => value * factor,
    });

    ResolvedReturns {
        scenario: scenario.key(),
        blended_return: blended_return(&assumptions, allocation),
        assumptions,
        horizon_factor: factor,
        warnings,
    }
}
