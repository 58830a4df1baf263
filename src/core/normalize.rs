use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::defaults;
use super::types::{
    AssetAllocation, AssetBreakdown, AssetClass, CanonicalInputs, Country, DebtProfile,
    DrawdownMethod, ExpenseBreakdown, FinancialInputs, NormalizationNote, NormalizedInputs,
    NoteSource, PersonInputs, PlanningAssumptions, PlanningMode, ReturnOverrides, Scenario,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Kind {
    Money,
    Percent,
    Age,
    Factor,
}

#[derive(Copy, Clone)]
enum Fallback {
    Missing,
    Global(f64),
    ByCountry(fn(Country) -> Option<f64>, f64),
}

struct FieldSpec {
    name: &'static str,
    aliases: &'static [&'static str],
    kind: Kind,
    fallback: Fallback,
}

macro_rules! field {
    ($name:literal, [$($alias:literal),* $(,)?], $kind:ident, $fallback:expr) => {
        FieldSpec {
            name: $name,
            aliases: &[$($alias),*],
            kind: Kind::$kind,
            fallback: $fallback,
        }
    };
}

const CURRENT_AGE: FieldSpec = field!("currentAge", ["age"], Age, Fallback::Global(defaults::DEFAULT_CURRENT_AGE));
const RETIREMENT_AGE: FieldSpec = field!(
    "retirementAge",
    ["targetRetirementAge", "retireAge"],
    Age,
    Fallback::ByCountry(defaults::retirement_age, defaults::DEFAULT_RETIREMENT_AGE)
);
const LIFE_EXPECTANCY: FieldSpec = field!(
    "lifeExpectancy",
    ["expectedLifespan"],
    Age,
    Fallback::Global(defaults::DEFAULT_LIFE_EXPECTANCY)
);

const INFLATION_RATE: FieldSpec = field!("inflationRate", ["inflation"], Percent, Fallback::Global(defaults::DEFAULT_INFLATION_RATE));
const WITHDRAWAL_RATE: FieldSpec = field!(
    "withdrawalRate",
    ["safeWithdrawalRate"],
    Percent,
    Fallback::Global(defaults::DEFAULT_WITHDRAWAL_RATE)
);
const ANNUITY_COEFFICIENT: FieldSpec = field!(
    "annuityCoefficient",
    ["pensionConversionFactor", "conversionFactor"],
    Factor,
    Fallback::Global(defaults::DEFAULT_ANNUITY_COEFFICIENT)
);
const REPLACEMENT_RATIO: FieldSpec = field!(
    "replacementRatio",
    ["targetReplacementRatio"],
    Percent,
    Fallback::Global(defaults::DEFAULT_REPLACEMENT_RATIO)
);
const RENTAL_YIELD: FieldSpec = field!("rentalYield", ["realEstateYield"], Percent, Fallback::Global(defaults::DEFAULT_RENTAL_YIELD));
const RETIREMENT_TAX_RATE: FieldSpec = field!(
    "retirementTaxRate",
    ["pensionTaxRate", "taxRate"],
    Percent,
    Fallback::ByCountry(defaults::retirement_tax_rate, defaults::DEFAULT_RETIREMENT_TAX_RATE)
);
const SALARY_GROWTH_RATE: FieldSpec = field!("salaryGrowthRate", ["salaryGrowth", "contributionGrowth"], Percent, Fallback::Global(0.0));

const HOUSING: FieldSpec = field!("housingExpenses", ["housing", "rentOrMortgage"], Money, Fallback::Global(0.0));
const TRANSPORTATION: FieldSpec = field!("transportationExpenses", ["transportation", "transport"], Money, Fallback::Global(0.0));
const FOOD: FieldSpec = field!("foodExpenses", ["food", "groceries"], Money, Fallback::Global(0.0));
const OTHER_EXPENSES: FieldSpec = field!("otherExpenses", ["other"], Money, Fallback::Global(0.0));
const TOTAL_EXPENSES: FieldSpec = field!(
    "monthlyExpenses",
    ["currentMonthlyExpenses", "expenses", "totalMonthlyExpenses"],
    Money,
    Fallback::Missing
);

const MORTGAGE_BALANCE: FieldSpec = field!("mortgageBalance", ["mortgage"], Money, Fallback::Global(0.0));
const OTHER_DEBT: FieldSpec = field!("otherDebt", ["loans", "consumerDebt"], Money, Fallback::Global(0.0));
const DEBT_PAYMENTS: FieldSpec = field!(
    "monthlyDebtPayments",
    ["debtPayments", "monthlyLoanPayments", "mortgagePayment"],
    Money,
    Fallback::Global(0.0)
);

const GROSS_SALARY: FieldSpec = field!(
    "monthlyGrossSalary",
    ["grossSalary", "salary", "currentMonthlySalary", "monthlySalary"],
    Money,
    Fallback::Missing
);
const NET_SALARY: FieldSpec = field!("monthlyNetSalary", ["netSalary", "netMonthlySalary"], Money, Fallback::Missing);
const ANNUAL_BONUS: FieldSpec = field!("annualBonus", ["bonus"], Money, Fallback::Global(0.0));
const RSU_ANNUAL_VALUE: FieldSpec = field!("rsuAnnualValue", ["rsuValue", "annualRsuValue"], Money, Fallback::Missing);
const RSU_UNITS: FieldSpec = field!("rsuUnits", ["rsuUnitsPerYear"], Money, Fallback::Global(0.0));
const RSU_PRICE: FieldSpec = field!("rsuPrice", ["stockPrice", "rsuCurrentPrice"], Money, Fallback::Global(0.0));
const RSU_TAX_RATE: FieldSpec = field!(
    "rsuTaxRate",
    [],
    Percent,
    Fallback::ByCountry(defaults::rsu_tax_rate, defaults::DEFAULT_RSU_TAX_RATE)
);

const PENSION_BALANCE: FieldSpec = field!(
    "currentPensionBalance",
    ["pensionBalance", "currentSavings", "currentPension"],
    Money,
    Fallback::Global(0.0)
);
const TRAINING_FUND_BALANCE: FieldSpec = field!(
    "currentTrainingFund",
    ["trainingFundBalance", "trainingFund"],
    Money,
    Fallback::Global(0.0)
);
const PORTFOLIO_BALANCE: FieldSpec = field!(
    "currentPersonalPortfolio",
    ["personalPortfolio", "portfolioBalance"],
    Money,
    Fallback::Global(0.0)
);
const REAL_ESTATE_VALUE: FieldSpec = field!(
    "currentRealEstate",
    ["realEstateValue", "realEstate"],
    Money,
    Fallback::Global(0.0)
);
const CRYPTO_BALANCE: FieldSpec = field!(
    "currentCrypto",
    ["cryptoBalance", "currentCryptoFiatValue", "crypto"],
    Money,
    Fallback::Global(0.0)
);

const PENSION_RATE: FieldSpec = field!(
    "pensionContributionRate",
    ["contributionRate", "pensionRate"],
    Percent,
    Fallback::ByCountry(
        defaults::pension_contribution_rate,
        defaults::DEFAULT_PENSION_CONTRIBUTION_RATE
    )
);
const EMPLOYEE_PENSION_RATE: FieldSpec = field!("employeePensionRate", ["employeeContributionRate"], Percent, Fallback::Missing);
const EMPLOYER_PENSION_RATE: FieldSpec = field!("employerPensionRate", ["employerContributionRate"], Percent, Fallback::Missing);
const TRAINING_FUND_RATE: FieldSpec = field!(
    "trainingFundContributionRate",
    ["trainingFundRate"],
    Percent,
    Fallback::ByCountry(defaults::training_fund_contribution_rate, 0.0)
);
const PORTFOLIO_CONTRIBUTION: FieldSpec = field!(
    "monthlyPortfolioContribution",
    ["portfolioMonthlyContribution", "monthlyInvestment"],
    Money,
    Fallback::Global(0.0)
);
const REAL_ESTATE_CONTRIBUTION: FieldSpec = field!(
    "monthlyRealEstateContribution",
    ["realEstateMonthlyContribution"],
    Money,
    Fallback::Global(0.0)
);
const CRYPTO_CONTRIBUTION: FieldSpec = field!(
    "monthlyCryptoContribution",
    ["cryptoMonthlyContribution"],
    Money,
    Fallback::Global(0.0)
);
const PENSION_DEPOSIT_FEE: FieldSpec = field!(
    "pensionDepositFee",
    ["contributionFee"],
    Percent,
    Fallback::ByCountry(defaults::pension_deposit_fee, 0.0)
);
const PENSION_MANAGEMENT_FEE: FieldSpec = field!(
    "pensionAccumulationFee",
    ["pensionManagementFee", "accumulationFee"],
    Percent,
    Fallback::ByCountry(
        defaults::pension_management_fee,
        defaults::DEFAULT_PENSION_MANAGEMENT_FEE
    )
);
const TRAINING_FUND_FEE: FieldSpec = field!(
    "trainingFundFee",
    ["trainingFundManagementFee"],
    Percent,
    Fallback::Global(defaults::DEFAULT_TRAINING_FUND_FEE)
);
const PORTFOLIO_FEE: FieldSpec = field!(
    "portfolioFee",
    ["portfolioManagementFee"],
    Percent,
    Fallback::Global(defaults::DEFAULT_PORTFOLIO_FEE)
);
const STATE_PENSION: FieldSpec = field!(
    "monthlyStatePension",
    ["statePension", "socialSecurity", "nationalInsurance"],
    Money,
    Fallback::Global(0.0)
);

const COUNTRY_KEYS: &[&str] = &["country", "countryCode", "residence"];
const MODE_KEYS: &[&str] = &["planningMode", "planningType", "mode"];
const SCENARIO_KEYS: &[&str] = &[
    "riskProfile",
    "scenario",
    "marketScenario",
    "riskTolerance",
    "investmentProfile",
];
const DRAWDOWN_KEYS: &[&str] = &["drawdownMethod", "incomeMethod"];

enum Parsed {
    Missing,
    Number(f64),
    Invalid(String),
}

fn parse_number(value: &Value) -> Parsed {
    match value {
        Value::Null => Parsed::Missing,
        Value::Number(n) => match n.as_f64() {
            Some(v) if v.is_finite() => Parsed::Number(v),
            _ => Parsed::Invalid(n.to_string()),
        },
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !c.is_whitespace() && !matches!(c, ',' | '_' | '%' | '$' | '£' | '€' | '₪'))
                .collect();
            if cleaned.is_empty() {
                return Parsed::Missing;
            }
            match cleaned.parse::<f64>() {
                Ok(v) if v.is_finite() => Parsed::Number(v),
                _ => Parsed::Invalid(s.clone()),
            }
        }
        other => Parsed::Invalid(other.to_string()),
    }
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

struct Scope<'a> {
    label: String,
    sources: Vec<(&'a Map<String, Value>, Option<String>)>,
}

impl<'a> Scope<'a> {
    fn household(raw: &'a FinancialInputs) -> Self {
        Scope {
            label: String::new(),
            sources: vec![(raw.fields(), None)],
        }
    }

    fn partner(raw: &'a FinancialInputs, index: u8) -> Self {
        let prefix = format!("partner{index}");
        let mut sources = Vec::new();
        if let Some(nested) = raw.nested(&prefix) {
            sources.push((nested, None));
        }
        sources.push((raw.fields(), Some(prefix.clone())));
        if index == 1 {
            sources.push((raw.fields(), None));
        }
        Scope {
            label: format!("{prefix}."),
            sources,
        }
    }

    /// First present value, returned with the key it sat under and the
    /// unprefixed name that matched. Null and blank values count as absent.
    fn find(
        &self,
        names: impl Iterator<Item = &'static str> + Clone,
    ) -> Option<(String, &'static str, &'a Value)> {
        for (map, prefix) in &self.sources {
            for name in names.clone() {
                let key = match prefix {
                    Some(prefix) => format!("{prefix}{}", capitalize(name)),
                    None => name.to_string(),
                };
                if let Some(value) = map.get(&key) {
                    if !matches!(parse_number(value), Parsed::Missing) {
                        return Some((key, name, value));
                    }
                }
            }
        }
        None
    }

    fn has_any_field(&self) -> bool {
        self.sources
            .iter()
            .any(|(map, prefix)| match prefix {
                Some(prefix) => map.keys().any(|k| k.starts_with(prefix.as_str())),
                None => !map.is_empty(),
            })
    }
}

struct Resolver {
    country: Country,
    notes: Vec<NormalizationNote>,
}

impl Resolver {
    fn note(&mut self, field: String, value: f64, source: NoteSource) {
        debug!(field = %field, value, ?source, "input resolved without explicit value");
        self.notes.push(NormalizationNote {
            field,
            value,
            source,
        });
    }

    /// Walks name → aliases within the scope. Returns `None` only when the
    /// field is absent everywhere and has no default.
    fn resolve_opt(&mut self, scope: &Scope<'_>, spec: &FieldSpec) -> Option<f64> {
        let field = format!("{}{}", scope.label, spec.name);
        let names = std::iter::once(spec.name).chain(spec.aliases.iter().copied());
        let found = scope.find(names);

        if let Some((key, name, value)) = found {
            match parse_number(value) {
                Parsed::Number(v) => {
                    if name != spec.name {
                        self.note(field.clone(), v, NoteSource::Alias { key });
                    }
                    return Some(self.clamp(field, spec.kind, v));
                }
                Parsed::Invalid(raw) => {
                    warn!(field = %field, raw = %raw, "unparseable numeric input treated as zero");
                    self.note(field, 0.0, NoteSource::Unparseable { raw });
                    return Some(0.0);
                }
                Parsed::Missing => {}
            }
        }

        match spec.fallback {
            Fallback::Missing => None,
            Fallback::Global(v) => {
                self.note(field, v, NoteSource::GlobalDefault);
                Some(v)
            }
            Fallback::ByCountry(lookup, global) => match lookup(self.country) {
                Some(v) => {
                    self.note(field, v, NoteSource::CountryDefault);
                    Some(v)
                }
                None => {
                    self.note(field, global, NoteSource::GlobalDefault);
                    Some(global)
                }
            },
        }
    }

    fn resolve(&mut self, scope: &Scope<'_>, spec: &FieldSpec) -> f64 {
        self.resolve_opt(scope, spec).unwrap_or(0.0)
    }

    fn clamp(&mut self, field: String, kind: Kind, value: f64) -> f64 {
        let value = if kind == Kind::Age { value.round() } else { value };
        let clamped = match kind {
            Kind::Percent => value.clamp(0.0, 100.0),
            Kind::Money | Kind::Factor => value.max(0.0),
            Kind::Age => value.clamp(0.0, defaults::MAX_AGE as f64),
        };
        if clamped != value {
            warn!(field = %field, value, clamped, "input outside its valid range");
            self.note(field, clamped, NoteSource::Clamped { original: value });
        }
        clamped
    }
}

fn find_str<'a>(raw: &'a FinancialInputs, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| raw.get(key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

fn parse_country(raw: &FinancialInputs) -> Option<Country> {
    find_str(raw, COUNTRY_KEYS).and_then(Country::from_code)
}

fn parse_mode(raw: &FinancialInputs) -> PlanningMode {
    match find_str(raw, MODE_KEYS).map(str::to_ascii_lowercase).as_deref() {
        Some("couple") | Some("joint") | Some("family") => PlanningMode::Couple,
        Some(_) => PlanningMode::Individual,
        None if Scope::partner(raw, 2).has_any_field() => PlanningMode::Couple,
        None => PlanningMode::Individual,
    }
}

fn parse_drawdown(raw: &FinancialInputs) -> DrawdownMethod {
    match find_str(raw, DRAWDOWN_KEYS).map(str::to_ascii_lowercase).as_deref() {
        Some("annuity") | Some("annuitize") => DrawdownMethod::Annuity,
        _ => DrawdownMethod::WithdrawalRate,
    }
}

fn return_overrides(raw: &FinancialInputs) -> ReturnOverrides {
    let mut overrides = ReturnOverrides::default();
    let nested = raw.nested("expectedReturns").or_else(|| raw.nested("returns"));
    for class in AssetClass::ALL {
        let flat_key = format!("{}Return", class.key());
        let value = nested
            .and_then(|m| m.get(class.key()))
            .or_else(|| raw.get(&flat_key));
        match value.map(parse_number) {
            Some(Parsed::Number(v)) => overrides.set(class, v),
            Some(Parsed::Invalid(raw_value)) => {
                warn!(asset_class = class.key(), raw = %raw_value, "unparseable return override ignored");
            }
            _ => {}
        }
    }
    overrides
}

pub fn parse_scenario(raw: &FinancialInputs) -> Scenario {
    let overrides = return_overrides(raw);
    let named = find_str(raw, SCENARIO_KEYS).map(str::to_ascii_lowercase);
    match named.as_deref() {
        Some("conservative") | Some("low") | Some("cautious") => Scenario::Conservative,
        Some("moderate") | Some("medium") | Some("balanced") => Scenario::Moderate,
        Some("aggressive") | Some("high") | Some("growth") => Scenario::Aggressive,
        Some("custom") => Scenario::Custom(overrides),
        Some(other) => {
            warn!(scenario = other, "unknown market scenario, using moderate");
            Scenario::Moderate
        }
        None if !overrides.is_empty() => Scenario::Custom(overrides),
        None => Scenario::Moderate,
    }
}

pub fn parse_allocation(raw: &FinancialInputs, balances: &AssetBreakdown) -> AssetAllocation {
    let nested = raw.nested("allocation").or_else(|| raw.nested("allocations"));
    let mut explicit = AssetAllocation::default();
    let mut any = false;
    for class in AssetClass::ALL {
        let flat_key = format!("{}Allocation", class.key());
        let value = nested
            .and_then(|m| m.get(class.key()))
            .or_else(|| raw.get(&flat_key));
        if let Some(Parsed::Number(v)) = value.map(parse_number) {
            *explicit.get_mut(class) = v.max(0.0);
            any = true;
        }
    }
    if any && explicit.total() > 0.0 {
        return explicit;
    }

    let total = balances.total();
    if total > 0.0 {
        balances.map(|_, v| v.max(0.0) / total * 100.0)
    } else {
        AssetAllocation::default().map(|_, _| 100.0 / AssetClass::ALL.len() as f64)
    }
}

/// Approximates gross salary from take-home pay using the country's assumed
/// take-home fraction. A heuristic, not an inversion of any tax schedule.
pub fn infer_gross_from_net(net: f64, country: Country) -> f64 {
    let fraction = defaults::take_home_fraction(country);
    if fraction <= 0.0 { net } else { net / fraction }
}

fn resolve_person(
    resolver: &mut Resolver,
    scope: &Scope<'_>,
    household_age: u32,
    household_retirement_age: u32,
) -> PersonInputs {
    let country = resolver.country;

    let current_age = if scope.label.is_empty() {
        household_age
    } else {
        let names = std::iter::once(CURRENT_AGE.name).chain(CURRENT_AGE.aliases.iter().copied());
        match scope.find(names).map(|(_, _, v)| parse_number(v)) {
            Some(Parsed::Number(v)) => v.round().clamp(0.0, defaults::MAX_AGE as f64) as u32,
            _ => household_age,
        }
    };
    let retirement_age = if scope.label.is_empty() {
        household_retirement_age
    } else {
        let names =
            std::iter::once(RETIREMENT_AGE.name).chain(RETIREMENT_AGE.aliases.iter().copied());
        match scope.find(names).map(|(_, _, v)| parse_number(v)) {
            Some(Parsed::Number(v)) => v.round().clamp(0.0, defaults::MAX_AGE as f64) as u32,
            _ => household_retirement_age,
        }
    };

    let gross = resolver.resolve_opt(scope, &GROSS_SALARY);
    let net = resolver.resolve_opt(scope, &NET_SALARY);
    let (monthly_gross_salary, monthly_net_salary) = match (gross, net) {
        (Some(gross), Some(net)) => (gross, net),
        (Some(gross), None) => {
            let net = gross * defaults::take_home_fraction(country);
            resolver.note(format!("{}{}", scope.label, NET_SALARY.name), net, NoteSource::Derived);
            (gross, net)
        }
        (None, Some(net)) => {
            let gross = infer_gross_from_net(net, country);
            resolver.note(
                format!("{}{}", scope.label, GROSS_SALARY.name),
                gross,
                NoteSource::Derived,
            );
            (gross, net)
        }
        (None, None) => (0.0, 0.0),
    };

    let rsu_tax = resolver.resolve(scope, &RSU_TAX_RATE);
    let rsu_gross = match resolver.resolve_opt(scope, &RSU_ANNUAL_VALUE) {
        Some(value) => value,
        None => {
            let units = resolver.resolve(scope, &RSU_UNITS);
            let price = resolver.resolve(scope, &RSU_PRICE);
            units * price
        }
    };

    let pension_contribution_rate = {
        let employee = resolver.resolve_opt(scope, &EMPLOYEE_PENSION_RATE);
        let employer = resolver.resolve_opt(scope, &EMPLOYER_PENSION_RATE);
        let names = std::iter::once(PENSION_RATE.name).chain(PENSION_RATE.aliases.iter().copied());
        if scope.find(names).is_none() && (employee.is_some() || employer.is_some()) {
            let combined = (employee.unwrap_or(0.0) + employer.unwrap_or(0.0)).clamp(0.0, 100.0);
            resolver.note(
                format!("{}{}", scope.label, PENSION_RATE.name),
                combined,
                NoteSource::Derived,
            );
            combined
        } else {
            resolver.resolve(scope, &PENSION_RATE)
        }
    };

    PersonInputs {
        current_age,
        retirement_age,
        monthly_gross_salary,
        monthly_net_salary,
        annual_bonus: resolver.resolve(scope, &ANNUAL_BONUS),
        annual_rsu_value: rsu_gross * (1.0 - rsu_tax / 100.0),
        balances: AssetBreakdown {
            pension: resolver.resolve(scope, &PENSION_BALANCE),
            training_fund: resolver.resolve(scope, &TRAINING_FUND_BALANCE),
            portfolio: resolver.resolve(scope, &PORTFOLIO_BALANCE),
            real_estate: resolver.resolve(scope, &REAL_ESTATE_VALUE),
            crypto: resolver.resolve(scope, &CRYPTO_BALANCE),
        },
        pension_contribution_rate,
        training_fund_contribution_rate: resolver.resolve(scope, &TRAINING_FUND_RATE),
        monthly_portfolio_contribution: resolver.resolve(scope, &PORTFOLIO_CONTRIBUTION),
        monthly_real_estate_contribution: resolver.resolve(scope, &REAL_ESTATE_CONTRIBUTION),
        monthly_crypto_contribution: resolver.resolve(scope, &CRYPTO_CONTRIBUTION),
        pension_deposit_fee: resolver.resolve(scope, &PENSION_DEPOSIT_FEE),
        pension_management_fee: resolver.resolve(scope, &PENSION_MANAGEMENT_FEE),
        training_fund_fee: resolver.resolve(scope, &TRAINING_FUND_FEE),
        portfolio_fee: resolver.resolve(scope, &PORTFOLIO_FEE),
        monthly_state_pension: resolver.resolve(scope, &STATE_PENSION),
    }
}

/// Produces the canonical record every downstream stage consumes. Never
/// fails: missing fields take defaults and malformed numbers become zero,
/// each recorded as a [`NormalizationNote`].
pub fn normalize_inputs(raw: &FinancialInputs) -> NormalizedInputs {
    let country = match parse_country(raw) {
        Some(country) => country,
        None => {
            debug!("no country given, assuming Israel");
            Country::Israel
        }
    };
    let mode = parse_mode(raw);
    let mut resolver = Resolver {
        country,
        notes: Vec::new(),
    };
    let household = Scope::household(raw);

    let current_age = resolver.resolve(&household, &CURRENT_AGE) as u32;
    let retirement_age = resolver.resolve(&household, &RETIREMENT_AGE) as u32;
    let life_expectancy = (resolver.resolve(&household, &LIFE_EXPECTANCY) as u32).max(retirement_age);
    if retirement_age <= current_age {
        warn!(
            current_age,
            retirement_age, "retirement age not after current age, no accumulation will be projected"
        );
    }

    let mut expenses = ExpenseBreakdown {
        housing: resolver.resolve(&household, &HOUSING),
        transportation: resolver.resolve(&household, &TRANSPORTATION),
        food: resolver.resolve(&household, &FOOD),
        other: resolver.resolve(&household, &OTHER_EXPENSES),
    };
    if let Some(total) = resolver.resolve_opt(&household, &TOTAL_EXPENSES) {
        let itemized = expenses.total();
        if total > itemized {
            expenses.other += total - itemized;
        }
    }

    let debt = DebtProfile {
        mortgage_balance: resolver.resolve(&household, &MORTGAGE_BALANCE),
        other_debt: resolver.resolve(&household, &OTHER_DEBT),
        monthly_payments: resolver.resolve(&household, &DEBT_PAYMENTS),
    };

    let assumptions = PlanningAssumptions {
        inflation_rate: resolver.resolve(&household, &INFLATION_RATE),
        withdrawal_rate: resolver.resolve(&household, &WITHDRAWAL_RATE),
        annuity_coefficient: resolver.resolve(&household, &ANNUITY_COEFFICIENT),
        replacement_ratio: resolver.resolve(&household, &REPLACEMENT_RATIO),
        rental_yield: resolver.resolve(&household, &RENTAL_YIELD),
        retirement_tax_rate: resolver.resolve(&household, &RETIREMENT_TAX_RATE),
        salary_growth_rate: resolver.resolve(&household, &SALARY_GROWTH_RATE),
        drawdown: parse_drawdown(raw),
    };

    let (primary, partner) = match mode {
        PlanningMode::Individual => {
            let primary = resolve_person(&mut resolver, &household, current_age, retirement_age);
            (primary, None)
        }
        PlanningMode::Couple => {
            let first = Scope::partner(raw, 1);
            let second = Scope::partner(raw, 2);
            let primary = resolve_person(&mut resolver, &first, current_age, retirement_age);
            let partner = resolve_person(&mut resolver, &second, current_age, retirement_age);
            (primary, Some(partner))
        }
    };

    let household_balances = match &partner {
        Some(partner) => primary.balances + partner.balances,
        None => primary.balances,
    };

    let inputs = CanonicalInputs {
        current_age,
        retirement_age,
        life_expectancy,
        country,
        mode,
        expenses,
        debt,
        assumptions,
        scenario: parse_scenario(raw),
        allocation: parse_allocation(raw, &household_balances),
        primary,
        partner,
    };

    NormalizedInputs {
        inputs,
        notes: resolver.notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn raw(value: Value) -> FinancialInputs {
        FinancialInputs::from_value(value).expect("object")
    }

    #[test]
    fn explicit_names_win_over_aliases() {
        let normalized = normalize_inputs(&raw(json!({
            "currentPensionBalance": 100_000,
            "pensionBalance": 5,
        })));
        assert_approx(normalized.inputs.primary.balances.pension, 100_000.0);
        assert!(
            !normalized
                .notes
                .iter()
                .any(|n| n.field == "currentPensionBalance")
        );
    }

    #[test]
    fn aliases_resolve_and_are_noted() {
        let normalized = normalize_inputs(&raw(json!({ "salary": 20_000 })));
        assert_approx(normalized.inputs.primary.monthly_gross_salary, 20_000.0);
        assert!(normalized.notes.iter().any(|n| n.field == "monthlyGrossSalary"
            && n.source
                == NoteSource::Alias {
                    key: "salary".to_string()
                }));
    }

    #[test]
    fn country_defaults_precede_global_defaults() {
        let israel = normalize_inputs(&raw(json!({ "country": "IL" }))).inputs;
        assert_approx(israel.primary.training_fund_contribution_rate, 10.0);
        assert_approx(israel.primary.pension_contribution_rate, 17.5);

        let uk = normalize_inputs(&raw(json!({ "country": "uk" }))).inputs;
        assert_approx(uk.primary.pension_contribution_rate, 8.0);
        assert_approx(uk.primary.training_fund_contribution_rate, 0.0);

        let other = normalize_inputs(&raw(json!({ "country": "fr" }))).inputs;
        assert_eq!(other.country, Country::Other);
        assert_approx(
            other.primary.pension_contribution_rate,
            defaults::DEFAULT_PENSION_CONTRIBUTION_RATE,
        );
    }

    #[test]
    fn gross_is_inferred_from_net_with_take_home_fraction() {
        let normalized = normalize_inputs(&raw(json!({ "netSalary": 15_000, "country": "israel" })));
        assert_approx(normalized.inputs.primary.monthly_gross_salary, 20_000.0);
        assert!(normalized
            .notes
            .iter()
            .any(|n| n.field == "monthlyGrossSalary" && n.source == NoteSource::Derived));
    }

    #[test]
    fn numeric_strings_are_cleaned_and_garbage_becomes_zero() {
        let normalized = normalize_inputs(&raw(json!({
            "monthlyGrossSalary": "₪ 12,500",
            "currentCrypto": "lots",
            "inflationRate": "3%",
        })));
        let inputs = normalized.inputs;
        assert_approx(inputs.primary.monthly_gross_salary, 12_500.0);
        assert_approx(inputs.primary.balances.crypto, 0.0);
        assert_approx(inputs.assumptions.inflation_rate, 3.0);
        assert!(normalized.notes.iter().any(|n| n.field == "currentCrypto"
            && matches!(n.source, NoteSource::Unparseable { .. })));
    }

    #[test]
    fn empty_strings_count_as_missing() {
        let inputs = normalize_inputs(&raw(json!({ "withdrawalRate": "  " }))).inputs;
        assert_approx(inputs.assumptions.withdrawal_rate, defaults::DEFAULT_WITHDRAWAL_RATE);
    }

    #[test]
    fn blank_canonical_value_falls_through_to_aliases() {
        let inputs = normalize_inputs(&raw(json!({
            "monthlyGrossSalary": "",
            "salary": 20_000,
            "pensionContributionRate": "  ",
            "employeePensionRate": 6,
            "employerPensionRate": 6.5,
        })))
        .inputs;
        assert_approx(inputs.primary.monthly_gross_salary, 20_000.0);
        assert_approx(inputs.primary.pension_contribution_rate, 12.5);
    }

    #[test]
    fn blank_partner_age_inherits_household_age() {
        let inputs = normalize_inputs(&raw(json!({
            "planningMode": "couple",
            "currentAge": 44,
            "partner2": { "currentAge": "", "age": 41 },
        })))
        .inputs;
        assert_eq!(inputs.partner.expect("partner present").current_age, 41);
    }

    #[test]
    fn prefixed_canonical_key_is_not_noted_as_alias() {
        let normalized = normalize_inputs(&raw(json!({
            "planningMode": "couple",
            "partner2MonthlyNetSalary": 7_500,
            "partner2NetSalary": 1,
        })));
        let partner = normalized.inputs.partner.as_ref().expect("partner present");
        assert_approx(partner.monthly_net_salary, 7_500.0);
        assert!(!normalized.notes.iter().any(|n| n.field == "partner2.monthlyNetSalary"
            && matches!(n.source, NoteSource::Alias { .. })));
    }

    #[test]
    fn fractional_ages_round_without_clamp_note() {
        let normalized = normalize_inputs(&raw(json!({ "currentAge": 39.6 })));
        assert_eq!(normalized.inputs.current_age, 40);
        assert!(!normalized
            .notes
            .iter()
            .any(|n| matches!(n.source, NoteSource::Clamped { .. })));

        let too_old = normalize_inputs(&raw(json!({ "currentAge": 150 })));
        assert_eq!(too_old.inputs.current_age, defaults::MAX_AGE);
        assert!(too_old
            .notes
            .iter()
            .any(|n| n.source == NoteSource::Clamped { original: 150.0 }));
    }

    #[test]
    fn percentages_are_clamped_with_note() {
        let normalized = normalize_inputs(&raw(json!({ "pensionContributionRate": 140 })));
        assert_approx(normalized.inputs.primary.pension_contribution_rate, 100.0);
        assert!(normalized
            .notes
            .iter()
            .any(|n| n.source == NoteSource::Clamped { original: 140.0 }));
    }

    #[test]
    fn negative_balances_clamp_to_zero() {
        let inputs = normalize_inputs(&raw(json!({ "currentPersonalPortfolio": -10 }))).inputs;
        assert_approx(inputs.primary.balances.portfolio, 0.0);
    }

    #[test]
    fn itemized_expenses_absorb_larger_total() {
        let inputs = normalize_inputs(&raw(json!({
            "housing": 5_000,
            "food": 2_000,
            "monthlyExpenses": 10_000,
        })))
        .inputs;
        assert_approx(inputs.expenses.total(), 10_000.0);
        assert_approx(inputs.expenses.other, 3_000.0);
    }

    #[test]
    fn rsu_value_falls_back_to_units_times_price_net_of_tax() {
        let inputs = normalize_inputs(&raw(json!({
            "country": "israel",
            "rsuUnits": 100,
            "rsuPrice": "40",
        })))
        .inputs;
        assert_approx(inputs.primary.annual_rsu_value, 3_000.0);
    }

    #[test]
    fn employee_and_employer_rates_sum_when_total_missing() {
        let inputs = normalize_inputs(&raw(json!({
            "employeePensionRate": 6,
            "employerPensionRate": 6.5,
        })))
        .inputs;
        assert_approx(inputs.primary.pension_contribution_rate, 12.5);
    }

    #[test]
    fn couple_mode_reads_nested_and_prefixed_partner_fields() {
        let inputs = normalize_inputs(&raw(json!({
            "planningMode": "couple",
            "currentAge": 40,
            "partner1": { "grossSalary": 20_000 },
            "partner2NetSalary": 7_500,
            "partner2CurrentAge": 38,
        })))
        .inputs;
        assert_eq!(inputs.mode, PlanningMode::Couple);
        assert_approx(inputs.primary.monthly_gross_salary, 20_000.0);
        assert_eq!(inputs.primary.current_age, 40);
        let partner = inputs.partner.expect("partner present");
        assert_approx(partner.monthly_gross_salary, 10_000.0);
        assert_eq!(partner.current_age, 38);
    }

    #[test]
    fn partner2_object_implies_couple_mode() {
        let inputs = normalize_inputs(&raw(json!({
            "partner2": { "salary": 9_000 },
        })))
        .inputs;
        assert_eq!(inputs.mode, PlanningMode::Couple);
    }

    #[test]
    fn scenario_parsing_handles_names_and_overrides() {
        assert_eq!(
            parse_scenario(&raw(json!({ "riskProfile": "Aggressive" }))),
            Scenario::Aggressive
        );
        assert_eq!(parse_scenario(&raw(json!({}))), Scenario::Moderate);
        match parse_scenario(&raw(json!({ "expectedReturns": { "portfolio": 8 } }))) {
            Scenario::Custom(overrides) => {
                assert_eq!(overrides.portfolio, Some(8.0));
                assert_eq!(overrides.pension, None);
            }
            other => panic!("expected custom scenario, got {other:?}"),
        }
    }

    #[test]
    fn allocation_defaults_to_balance_shares_then_equal_weights() {
        let balances = AssetBreakdown {
            pension: 75.0,
            portfolio: 25.0,
            ..AssetBreakdown::default()
        };
        let allocation = parse_allocation(&raw(json!({})), &balances);
        assert_approx(allocation.pension, 75.0);
        assert_approx(allocation.portfolio, 25.0);

        let equal = parse_allocation(&raw(json!({})), &AssetBreakdown::default());
        assert_approx(equal.crypto, 20.0);

        let explicit = parse_allocation(&raw(json!({ "allocation": { "crypto": 10 } })), &balances);
        assert_approx(explicit.crypto, 10.0);
        assert_approx(explicit.pension, 0.0);
    }
}
