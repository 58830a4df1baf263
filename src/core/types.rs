use std::ops::Add;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Country {
    Israel,
    UnitedKingdom,
    UnitedStates,
    Other,
}

impl Country {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "il" | "isr" | "israel" => Some(Country::Israel),
            "uk" | "gb" | "gbr" | "united-kingdom" | "united kingdom" | "britain" => {
                Some(Country::UnitedKingdom)
            }
            "us" | "usa" | "united-states" | "united states" => Some(Country::UnitedStates),
            "" => None,
            _ => Some(Country::Other),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanningMode {
    Individual,
    Couple,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetClass {
    Pension,
    TrainingFund,
    Portfolio,
    RealEstate,
    Crypto,
}

impl AssetClass {
    pub const ALL: [AssetClass; 5] = [
        AssetClass::Pension,
        AssetClass::TrainingFund,
        AssetClass::Portfolio,
        AssetClass::RealEstate,
        AssetClass::Crypto,
    ];

    pub fn key(self) -> &'static str {
        match self {
            AssetClass::Pension => "pension",
            AssetClass::TrainingFund => "trainingFund",
            AssetClass::Portfolio => "portfolio",
            AssetClass::RealEstate => "realEstate",
            AssetClass::Crypto => "crypto",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetBreakdown {
    pub pension: f64,
    pub training_fund: f64,
    pub portfolio: f64,
    pub real_estate: f64,
    pub crypto: f64,
}

impl AssetBreakdown {
    pub fn get(&self, class: AssetClass) -> f64 {
        match class {
            AssetClass::Pension => self.pension,
            AssetClass::TrainingFund => self.training_fund,
            AssetClass::Portfolio => self.portfolio,
            AssetClass::RealEstate => self.real_estate,
            AssetClass::Crypto => self.crypto,
        }
    }

    pub fn get_mut(&mut self, class: AssetClass) -> &mut f64 {
        match class {
            AssetClass::Pension => &mut self.pension,
            AssetClass::TrainingFund => &mut self.training_fund,
            AssetClass::Portfolio => &mut self.portfolio,
            AssetClass::RealEstate => &mut self.real_estate,
            AssetClass::Crypto => &mut self.crypto,
        }
    }

    pub fn total(&self) -> f64 {
        self.pension + self.training_fund + self.portfolio + self.real_estate + self.crypto
    }

    pub fn map(self, mut f: impl FnMut(AssetClass, f64) -> f64) -> Self {
        let mut out = self;
        for class in AssetClass::ALL {
            *out.get_mut(class) = f(class, self.get(class));
        }
        out
    }
}

impl Add for AssetBreakdown {
    type Output = AssetBreakdown;

    fn add(self, rhs: Self) -> Self::Output {
        self.map(|class, value| value + rhs.get(class))
    }
}

pub type ReturnAssumptions = AssetBreakdown;
// weights in percent, need not sum to 100
pub type AssetAllocation = AssetBreakdown;

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnOverrides {
    pub pension: Option<f64>,
    pub training_fund: Option<f64>,
    pub portfolio: Option<f64>,
    pub real_estate: Option<f64>,
    pub crypto: Option<f64>,
}

impl ReturnOverrides {
    pub fn get(&self, class: AssetClass) -> Option<f64> {
        match class {
            AssetClass::Pension => self.pension,
            AssetClass::TrainingFund => self.training_fund,
            AssetClass::Portfolio => self.portfolio,
            AssetClass::RealEstate => self.real_estate,
            AssetClass::Crypto => self.crypto,
        }
    }

    pub fn set(&mut self, class: AssetClass, value: f64) {
        let slot = match class {
            AssetClass::Pension => &mut self.pension,
            AssetClass::TrainingFund => &mut self.training_fund,
            AssetClass::Portfolio => &mut self.portfolio,
            AssetClass::RealEstate => &mut self.real_estate,
            AssetClass::Crypto => &mut self.crypto,
        };
        *slot = Some(value);
    }

    pub fn is_empty(&self) -> bool {
        AssetClass::ALL.iter().all(|class| self.get(*class).is_none())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "overrides", rename_all = "lowercase")]
pub enum Scenario {
    Conservative,
    Moderate,
    Aggressive,
    Custom(ReturnOverrides),
}

impl Scenario {
    pub fn key(&self) -> &'static str {
        match self {
            Scenario::Conservative => "conservative",
            Scenario::Moderate => "moderate",
            Scenario::Aggressive => "aggressive",
            Scenario::Custom(_) => "custom",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrawdownMethod {
    WithdrawalRate,
    Annuity,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseBreakdown {
    pub housing: f64,
    pub transportation: f64,
    pub food: f64,
    pub other: f64,
}

impl ExpenseBreakdown {
    pub fn total(&self) -> f64 {
        self.housing + self.transportation + self.food + self.other
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtProfile {
    pub mortgage_balance: f64,
    pub other_debt: f64,
    pub monthly_payments: f64,
}

impl DebtProfile {
    pub fn total_balance(&self) -> f64 {
        self.mortgage_balance + self.other_debt
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningAssumptions {
    pub inflation_rate: f64,
    pub withdrawal_rate: f64,
    pub annuity_coefficient: f64,
    pub replacement_ratio: f64,
    pub rental_yield: f64,
    pub retirement_tax_rate: f64,
    pub salary_growth_rate: f64,
    pub drawdown: DrawdownMethod,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonInputs {
    pub current_age: u32,
    pub retirement_age: u32,
    pub monthly_gross_salary: f64,
    pub monthly_net_salary: f64,
    pub annual_bonus: f64,
    /// Yearly vesting value after RSU tax.
    pub annual_rsu_value: f64,
    pub balances: AssetBreakdown,
    pub pension_contribution_rate: f64,
    pub training_fund_contribution_rate: f64,
    pub monthly_portfolio_contribution: f64,
    pub monthly_real_estate_contribution: f64,
    pub monthly_crypto_contribution: f64,
    pub pension_deposit_fee: f64,
    pub pension_management_fee: f64,
    pub training_fund_fee: f64,
    pub portfolio_fee: f64,
    pub monthly_state_pension: f64,
}

impl PersonInputs {
    pub fn years_to_retirement(&self) -> u32 {
        self.retirement_age.saturating_sub(self.current_age)
    }

    pub fn monthly_gross_income(&self) -> f64 {
        self.monthly_gross_salary + self.annual_bonus / 12.0
    }

    pub fn monthly_net_income(&self) -> f64 {
        self.monthly_net_salary + self.annual_rsu_value / 12.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalInputs {
    pub current_age: u32,
    pub retirement_age: u32,
    pub life_expectancy: u32,
    pub country: Country,
    pub mode: PlanningMode,
    pub expenses: ExpenseBreakdown,
    pub debt: DebtProfile,
    pub assumptions: PlanningAssumptions,
    pub scenario: Scenario,
    pub allocation: AssetAllocation,
    pub primary: PersonInputs,
    pub partner: Option<PersonInputs>,
}

impl CanonicalInputs {
    pub fn people(&self) -> impl Iterator<Item = &PersonInputs> {
        std::iter::once(&self.primary).chain(self.partner.iter())
    }

    pub fn monthly_gross_income(&self) -> f64 {
        self.people().map(PersonInputs::monthly_gross_income).sum()
    }

    pub fn monthly_net_income(&self) -> f64 {
        self.people().map(PersonInputs::monthly_net_income).sum()
    }

    pub fn current_savings(&self) -> f64 {
        self.people().map(|p| p.balances.total()).sum()
    }
}

/// Raw wizard state: a flat JSON object, possibly with nested `partner1` /
/// `partner2` objects.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinancialInputs(Map<String, Value>);

impl FinancialInputs {
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn nested(&self, key: &str) -> Option<&Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NoteSource {
    Alias { key: String },
    CountryDefault,
    GlobalDefault,
    Derived,
    Unparseable { raw: String },
    Clamped { original: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationNote {
    pub field: String,
    pub value: f64,
    pub source: NoteSource,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedInputs {
    pub inputs: CanonicalInputs,
    pub notes: Vec<NormalizationNote>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnWarning {
    pub asset_class: AssetClass,
    pub value: f64,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedReturns {
    pub scenario: &'static str,
    pub assumptions: ReturnAssumptions,
    pub blended_return: f64,
    pub horizon_factor: f64,
    pub warnings: Vec<ReturnWarning>,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionYear {
    pub year: u32,
    pub age: u32,
    pub contribution: f64,
    pub balances: AssetBreakdown,
    pub total: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonProjection {
    pub years_to_retirement: u32,
    pub balances: AssetBreakdown,
    pub total_savings: f64,
    pub total_savings_real: f64,
    pub total_contributions: f64,
    pub monthly_income: f64,
    pub monthly_income_real: f64,
    pub yearly: Vec<ProjectionYear>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub years_to_retirement: u32,
    pub balances: AssetBreakdown,
    pub total_savings: f64,
    pub total_savings_real: f64,
    pub monthly_income: f64,
    pub monthly_income_real: f64,
    pub target_monthly_income: f64,
    pub years_of_income_coverage: Option<f64>,
    pub readiness_score: f64,
    #[serde(rename = "partner1")]
    pub primary: PersonProjection,
    #[serde(rename = "partner2")]
    pub partner: Option<PersonProjection>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HealthCategory {
    Excellent,
    Good,
    NeedsWork,
    Critical,
}

impl HealthCategory {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            HealthCategory::Excellent
        } else if score >= 60.0 {
            HealthCategory::Good
        } else if score >= 40.0 {
            HealthCategory::NeedsWork
        } else {
            HealthCategory::Critical
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthScore {
    pub savings_rate_score: f64,
    pub retirement_readiness_score: f64,
    pub debt_management_score: f64,
    pub expense_ratio_score: f64,
    pub overall_score: f64,
    pub category: HealthCategory,
    pub savings_rate: Option<f64>,
    pub debt_to_income: Option<f64>,
    pub expense_ratio: Option<f64>,
    pub recommendations: Vec<String>,
}
