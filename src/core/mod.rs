mod currency;
pub mod defaults;
mod normalize;
mod plan;
mod projection;
mod returns;
mod scoring;
mod solver;
mod types;

pub use currency::{ConvertedAmount, convert_currency};
pub use normalize::{infer_gross_from_net, normalize_inputs, parse_allocation, parse_scenario};
pub use plan::{PlanReport, plan_retirement, returns_for};
pub use projection::{
    monthly_contributions, project_person, project_retirement, readiness_score,
    target_monthly_income,
};
pub use returns::{blended_return, horizon_factor, resolve_returns};
pub use scoring::score_financial_health;
pub use solver::{GoalSolveConfig, GoalSolveIteration, GoalSolveResult, GoalType, SolveError, solve_goal};
pub use types::{
    AssetAllocation, AssetBreakdown, AssetClass, CanonicalInputs, Country, DebtProfile,
    DrawdownMethod, ExpenseBreakdown, FinancialInputs, HealthCategory, HealthScore,
    NormalizationNote, NormalizedInputs, NoteSource, PersonInputs, PersonProjection,
    PlanningAssumptions, PlanningMode, ProjectionResult, ProjectionYear, ResolvedReturns,
    ReturnAssumptions, ReturnOverrides, ReturnWarning, Scenario,
};
