use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::defaults::MAX_AGE;
use super::projection::project_retirement;
use super::types::{CanonicalInputs, ReturnAssumptions};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalType {
    RequiredContribution,
    EarliestRetirement,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoalSolveConfig {
    pub goal_type: GoalType,
    pub target_readiness: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for GoalSolveConfig {
    fn default() -> Self {
        Self {
            goal_type: GoalType::RequiredContribution,
            target_readiness: 100.0,
            search_min: 0.0,
            search_max: 100_000.0,
            tolerance: 1.0,
            max_iterations: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub readiness_score: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveResult {
    pub goal_type: GoalType,
    pub target_readiness: f64,
    pub solved_value: Option<f64>,
    pub achieved_readiness: Option<f64>,
    pub iterations: Vec<GoalSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum SolveError {
    #[error("targetReadiness must be within (0, 100], got {0}")]
    TargetOutOfRange(f64),
    #[error("search bounds must be finite with searchMax > searchMin")]
    InvalidBounds,
    #[error("tolerance must be > 0")]
    InvalidTolerance,
    #[error("maxIterations must be > 0")]
    NoIterations,
}

fn validate_config(config: &GoalSolveConfig) -> Result<(), SolveError> {
    if !config.target_readiness.is_finite()
        || config.target_readiness <= 0.0
        || config.target_readiness > 100.0
    {
        return Err(SolveError::TargetOutOfRange(config.target_readiness));
    }
    if !config.search_min.is_finite()
        || !config.search_max.is_finite()
        || config.search_max <= config.search_min
    {
        return Err(SolveError::InvalidBounds);
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(SolveError::InvalidTolerance);
    }
    if config.max_iterations == 0 {
        return Err(SolveError::NoIterations);
    }
    Ok(())
}

fn evaluate_contribution(
    base_inputs: &CanonicalInputs,
    returns: &ReturnAssumptions,
    extra_monthly: f64,
) -> f64 {
    let mut inputs = base_inputs.clone();
    inputs.primary.monthly_portfolio_contribution += extra_monthly.max(0.0);
    project_retirement(&inputs, returns, inputs.partner.as_ref()).readiness_score
}

fn evaluate_retirement_age(
    base_inputs: &CanonicalInputs,
    returns: &ReturnAssumptions,
    age: u32,
) -> f64 {
    let mut inputs = base_inputs.clone();
    let shift = age as i64 - inputs.retirement_age as i64;
    inputs.retirement_age = age;
    inputs.primary.retirement_age = age;
    if let Some(partner) = inputs.partner.as_mut() {
        partner.retirement_age = (partner.retirement_age as i64 + shift).clamp(0, MAX_AGE as i64) as u32;
    }
    project_retirement(&inputs, returns, inputs.partner.as_ref()).readiness_score
}

fn meets(readiness: f64, target: f64) -> bool {
    readiness + 1e-9 >= target
}

fn solve_required_contribution(
    inputs: &CanonicalInputs,
    returns: &ReturnAssumptions,
    config: &GoalSolveConfig,
) -> GoalSolveResult {
    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let low = evaluate_contribution(inputs, returns, config.search_min);
    let high = evaluate_contribution(inputs, returns, config.search_max);

    let mut solved_value = None;
    let mut converged = false;
    let feasible;
    let message;

    if meets(low, config.target_readiness) {
        solved_value = Some(config.search_min);
        converged = true;
        feasible = true;
        message = "Already meets target at lower contribution bound.".to_string();
    } else if !meets(high, config.target_readiness) {
        feasible = false;
        message = "No feasible contribution found within the search bounds.".to_string();
    } else {
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let readiness = evaluate_contribution(inputs, returns, mid);
            iterations.push(GoalSolveIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_value: mid,
                readiness_score: readiness,
            });

            if meets(readiness, config.target_readiness) {
                hi = mid;
            } else {
                lo = mid;
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                break;
            }
        }
        solved_value = Some(hi);
        feasible = true;
        message = if converged {
            "Solved required contribution.".to_string()
        } else {
            "Reached max iterations before tolerance was met; returning best estimate.".to_string()
        };
    }

    GoalSolveResult {
        goal_type: GoalType::RequiredContribution,
        target_readiness: config.target_readiness,
        achieved_readiness: solved_value.map(|v| evaluate_contribution(inputs, returns, v)),
        solved_value,
        iterations,
        converged,
        feasible,
        message,
    }
}

// readiness is not monotone in retirement age; take the first qualifying age
fn solve_earliest_retirement(
    inputs: &CanonicalInputs,
    returns: &ReturnAssumptions,
    config: &GoalSolveConfig,
) -> GoalSolveResult {
    let first = (config.search_min.ceil().max(0.0) as u32).max(inputs.current_age);
    let last = (config.search_max.floor().max(0.0) as u32).min(MAX_AGE);
    let mut iterations = Vec::new();
    let mut found = None;

    for (index, age) in (first..=last).enumerate() {
        if index as u32 >= config.max_iterations {
            break;
        }
        let readiness = evaluate_retirement_age(inputs, returns, age);
        iterations.push(GoalSolveIteration {
            iteration: index as u32 + 1,
            lower_bound: first as f64,
            upper_bound: last as f64,
            candidate_value: age as f64,
            readiness_score: readiness,
        });
        if meets(readiness, config.target_readiness) {
            found = Some((age, readiness));
            break;
        }
    }

    let (solved_value, achieved_readiness, message) = match found {
        Some((age, readiness)) => (
            Some(age as f64),
            Some(readiness),
            format!("Earliest retirement age reaching the target is {age}."),
        ),
        None => (
            None,
            None,
            "No retirement age within the search bounds reaches the target.".to_string(),
        ),
    };

    GoalSolveResult {
        goal_type: GoalType::EarliestRetirement,
        target_readiness: config.target_readiness,
        solved_value,
        achieved_readiness,
        iterations,
        converged: found.is_some(),
        feasible: found.is_some(),
        message,
    }
}

pub fn solve_goal(
    inputs: &CanonicalInputs,
    returns: &ReturnAssumptions,
    config: GoalSolveConfig,
) -> Result<GoalSolveResult, SolveError> {
    validate_config(&config)?;
    Ok(match config.goal_type {
        GoalType::RequiredContribution => solve_required_contribution(inputs, returns, &config),
        GoalType::EarliestRetirement => solve_earliest_retirement(inputs, returns, &config),
    })
}
