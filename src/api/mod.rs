use axum::{
    Router,
    extract::{Json, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    FinancialInputs, GoalSolveConfig, GoalSolveResult, HealthScore, NormalizedInputs, PlanReport,
    ProjectionResult, ResolvedReturns, SolveError, normalize_inputs, plan_retirement,
    project_retirement, resolve_returns, returns_for, score_financial_health, solve_goal,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid JSON body: {0}")]
    Body(#[from] JsonRejection),
    #[error("request body must be a JSON object of input fields")]
    NotAnObject,
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error(transparent)]
    Solve(#[from] SolveError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(error = %self, "rejected API request");
        error_response(StatusCode::BAD_REQUEST, &self.to_string())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    returns: ResolvedReturns,
    projection: ProjectionResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveResponse {
    returns: ResolvedReturns,
    goal: GoalSolveResult,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

fn inputs_from_value(value: Value) -> Result<FinancialInputs, ApiError> {
    FinancialInputs::from_value(value).ok_or(ApiError::NotAnObject)
}

fn normalize_request(value: Value) -> Result<NormalizedInputs, ApiError> {
    Ok(normalize_inputs(&inputs_from_value(value)?))
}

fn returns_request(value: Value) -> Result<ResolvedReturns, ApiError> {
    let raw = inputs_from_value(value)?;
    let horizon_years = match raw.get("horizonYears") {
        Some(value) => serde_json::from_value::<Option<u32>>(value.clone()).map_err(|e| {
            ApiError::InvalidField {
                field: "horizonYears",
                reason: e.to_string(),
            }
        })?,
        None => None,
    };
    let inputs = normalize_inputs(&raw).inputs;
    let horizon = horizon_years.unwrap_or_else(|| inputs.primary.years_to_retirement());
    Ok(resolve_returns(&inputs.scenario, &inputs.allocation, Some(horizon)))
}

fn project_request(value: Value) -> Result<ProjectResponse, ApiError> {
    let inputs = normalize_request(value)?.inputs;
    let returns = returns_for(&inputs);
    let projection = project_retirement(&inputs, &returns.assumptions, inputs.partner.as_ref());
    Ok(ProjectResponse {
        returns,
        projection,
    })
}

fn score_request(value: Value) -> Result<HealthScore, ApiError> {
    let inputs = normalize_request(value)?.inputs;
    Ok(score_financial_health(&inputs, None))
}

fn plan_request(value: Value) -> Result<PlanReport, ApiError> {
    Ok(plan_retirement(&inputs_from_value(value)?))
}

fn solve_request(mut value: Value) -> Result<SolveResponse, ApiError> {
    let goal = match value.as_object_mut().and_then(|fields| fields.remove("goal")) {
        Some(goal) => {
            serde_json::from_value::<GoalSolveConfig>(goal).map_err(|e| ApiError::InvalidField {
                field: "goal",
                reason: e.to_string(),
            })?
        }
        None => GoalSolveConfig::default(),
    };
    let inputs = normalize_request(value)?.inputs;
    let returns = returns_for(&inputs);
    let result = solve_goal(&inputs, &returns.assumptions, goal)?;
    Ok(SolveResponse {
        returns,
        goal: result,
    })
}

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/normalize", post(normalize_handler))
        .route("/api/returns", post(returns_handler))
        .route("/api/project", post(project_handler))
        .route("/api/score", post(score_handler))
        .route("/api/plan", post(plan_handler))
        .route("/api/solve", post(solve_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "retirement planner API listening");

    axum::serve(listener, router()).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn normalize_handler(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    Ok(json_response(StatusCode::OK, normalize_request(payload)?))
}

async fn returns_handler(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    Ok(json_response(StatusCode::OK, returns_request(payload)?))
}

async fn project_handler(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    Ok(json_response(StatusCode::OK, project_request(payload)?))
}

async fn score_handler(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    Ok(json_response(StatusCode::OK, score_request(payload)?))
}

async fn plan_handler(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    Ok(json_response(StatusCode::OK, plan_request(payload)?))
}

async fn solve_handler(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    Ok(json_response(StatusCode::OK, solve_request(payload)?))
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
