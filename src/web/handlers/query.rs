use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::llm::models::{GeneratedQuery, GenerationRequest};
use crate::query::confirmation::ConfirmationLevel;
use crate::query::pipeline::{ExecutionOutcome, ExecutionRequest};
use crate::query::reporter::ExecutionResult;
use crate::util::logging::truncate_for_log;
use crate::web::error::ApiError;
use crate::web::handlers::ApiResponse;
use crate::web::state::AppState;

const LOGGED_SQL_CHARS: usize = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQueryData {
    #[serde(flatten)]
    pub query: GeneratedQuery,
    pub natural_language: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResponse {
    pub success: bool,
    pub needs_confirmation: bool,
    pub is_dangerous: bool,
    pub confirmation_level: ConfirmationLevel,
    pub warning: &'static str,
    pub sql: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResponse {
    pub success: bool,
    #[serde(flatten)]
    pub result: ExecutionResult,
    pub execution_time: String,
}

pub async fn generate_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<GeneratedQueryData>>, ApiError> {
    let Json(request) = payload?;
    if request.natural_language.trim().is_empty() {
        return Err(ApiError::BadRequest("Natural language query is required".to_string()));
    }

    let query = state.generator.generate(&request).await?;

    Ok(Json(ApiResponse::ok(GeneratedQueryData {
        query,
        natural_language: request.natural_language,
    })))
}

pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExecutionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    info!(
        "Executing SQL query: {} (analyst mode: {}, confirmation level: {})",
        truncate_for_log(&request.sql, LOGGED_SQL_CHARS),
        request.analyst_mode,
        u8::from(request.confirmation_level)
    );

    let response = match state.pipeline.run(&request).await? {
        ExecutionOutcome::Executed(result) => Json(ExecutionResponse {
            success: true,
            execution_time: format!("{}ms", result.execution_time_ms),
            result,
        })
        .into_response(),
        ExecutionOutcome::NeedsConfirmation { sql, next_level, warning } => {
            confirmation_response(sql, next_level, warning)
        }
    };

    Ok(response)
}

/// Returns DuckDB's plan for a statement. Takes the same payload and gates
/// as execute; a held statement gets the confirmation response instead.
pub async fn analyze_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExecutionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    info!("Analyzing SQL query: {}", truncate_for_log(&request.sql, LOGGED_SQL_CHARS));

    let response = match state.pipeline.analyze(&request).await? {
        ExecutionOutcome::Executed(plan) => Json(ApiResponse::ok(plan.data)).into_response(),
        ExecutionOutcome::NeedsConfirmation { sql, next_level, warning } => {
            confirmation_response(sql, next_level, warning)
        }
    };

    Ok(response)
}

fn confirmation_response(
    sql: String,
    next_level: ConfirmationLevel,
    warning: &'static str,
) -> Response {
    Json(ConfirmationResponse {
        success: false,
        needs_confirmation: true,
        is_dangerous: true,
        confirmation_level: next_level,
        warning,
        sql,
    })
    .into_response()
}
