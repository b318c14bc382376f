use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::query::QueryError;
use crate::query::classifier::{self, Classification};
use crate::query::confirmation::{self, ConfirmationLevel, ConfirmationOutcome};
use crate::query::reporter::{self, ExecutionResult, StatementExecutor};
use crate::query::sanitizer::sanitize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    #[serde(default)]
    pub sql: String,
    #[serde(default)]
    pub analyst_mode: bool,
    #[serde(default)]
    pub confirmation_level: ConfirmationLevel,
}

/// Result of gating a statement, before anything touches the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Authorized {
        sql: String,
    },
    NeedsConfirmation {
        sql: String,
        next_level: ConfirmationLevel,
        warning: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Executed(ExecutionResult),
    NeedsConfirmation {
        sql: String,
        next_level: ConfirmationLevel,
        warning: &'static str,
    },
}

/// Sanitizes, applies analyst mode, then the confirmation gate. Pure.
pub fn prepare_execution(
    sql: &str,
    analyst_mode: bool,
    level: ConfirmationLevel,
) -> Result<Authorization, QueryError> {
    let sql = sanitize(sql)?;
    let classification = Classification::of(&sql);

    confirmation::check_analyst_mode(&classification, analyst_mode)?;

    Ok(match confirmation::next_step(&classification, level) {
        ConfirmationOutcome::Execute => Authorization::Authorized { sql },
        ConfirmationOutcome::Warn { level, message } => Authorization::NeedsConfirmation {
            sql,
            next_level: level,
            warning: message,
        },
    })
}

/// Authorized SQL, or the confirmation outcome to hand back instead.
fn authorize(request: &ExecutionRequest) -> Result<Result<String, ExecutionOutcome>, QueryError> {
    let level = request.confirmation_level;
    match prepare_execution(&request.sql, request.analyst_mode, level)? {
        Authorization::Authorized { sql } => Ok(Ok(sql)),
        Authorization::NeedsConfirmation { sql, next_level, warning } => {
            warn!("Dangerous statement held at confirmation level {}", u8::from(level));
            Ok(Err(ExecutionOutcome::NeedsConfirmation { sql, next_level, warning }))
        }
    }
}

/// The execute-SQL flow, wired to one executor.
#[derive(Clone)]
pub struct ExecutionPipeline {
    executor: Arc<dyn StatementExecutor>,
}

impl ExecutionPipeline {
    pub fn new(executor: Arc<dyn StatementExecutor>) -> Self {
        Self { executor }
    }

    pub async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionOutcome, QueryError> {
        match authorize(request)? {
            Ok(sql) => {
                info!("Statement authorized for execution");
                let result = self.execute_authorized(&sql).await?;
                Ok(ExecutionOutcome::Executed(result))
            }
            Err(held) => Ok(held),
        }
    }

    /// Plans the statement with `EXPLAIN` after the same gates as `run`.
    /// Profiling forms are refused outright since they execute the statement.
    pub async fn analyze(
        &self,
        request: &ExecutionRequest,
    ) -> Result<ExecutionOutcome, QueryError> {
        let sql = sanitize(&request.sql)?;
        if classifier::is_profiling(&sql) {
            warn!("Refusing to analyze a profiling statement");
            return Err(QueryError::ProfiledStatement);
        }

        match authorize(request)? {
            Ok(sql) => {
                let plan = self.execute_authorized(&format!("EXPLAIN {}", sql)).await?;
                Ok(ExecutionOutcome::Executed(plan))
            }
            Err(held) => Ok(held),
        }
    }

    pub async fn execute_authorized(&self, sql: &str) -> Result<ExecutionResult, QueryError> {
        reporter::execute_authorized(self.executor.as_ref(), sql).await
    }
}
