use async_trait::async_trait;
use serde::Serialize;
use std::time::Instant;
use tracing::{error, info};

use crate::db::DbError;
use crate::query::QueryError;
use crate::query::classifier::is_modification;

pub type Row = serde_json::Map<String, serde_json::Value>;

/// What the database handed back for one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutput {
    Rows { columns: Vec<String>, rows: Vec<Row> },
    Affected(u64),
}

/// Runs one statement. Implementations must not retry: statements such as
/// `INSERT` are not idempotent.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<StatementOutput, DbError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultData {
    Rows(Vec<Row>),
    #[serde(rename_all = "camelCase")]
    Affected { affected_rows: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub data: ResultData,
    pub columns: Vec<String>,
    pub row_count: u64,
    pub execution_time_ms: u64,
    pub is_modification: bool,
}

/// Executes an already authorized statement and times the single backend call.
///
/// `is_modification` comes from the leading keyword of `sql`, not from the
/// dangerous-statement classification.
pub async fn execute_authorized(
    executor: &dyn StatementExecutor,
    sql: &str,
) -> Result<ExecutionResult, QueryError> {
    let start_time = Instant::now();
    let output = executor.execute(sql).await;
    let execution_time_ms = start_time.elapsed().as_millis() as u64;

    let output = output.map_err(|e| {
        error!("Statement failed after {}ms: {}", execution_time_ms, e);
        QueryError::SqlExecution(e.to_string())
    })?;

    let (data, columns, row_count) = match output {
        StatementOutput::Rows { columns, rows } => {
            let count = rows.len() as u64;
            (ResultData::Rows(rows), columns, count)
        }
        StatementOutput::Affected(affected_rows) => {
            (ResultData::Affected { affected_rows }, Vec::new(), affected_rows)
        }
    };

    info!(
        "Query executed successfully. Row count: {}, Execution time: {}ms",
        row_count, execution_time_ms
    );

    Ok(ExecutionResult {
        data,
        columns,
        row_count,
        execution_time_ms,
        is_modification: is_modification(sql),
    })
}
