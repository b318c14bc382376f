use arrow::array::{Array, Int64Array};
use arrow::datatypes::{DataType, Schema, SchemaRef};
use arrow::json::writer::{JsonArray, WriterBuilder};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use duckdb::Connection;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::db::DbError;
use crate::db::db_pool::{with_connection, DbPool};
use crate::query::classifier::strip_leading_comments;
use crate::query::reporter::{Row, StatementExecutor, StatementOutput};

// Statements DuckDB answers with a result set rather than a change count.
static ROW_RETURNING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\(?\s*(SELECT|WITH|SHOW|DESCRIBE|EXPLAIN|PRAGMA|SUMMARIZE|VALUES|FROM|TABLE)\b",
    )
    .unwrap()
});

/// DuckDB's result column for INSERT, UPDATE and DELETE without RETURNING.
const CHANGE_COUNT_COLUMN: &str = "Count";

pub fn returns_rows(sql: &str) -> bool {
    ROW_RETURNING.is_match(strip_leading_comments(sql))
}

/// Executes caller-supplied SQL against the pooled DuckDB database.
#[derive(Clone)]
pub struct DuckDbExecutor {
    pool: DbPool,
}

impl DuckDbExecutor {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatementExecutor for DuckDbExecutor {
    /// The result decides the shape: a change count for DML without
    /// `RETURNING` and for DDL, rows for everything else.
    async fn execute(&self, sql: &str) -> Result<StatementOutput, DbError> {
        let sql = sql.to_string();
        with_connection(&self.pool, move |conn| {
            let (schema, batches) = run_arrow(conn, &sql)?;
            let query_like = returns_rows(&sql);

            if !query_like {
                if let Some(affected) = change_count(&schema, &batches) {
                    return Ok(StatementOutput::Affected(affected));
                }
            }

            let rows = batches_to_rows(&batches)?;
            if !query_like && rows.is_empty() {
                // SET, CREATE and friends report a status column with no rows
                return Ok(StatementOutput::Affected(0));
            }

            Ok(StatementOutput::Rows { columns: column_names(&schema), rows })
        })
        .await
    }
}

/// Runs a row-returning statement and converts the Arrow result into JSON rows.
pub(crate) fn query_rows(conn: &Connection, sql: &str) -> Result<(Vec<String>, Vec<Row>), DbError> {
    let (schema, batches) = run_arrow(conn, sql)?;
    Ok((column_names(&schema), batches_to_rows(&batches)?))
}

fn run_arrow(conn: &Connection, sql: &str) -> Result<(SchemaRef, Vec<RecordBatch>), DbError> {
    let mut stmt = conn.prepare(sql).map_err(|e| DbError::Statement(e.to_string()))?;
    let arrow_batch = stmt
        .query_arrow([])
        .map_err(|e| DbError::Statement(e.to_string()))?;

    let schema = arrow_batch.get_schema();
    let record_batches = arrow_batch.collect::<Vec<RecordBatch>>();
    debug!(
        "Statement returned {} columns across {} batches",
        schema.fields().len(),
        record_batches.len()
    );

    Ok((schema, record_batches))
}

fn column_names(schema: &Schema) -> Vec<String> {
    schema.fields().iter().map(|field| field.name().clone()).collect()
}

/// Sum of the change-count column, or `None` when the result has another shape.
fn change_count(schema: &Schema, batches: &[RecordBatch]) -> Option<u64> {
    match &schema.fields()[..] {
        [] => Some(0),
        [field]
            if field.name() == CHANGE_COUNT_COLUMN && field.data_type() == &DataType::Int64 =>
        {
            let mut total = 0u64;
            for batch in batches {
                let counts = batch.column(0).as_any().downcast_ref::<Int64Array>()?;
                total += counts.iter().flatten().map(|n| n.max(0) as u64).sum::<u64>();
            }
            Some(total)
        }
        _ => None,
    }
}

fn batches_to_rows(batches: &[RecordBatch]) -> Result<Vec<Row>, DbError> {
    let mut writer = WriterBuilder::new()
        .with_explicit_nulls(true)
        .build::<_, JsonArray>(Vec::new());

    let batch_refs: Vec<&RecordBatch> = batches.iter().collect();
    writer.write_batches(&batch_refs)?;
    writer.finish()?;

    let buffer = writer.into_inner();
    if buffer.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(&buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::db_pool::memory_pool;
    use serde_json::json;

    async fn executor_with_users() -> DuckDbExecutor {
        let executor = DuckDbExecutor::new(memory_pool());
        executor
            .execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR, email VARCHAR)")
            .await
            .unwrap();
        executor
            .execute("INSERT INTO users VALUES (1, 'ada', 'ada@example.com'), (2, 'grace', NULL)")
            .await
            .unwrap();
        executor
    }

    #[test]
    fn test_returns_rows() {
        assert!(returns_rows("SELECT 1"));
        assert!(returns_rows("  with x as (select 1) select * from x"));
        assert!(returns_rows("SHOW TABLES"));
        assert!(returns_rows("(SELECT 1) UNION (SELECT 2)"));
        assert!(!returns_rows("INSERT INTO t VALUES (1)"));
        assert!(!returns_rows("CREATE TABLE t (a INT)"));
        assert!(!returns_rows("SELECTION"));
        assert!(returns_rows("-- list\nSELECT 1"));
        assert!(returns_rows("/* audit */ (SELECT 1)"));
        assert!(!returns_rows("-- SELECT\nINSERT INTO t VALUES (1)"));
    }

    #[tokio::test]
    async fn test_select_returns_ordered_rows_with_nulls() {
        let executor = executor_with_users().await;

        let output = executor
            .execute("SELECT id, name, email FROM users ORDER BY id")
            .await
            .unwrap();

        match output {
            StatementOutput::Rows { columns, rows } => {
                assert_eq!(columns, vec!["id", "name", "email"]);
                assert_eq!(rows.len(), 2);
                assert_eq!(
                    serde_json::Value::Object(rows[0].clone()),
                    json!({"id": 1, "name": "ada", "email": "ada@example.com"})
                );
                assert_eq!(rows[1]["email"], serde_json::Value::Null);
            }
            other => panic!("expected rows, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_result_has_columns() {
        let executor = executor_with_users().await;

        let output = executor.execute("SELECT name FROM users WHERE id > 10").await.unwrap();

        assert_eq!(
            output,
            StatementOutput::Rows { columns: vec!["name".to_string()], rows: vec![] }
        );
    }

    #[tokio::test]
    async fn test_update_reports_affected_rows() {
        let executor = executor_with_users().await;

        let output = executor.execute("UPDATE users SET name = upper(name)").await.unwrap();

        assert_eq!(output, StatementOutput::Affected(2));
    }

    #[tokio::test]
    async fn test_commented_select_returns_rows() {
        let executor = executor_with_users().await;

        let output = executor.execute("-- list\nSELECT * FROM users").await.unwrap();

        match output {
            StatementOutput::Rows { columns, rows } => {
                assert_eq!(columns, vec!["id", "name", "email"]);
                assert_eq!(rows.len(), 2);
            }
            other => panic!("expected rows, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_insert_returning_yields_rows() {
        let executor = executor_with_users().await;

        let output = executor
            .execute("INSERT INTO users VALUES (3, 'x', NULL) RETURNING id")
            .await
            .unwrap();

        assert_eq!(
            output,
            StatementOutput::Rows {
                columns: vec!["id".to_string()],
                rows: vec![json!({"id": 3}).as_object().unwrap().clone()],
            }
        );

        let count = executor.execute("SELECT COUNT(*) AS n FROM users").await.unwrap();
        match count {
            StatementOutput::Rows { rows, .. } => assert_eq!(rows[0]["n"], json!(3)),
            other => panic!("expected rows, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ddl_and_settings_report_no_rows() {
        let executor = executor_with_users().await;

        for sql in ["CREATE TABLE tags (name VARCHAR)", "SET threads = 2", "DROP TABLE tags"] {
            let output = executor.execute(sql).await.unwrap();
            assert_eq!(output, StatementOutput::Affected(0), "{}", sql);
        }
    }

    #[tokio::test]
    async fn test_backend_errors_carry_message() {
        let executor = executor_with_users().await;

        let err = executor.execute("SELECT * FROM missing_table").await.unwrap_err();

        assert!(matches!(err, DbError::Statement(ref msg) if msg.contains("missing_table")));
    }
}
