//! Structured table operations: DDL assembly, parameterized inserts and
//! paging. Every identifier is validated and double-quoted before it is
//! spliced into SQL; values always travel as bound parameters.

use duckdb::types::Value;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::info;

use crate::db::DbError;
use crate::db::db_pool::{with_connection, DbPool};
use crate::db::executor::query_rows;
use crate::query::reporter::Row;

pub const MAX_PAGE_SIZE: u64 = 1000;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

// VARCHAR, DECIMAL(10, 2), INTEGER[], DOUBLE PRECISION, ...
static COLUMN_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_ ]*(\(\s*\d+\s*(,\s*\d+\s*)?\))?(\[\])?$").unwrap()
});

pub fn validate_identifier(name: &str) -> Result<&str, DbError> {
    if IDENTIFIER.is_match(name) {
        Ok(name)
    } else {
        Err(DbError::InvalidIdentifier(name.to_string()))
    }
}

pub fn quote_identifier(name: &str) -> Result<String, DbError> {
    Ok(format!("\"{}\"", validate_identifier(name)?))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyDefinition {
    pub column: String,
    pub reference_table: String,
    pub reference_column: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDefinition {
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub columns: Vec<ColumnDefinition>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyDefinition>,
}

fn sequence_name(table: &str, column: &str) -> String {
    format!("{}_{}_seq", table, column)
}

fn render_default(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(format!("'{}'", s.replace('\'', "''"))),
        serde_json::Value::Bool(b) => Some(b.to_string().to_uppercase()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        other => Some(format!("'{}'", other.to_string().replace('\'', "''"))),
    }
}

/// Builds the statements for a table definition: one `CREATE SEQUENCE` per
/// auto-increment column, then the `CREATE TABLE`, which comes last.
pub fn create_table_statements(definition: &TableDefinition) -> Result<Vec<String>, DbError> {
    if definition.table_name.is_empty() || definition.columns.is_empty() {
        return Err(DbError::InvalidDefinition(
            "Table name and columns are required".to_string(),
        ));
    }

    let table = validate_identifier(&definition.table_name)?;
    let mut statements = Vec::new();
    let mut parts = Vec::new();

    for column in &definition.columns {
        let name = quote_identifier(&column.name)?;
        if !COLUMN_TYPE.is_match(column.data_type.trim()) {
            return Err(DbError::InvalidDefinition(format!(
                "Invalid type '{}' for column '{}'",
                column.data_type, column.name
            )));
        }

        let mut def = format!("{} {}", name, column.data_type.trim());
        if column.primary_key {
            def.push_str(" PRIMARY KEY");
        }
        if column.auto_increment {
            let sequence = sequence_name(table, &column.name);
            statements.push(format!("CREATE SEQUENCE IF NOT EXISTS \"{}\"", sequence));
            def.push_str(&format!(" DEFAULT nextval('{}')", sequence));
        } else if let Some(default) = column.default.as_ref().and_then(render_default) {
            def.push_str(&format!(" DEFAULT {}", default));
        }
        if column.not_null {
            def.push_str(" NOT NULL");
        }
        if column.unique {
            def.push_str(" UNIQUE");
        }
        parts.push(def);
    }

    for fk in &definition.foreign_keys {
        parts.push(format!(
            "FOREIGN KEY ({}) REFERENCES {}({})",
            quote_identifier(&fk.column)?,
            quote_identifier(&fk.reference_table)?,
            quote_identifier(&fk.reference_column)?
        ));
    }

    statements.push(format!("CREATE TABLE \"{}\" ({})", table, parts.join(", ")));
    Ok(statements)
}

/// Executes the definition and returns the `CREATE TABLE` text.
pub async fn create_table(pool: &DbPool, definition: &TableDefinition) -> Result<String, DbError> {
    let statements = create_table_statements(definition)?;
    let create_sql = statements.last().cloned().unwrap_or_default();

    with_connection(pool, move |conn| {
        let tx = conn.transaction()?;
        for sql in &statements {
            tx.execute(sql, []).map_err(|e| DbError::Statement(e.to_string()))?;
        }
        tx.commit()?;
        Ok(())
    })
    .await?;

    info!("Created table: {}", create_sql);
    Ok(create_sql)
}

fn json_to_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::BigInt(i),
            None => Value::Double(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

pub fn insert_statement(table: &str, data: &Row) -> Result<(String, Vec<Value>), DbError> {
    if data.is_empty() {
        return Err(DbError::InvalidDefinition(
            "Table name and data are required".to_string(),
        ));
    }

    let columns = data
        .keys()
        .map(|column| quote_identifier(column))
        .collect::<Result<Vec<String>, DbError>>()?;
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table)?,
        columns.join(", "),
        placeholders
    );

    Ok((sql, data.values().map(json_to_value).collect()))
}

pub async fn insert_row(pool: &DbPool, table: &str, data: &Row) -> Result<u64, DbError> {
    let (sql, values) = insert_statement(table, data)?;

    with_connection(pool, move |conn| {
        let affected = conn
            .execute(&sql, duckdb::params_from_iter(values))
            .map_err(|e| DbError::Statement(e.to_string()))?;
        Ok(affected as u64)
    })
    .await
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TablePage {
    pub rows: Vec<Row>,
    pub pagination: Pagination,
}

pub async fn fetch_page(
    pool: &DbPool,
    table: &str,
    page: u64,
    limit: u64,
) -> Result<TablePage, DbError> {
    let table = quote_identifier(table)?;
    let page = page.max(1);
    let limit = limit.clamp(1, MAX_PAGE_SIZE);
    // DuckDB takes OFFSET as a signed 64-bit value
    let offset = (page - 1)
        .checked_mul(limit)
        .filter(|offset| *offset <= i64::MAX as u64)
        .ok_or_else(|| DbError::InvalidDefinition(format!("Page {} is out of range", page)))?;

    with_connection(pool, move |conn| {
        let total: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        let sql = format!("SELECT * FROM {} LIMIT {} OFFSET {}", table, limit, offset);
        let (_, rows) = query_rows(conn, &sql)?;
        let total = total.max(0) as u64;

        Ok(TablePage {
            rows,
            pagination: Pagination {
                total,
                page,
                limit,
                total_pages: total.div_ceil(limit),
            },
        })
    })
    .await
}
