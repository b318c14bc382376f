use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::debug;

use crate::db::DbError;
use crate::db::db_pool::{with_connection, DbPool};
use crate::db::db_utils::{quote_identifier, validate_identifier};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub field_name: String,
    pub data_type: String,
    /// `PRI` for primary key columns, `UNI` for unique ones.
    pub key_role: Option<String>,
    pub nullable: bool,
}

impl ColumnInfo {
    pub fn is_primary_key(&self) -> bool {
        self.key_role.as_deref() == Some("PRI")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

/// Read access to the database catalog.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    async fn list_tables(&self) -> Result<Vec<String>, DbError>;

    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnInfo>, DbError>;
}

/// Describes every table, in catalog order.
pub async fn load_schema(provider: &dyn SchemaProvider) -> Result<Vec<TableSchema>, DbError> {
    let mut tables = Vec::new();
    for name in provider.list_tables().await? {
        let columns = provider.describe_table(&name).await?;
        tables.push(TableSchema { name, columns });
    }
    debug!("Loaded schema for {} tables", tables.len());
    Ok(tables)
}

/// Plain-text schema block handed to the text generator.
pub fn render_schema_context(tables: &[TableSchema]) -> String {
    let mut context = String::from("Available tables:\n");

    for table in tables {
        context.push_str(&format!("\n{}:\n", table.name));
        for column in &table.columns {
            let key = if column.is_primary_key() { " PRIMARY KEY" } else { "" };
            context.push_str(&format!("  - {} ({}){}\n", column.field_name, column.data_type, key));
        }
    }

    context
}

pub struct DuckDbSchema {
    pool: DbPool,
}

impl DuckDbSchema {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Fails with `TableNotFound` unless `table` is a valid, existing table name.
    pub async fn ensure_table(&self, table: &str) -> Result<(), DbError> {
        validate_identifier(table)?;
        if self.list_tables().await?.iter().any(|t| t == table) {
            Ok(())
        } else {
            Err(DbError::TableNotFound(table.to_string()))
        }
    }

    pub async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>, DbError> {
        self.ensure_table(table).await?;

        let table = table.to_string();
        with_connection(&self.pool, move |conn| {
            let mut stmt = conn.prepare(
                "SELECT constraint_text FROM duckdb_constraints() \
                 WHERE table_name = ? AND constraint_type = 'FOREIGN KEY'",
            )?;
            let texts = stmt
                .query_map(duckdb::params![table], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<String>, _>>()?;

            Ok(texts.iter().flat_map(|text| parse_foreign_key(text)).collect())
        })
        .await
    }
}

#[async_trait]
impl SchemaProvider for DuckDbSchema {
    async fn list_tables(&self) -> Result<Vec<String>, DbError> {
        with_connection(&self.pool, |conn| {
            let mut stmt = conn.prepare("SHOW TABLES")?;
            let tables = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(tables)
        })
        .await
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnInfo>, DbError> {
        let sql = format!("DESCRIBE {}", quote_identifier(table)?);
        with_connection(&self.pool, move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let columns = stmt
                .query_map([], |row| {
                    Ok(ColumnInfo {
                        field_name: row.get(0)?,
                        data_type: row.get(1)?,
                        nullable: row.get::<_, Option<String>>(2)?.as_deref() != Some("NO"),
                        key_role: row.get::<_, Option<String>>(3)?,
                    })
                })?
                .collect::<Result<Vec<ColumnInfo>, _>>()?;
            Ok(columns)
        })
        .await
    }
}

static FOREIGN_KEY_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)FOREIGN\s+KEY\s*\(([^)]*)\)\s*REFERENCES\s+([\w."]+)\s*\(([^)]*)\)"#).unwrap()
});

fn unquote(name: &str) -> String {
    name.trim().trim_matches('"').to_string()
}

/// Splits DuckDB's `FOREIGN KEY (a, b) REFERENCES t(x, y)` text into column pairs.
fn parse_foreign_key(text: &str) -> Vec<ForeignKey> {
    let Some(caps) = FOREIGN_KEY_TEXT.captures(text) else {
        return Vec::new();
    };

    let referenced_table = caps[2].rsplit('.').next().map(unquote).unwrap_or_default();
    caps[1]
        .split(',')
        .zip(caps[3].split(','))
        .map(|(column, referenced)| ForeignKey {
            column: unquote(column),
            referenced_table: referenced_table.clone(),
            referenced_column: unquote(referenced),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::db_pool::memory_pool;

    async fn shop_schema() -> DuckDbSchema {
        let pool = memory_pool();
        with_connection(&pool, |conn| {
            conn.execute_batch(
                "CREATE TABLE customers (id INTEGER PRIMARY KEY, name VARCHAR NOT NULL);
                 CREATE TABLE orders (
                     id INTEGER PRIMARY KEY,
                     customer_id INTEGER REFERENCES customers(id),
                     total DECIMAL(10, 2)
                 );",
            )?;
            Ok(())
        })
        .await
        .unwrap();
        DuckDbSchema::new(pool)
    }

    #[tokio::test]
    async fn test_lists_and_describes_tables() {
        let schema = shop_schema().await;

        let mut tables = schema.list_tables().await.unwrap();
        tables.sort();
        assert_eq!(tables, vec!["customers", "orders"]);

        let columns = schema.describe_table("customers").await.unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].field_name, "id");
        assert_eq!(columns[0].data_type, "INTEGER");
        assert!(columns[0].is_primary_key());
        assert!(!columns[1].is_primary_key());
        assert!(!columns[1].nullable);
    }

    #[tokio::test]
    async fn test_reads_foreign_keys() {
        let schema = shop_schema().await;

        let keys = schema.foreign_keys("orders").await.unwrap();

        assert_eq!(
            keys,
            vec![ForeignKey {
                column: "customer_id".into(),
                referenced_table: "customers".into(),
                referenced_column: "id".into(),
            }]
        );
        assert!(matches!(
            schema.foreign_keys("nope").await,
            Err(DbError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_parse_composite_foreign_key() {
        let keys = parse_foreign_key(r#"FOREIGN KEY ("a", b) REFERENCES main."other"(x, "y")"#);
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].column, "a");
        assert_eq!(keys[0].referenced_table, "other");
        assert_eq!(keys[1].referenced_column, "y");
    }

    #[test]
    fn test_render_schema_context() {
        let tables = vec![TableSchema {
            name: "users".into(),
            columns: vec![
                ColumnInfo {
                    field_name: "id".into(),
                    data_type: "INTEGER".into(),
                    key_role: Some("PRI".into()),
                    nullable: false,
                },
                ColumnInfo {
                    field_name: "email".into(),
                    data_type: "VARCHAR".into(),
                    key_role: None,
                    nullable: true,
                },
            ],
        }];

        assert_eq!(
            render_schema_context(&tables),
            "Available tables:\n\nusers:\n  - id (INTEGER) PRIMARY KEY\n  - email (VARCHAR)\n"
        );
    }
}
