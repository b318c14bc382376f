pub mod db_pool;
pub mod db_utils;
pub mod executor;
pub mod schema;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Database error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Failed to convert result set: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Failed to convert result set: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Invalid identifier '{0}': use letters, digits and underscores")]
    InvalidIdentifier(String),

    #[error("{0}")]
    InvalidDefinition(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    /// A statement the caller supplied was rejected by DuckDB.
    #[error("{0}")]
    Statement(String),
}
