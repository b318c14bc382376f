//! Query-safety pipeline: everything that decides whether a SQL statement
//! may reach the database.
//!
//! Order on the execute path is fixed: sanitize, analyst-mode check,
//! confirmation gate, then the executor. Nothing here holds state between
//! calls; the caller carries the confirmation level.

pub mod classifier;
pub mod confirmation;
pub mod pipeline;
pub mod reporter;
pub mod sanitizer;

use thiserror::Error;

/// Failures of the generate/execute pipelines.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("SQL query is required")]
    EmptyStatement,

    #[error("Multiple SQL statements are not allowed")]
    MultiStatement,

    #[error("Analyst mode only allows SELECT queries")]
    AnalystModeViolation,

    #[error("Only plain statements can be analyzed; ANALYZE runs the statement")]
    ProfiledStatement,

    #[error("Invalid confirmation level {0}, expected 0, 1 or 2")]
    InvalidConfirmationLevel(u8),

    #[error("Failed to generate SQL query. Please check your AI API key or try a simpler query.")]
    GenerationFailed,

    /// The database rejected the statement. Carries the backend message as-is.
    #[error("{0}")]
    SqlExecution(String),
}
