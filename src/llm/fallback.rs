use tracing::{info, warn};

use crate::llm::models::GeneratedQuery;

/// Row cap applied to every fallback query.
pub const FALLBACK_ROW_LIMIT: usize = 100;

const NO_SQL_EXPLANATION: &str =
    "Could not generate SQL query. Please try rephrasing your request.";

const LIST_ALL_PHRASES: [&str; 2] = ["show all", "get all"];

/// Rule-based stand-in used when the text generator path fails.
///
/// Only "show all <table>" / "get all <table>" requests are answered; the
/// first table in `known_tables` whose name appears in the request wins.
pub fn generate_fallback(natural_language: &str, known_tables: &[String]) -> GeneratedQuery {
    let request = natural_language.to_lowercase();

    if LIST_ALL_PHRASES.iter().any(|phrase| request.contains(phrase)) {
        if let Some(table) = known_tables
            .iter()
            .find(|table| request.contains(&table.to_lowercase()))
        {
            info!("Fallback generator matched table '{}'", table);
            return GeneratedQuery {
                sql: Some(format!("SELECT * FROM {} LIMIT {};", table, FALLBACK_ROW_LIMIT)),
                explanation: format!(
                    "This will retrieve all records from the {} table (limited to {} rows).",
                    table, FALLBACK_ROW_LIMIT
                ),
                is_fallback: true,
            };
        }
    }

    warn!("Fallback generator found no applicable rule");
    GeneratedQuery {
        sql: None,
        explanation: NO_SQL_EXPLANATION.to_string(),
        is_fallback: true,
    }
}
