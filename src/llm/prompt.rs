/// Assembles the text-generation prompt.
///
/// `question` is used verbatim; feedback has already been folded into it by
/// the caller. The previous-query block only appears when one is given.
pub fn build_prompt(question: &str, schema_context: &str, previous_query: Option<&str>) -> String {
    let mut prompt = format!(
        r#"You are an expert DuckDB query generator. Your task is to convert natural language questions into valid DuckDB SQL queries.

DATABASE SCHEMA:
{}

IMPORTANT INSTRUCTIONS:
1. Generate ONLY valid DuckDB SQL syntax
2. Use proper JOIN syntax when joining tables
3. Use table aliases for better readability
4. Always include a semicolon at the end of the query
5. For aggregate functions, use proper GROUP BY clauses
6. RESPOND IN THIS EXACT FORMAT (no extra text):

SQL: <the sql query>
EXPLANATION: <one line explanation of what the query does>

"#,
        schema_context
    );

    if let Some(previous) = previous_query.map(str::trim).filter(|q| !q.is_empty()) {
        prompt.push_str(&format!("PREVIOUS QUERY FOR CONTEXT:\n{}\n\n", previous));
    }

    prompt.push_str(&format!(
        "USER QUESTION: {}\n\nNow generate the DuckDB query and explanation:",
        question
    ));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = "Available tables:\n\nusers:\n  - id (INTEGER) PRIMARY KEY\n";

    #[test]
    fn test_contains_contract_and_schema() {
        let prompt = build_prompt("list users", SCHEMA, None);

        assert!(prompt.contains("SQL: <the sql query>"));
        assert!(prompt.contains("EXPLANATION: <one line explanation"));
        assert!(prompt.contains(SCHEMA));
        assert!(!prompt.contains("PREVIOUS QUERY"));
        assert!(prompt.trim_end().ends_with("Now generate the DuckDB query and explanation:"));
    }

    #[test]
    fn test_question_comes_last() {
        let prompt =
            build_prompt("count orders\nUser feedback: per day", SCHEMA, Some("SELECT 1;"));

        let previous_at = prompt.find("PREVIOUS QUERY FOR CONTEXT:\nSELECT 1;").unwrap();
        let question_at =
            prompt.find("USER QUESTION: count orders\nUser feedback: per day").unwrap();
        let schema_at = prompt.find(SCHEMA).unwrap();
        assert!(schema_at < previous_at && previous_at < question_at);
    }

    #[test]
    fn test_blank_previous_query_is_skipped() {
        assert!(!build_prompt("q", SCHEMA, Some("   ")).contains("PREVIOUS QUERY"));
    }
}
