//! Natural language in, SQL out, with the rule-based fallback behind it.

use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::DbError;
use crate::db::schema::{render_schema_context, SchemaProvider, TableSchema};
use crate::llm::fallback::generate_fallback;
use crate::llm::models::{GeneratedQuery, GenerationRequest};
use crate::llm::parser::{parse_response, ParseError};
use crate::llm::prompt::build_prompt;
use crate::llm::{LlmError, TextGenerator};
use crate::query::QueryError;

/// Why the generator path did not produce SQL. Only logged; the caller sees
/// either the fallback result or `GenerationFailed`.
#[derive(Debug, Error)]
enum GenerationStepError {
    #[error("schema lookup failed: {0}")]
    Schema(#[from] DbError),
    #[error("text generation failed: {0}")]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Clone)]
pub struct QueryGenerator {
    schema: Arc<dyn SchemaProvider>,
    llm: Arc<dyn TextGenerator>,
}

impl QueryGenerator {
    pub fn new(schema: Arc<dyn SchemaProvider>, llm: Arc<dyn TextGenerator>) -> Self {
        Self { schema, llm }
    }

    /// One generator call, no retry. Any failure goes straight to the
    /// fallback with whatever table names were fetched before it.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedQuery, QueryError> {
        info!("Generating SQL for: {}", request.natural_language);

        let mut known_tables = Vec::new();
        match self.generate_with_llm(request, &mut known_tables).await {
            Ok(query) => Ok(query),
            Err(e) => {
                warn!("Falling back to rule-based generation: {}", e);
                let fallback = generate_fallback(&request.natural_language, &known_tables);
                if fallback.sql.is_none() {
                    error!("Fallback produced no SQL for: {}", request.natural_language);
                    return Err(QueryError::GenerationFailed);
                }
                Ok(fallback)
            }
        }
    }

    async fn generate_with_llm(
        &self,
        request: &GenerationRequest,
        known_tables: &mut Vec<String>,
    ) -> Result<GeneratedQuery, GenerationStepError> {
        *known_tables = self.schema.list_tables().await?;

        let mut tables = Vec::with_capacity(known_tables.len());
        for name in known_tables.iter() {
            let columns = self.schema.describe_table(name).await?;
            tables.push(TableSchema { name: name.clone(), columns });
        }
        let schema_context = render_schema_context(&tables);

        let prompt = build_prompt(
            &request.enhanced_question(),
            &schema_context,
            request.previous_query.as_deref(),
        );

        let response = self.llm.generate(&prompt).await?;
        Ok(parse_response(&response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::ColumnInfo;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StaticSchema {
        tables: Vec<&'static str>,
        fail: bool,
    }

    #[async_trait]
    impl SchemaProvider for StaticSchema {
        async fn list_tables(&self) -> Result<Vec<String>, DbError> {
            if self.fail {
                return Err(DbError::Statement("catalog unavailable".into()));
            }
            Ok(self.tables.iter().map(|t| t.to_string()).collect())
        }

        async fn describe_table(&self, _table: &str) -> Result<Vec<ColumnInfo>, DbError> {
            Ok(vec![ColumnInfo {
                field_name: "id".into(),
                data_type: "INTEGER".into(),
                key_role: Some("PRI".into()),
                nullable: false,
            }])
        }
    }

    /// Replies with a fixed script and keeps every prompt it was sent.
    struct ScriptedGenerator {
        reply: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self { reply: Ok(text.to_string()), prompts: Mutex::new(Vec::new()) })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err("connection refused".into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(LlmError::ConnectionError)
        }
    }

    fn generator(llm: Arc<ScriptedGenerator>, fail_schema: bool) -> QueryGenerator {
        let schema = StaticSchema { tables: vec!["users", "orders"], fail: fail_schema };
        QueryGenerator::new(Arc::new(schema), llm)
    }

    fn ask(text: &str) -> GenerationRequest {
        GenerationRequest { natural_language: text.to_string(), ..Default::default() }
    }

    #[tokio::test]
    async fn test_parsed_generator_reply() {
        let llm = ScriptedGenerator::replying(
            "SQL: SELECT COUNT(*) FROM users;\nEXPLANATION: Counts users.",
        );
        let query = generator(llm.clone(), false).generate(&ask("how many users")).await.unwrap();

        assert_eq!(query.sql.as_deref(), Some("SELECT COUNT(*) FROM users;"));
        assert_eq!(query.explanation, "Counts users.");
        assert!(!query.is_fallback);

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("users:\n  - id (INTEGER) PRIMARY KEY"));
        assert!(prompts[0].contains("USER QUESTION: how many users"));
    }

    #[tokio::test]
    async fn test_prompt_carries_feedback_and_previous_query() {
        let llm = ScriptedGenerator::replying("SQL: SELECT 1;");
        let request = GenerationRequest {
            natural_language: "orders per day".into(),
            previous_query: Some("SELECT * FROM orders;".into()),
            feedback: Some("only 2024".into()),
        };

        generator(llm.clone(), false).generate(&request).await.unwrap();

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("PREVIOUS QUERY FOR CONTEXT:\nSELECT * FROM orders;"));
        assert!(prompt.contains("USER QUESTION: orders per day\nUser feedback: only 2024"));
    }

    #[tokio::test]
    async fn test_unparseable_reply_uses_fallback_without_retry() {
        let llm = ScriptedGenerator::replying("I am not sure what you mean.");
        let query = generator(llm.clone(), false).generate(&ask("show all users")).await.unwrap();

        assert_eq!(query.sql.as_deref(), Some("SELECT * FROM users LIMIT 100;"));
        assert!(query.is_fallback);
        assert_eq!(llm.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_ignores_feedback() {
        let llm = ScriptedGenerator::failing();
        let request = GenerationRequest {
            natural_language: "get all orders".into(),
            feedback: Some("mention users".into()),
            ..Default::default()
        };

        let query = generator(llm, false).generate(&request).await.unwrap();

        assert_eq!(query.sql.as_deref(), Some("SELECT * FROM orders LIMIT 100;"));
    }

    #[tokio::test]
    async fn test_no_fallback_is_generation_failure() {
        let llm = ScriptedGenerator::failing();
        let result = generator(llm.clone(), false).generate(&ask("average order value")).await;

        assert!(matches!(result, Err(QueryError::GenerationFailed)));
        assert_eq!(llm.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_schema_failure_falls_back_with_no_tables() {
        let llm = ScriptedGenerator::replying("SQL: SELECT 1;");
        let result = generator(llm.clone(), true).generate(&ask("show all users")).await;

        assert!(matches!(result, Err(QueryError::GenerationFailed)));
        assert!(llm.prompts().is_empty());
    }
}
