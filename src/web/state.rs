use crate::config::AppConfig;
use crate::db::db_pool::DbPool;
use crate::db::executor::DuckDbExecutor;
use crate::db::schema::DuckDbSchema;
use crate::llm::TextGenerator;
use crate::llm::generation::QueryGenerator;
use crate::query::pipeline::ExecutionPipeline;
use crate::query::reporter::StatementExecutor;
use std::sync::Arc;

/// Shared application state for the web server
pub struct AppState {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub schema: Arc<DuckDbSchema>,
    pub generator: QueryGenerator,
    pub pipeline: ExecutionPipeline,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: AppConfig, db_pool: DbPool, llm: Arc<dyn TextGenerator>) -> Self {
        let executor = Arc::new(DuckDbExecutor::new(db_pool.clone()));
        Self::with_executor(config, db_pool, llm, executor)
    }

    /// Same as `new`, with the statement executor supplied by the caller.
    pub fn with_executor(
        config: AppConfig,
        db_pool: DbPool,
        llm: Arc<dyn TextGenerator>,
        executor: Arc<dyn StatementExecutor>,
    ) -> Self {
        let schema = Arc::new(DuckDbSchema::new(db_pool.clone()));

        Self {
            generator: QueryGenerator::new(schema.clone(), llm),
            pipeline: ExecutionPipeline::new(executor),
            schema,
            db_pool,
            config,
            startup_time: chrono::Utc::now(),
        }
    }

    pub fn llm_backend(&self) -> &str {
        &self.config.llm.backend
    }
}
