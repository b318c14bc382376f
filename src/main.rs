use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

mod config;
mod db;
mod llm;
mod query;
mod util;
mod web;

use crate::config::{AppConfig, CliArgs};
use crate::db::db_pool::{build_pool, with_connection};
use crate::llm::{LlmError, UnavailableGenerator};
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    init_tracing(args.log_json);

    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!("Initializing DuckDB connection pool");
    let pool = build_pool(&config.database)?;

    // The server still starts without a working database; requests report the failure
    match with_connection(&pool, |conn| Ok(conn.execute("SELECT 1", [])?)).await {
        Ok(_) => info!("Database connection verified"),
        Err(e) => error!("Database connection check failed: {}", e),
    }

    info!("Initializing LLM provider with backend: {}", config.llm.backend);
    let llm = match llm::build_generator(&config.llm) {
        Ok(generator) => generator,
        Err(e @ LlmError::UnsupportedBackend(_)) => {
            error!("{}", e);
            return Err(e.into());
        }
        Err(e) => {
            error!("LLM provider unavailable, only fallback generation will work: {}", e);
            Arc::new(UnavailableGenerator::new(e.to_string()))
        }
    };

    let web_config = config.web.clone();
    let app_state = Arc::new(AppState::new(config, pool, llm));

    info!("Starting nl-gate server on {}:{}", web_config.host, web_config.port);
    match web::run_server(web_config, app_state).await {
        Ok(()) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
