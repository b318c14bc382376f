use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{database, query, system};
use super::state::AppState;

fn query_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate", post(query::generate_query))
        .route("/execute", post(query::execute_query))
        .route("/analyze", post(query::analyze_query))
}

fn database_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tables", get(database::list_tables).post(database::create_table))
        .route("/tables/data", post(database::insert_data))
        .route("/tables/{table}/structure", get(database::table_structure))
        .route("/tables/{table}/data", get(database::table_data))
        .route("/schema", get(database::get_schema))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest(
            "/api",
            Router::new()
                .nest("/query", query_routes())
                .nest("/database", database_routes())
                .route("/status", get(system::system_status)),
        )
        .fallback(system::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
