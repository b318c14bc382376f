use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::db::DbError;
use crate::db::db_utils::{self, Pagination, TableDefinition};
use crate::db::schema::{load_schema, ColumnInfo, ForeignKey, SchemaProvider};
use crate::query::reporter::Row;
use crate::web::error::ApiError;
use crate::web::handlers::ApiResponse;
use crate::web::state::AppState;

const DEFAULT_PAGE_SIZE: u64 = 50;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStructure {
    pub columns: Vec<ColumnInfo>,
    pub foreign_keys: Vec<ForeignKey>,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct TableData {
    pub success: bool,
    pub data: Vec<Row>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct TableCreated {
    pub success: bool,
    pub message: String,
    pub query: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertRequest {
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub data: Row,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowInserted {
    pub success: bool,
    pub message: String,
    pub affected_rows: u64,
}

pub async fn list_tables(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let tables = state.schema.list_tables().await?;
    Ok(Json(ApiResponse::ok(tables)))
}

/// Every table with its columns, keyed by table name in catalog order.
pub async fn get_schema(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<serde_json::Map<String, serde_json::Value>>>, ApiError> {
    let tables = load_schema(state.schema.as_ref()).await?;

    let mut schema = serde_json::Map::new();
    for table in tables {
        schema.insert(table.name, serde_json::to_value(table.columns).map_err(DbError::from)?);
    }

    Ok(Json(ApiResponse::ok(schema)))
}

pub async fn table_structure(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
) -> Result<Json<ApiResponse<TableStructure>>, ApiError> {
    state.schema.ensure_table(&table).await?;

    let columns = state.schema.describe_table(&table).await?;
    let foreign_keys = state.schema.foreign_keys(&table).await?;

    Ok(Json(ApiResponse::ok(TableStructure { columns, foreign_keys })))
}

pub async fn table_data(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<TableData>, ApiError> {
    state.schema.ensure_table(&table).await?;

    let page = db_utils::fetch_page(
        &state.db_pool,
        &table,
        params.page.unwrap_or(1),
        params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    )
    .await?;

    Ok(Json(TableData {
        success: true,
        data: page.rows,
        pagination: page.pagination,
    }))
}

pub async fn create_table(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TableDefinition>, JsonRejection>,
) -> Result<(StatusCode, Json<TableCreated>), ApiError> {
    let Json(definition) = payload?;

    for fk in &definition.foreign_keys {
        state.schema.ensure_table(&fk.reference_table).await?;
    }

    let query = db_utils::create_table(&state.db_pool, &definition).await?;
    info!("Table {} created", definition.table_name);

    Ok((
        StatusCode::CREATED,
        Json(TableCreated {
            success: true,
            message: format!("Table {} created successfully", definition.table_name),
            query,
        }),
    ))
}

pub async fn insert_data(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InsertRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RowInserted>), ApiError> {
    let Json(request) = payload?;
    if request.table_name.is_empty() || request.data.is_empty() {
        return Err(ApiError::BadRequest("Table name and data are required".to_string()));
    }

    state.schema.ensure_table(&request.table_name).await?;
    let affected_rows =
        db_utils::insert_row(&state.db_pool, &request.table_name, &request.data).await?;

    Ok((
        StatusCode::CREATED,
        Json(RowInserted {
            success: true,
            message: "Data inserted successfully".to_string(),
            affected_rows,
        }),
    ))
}
