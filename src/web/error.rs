use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::db::DbError;
use crate::query::QueryError;

/// Everything a handler can fail with, mapped onto `{success:false, error}` bodies.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Query(QueryError),
    Db(DbError),
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        ApiError::Query(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        ApiError::Db(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

fn failure(status: StatusCode, message: impl ToString) -> Response {
    (status, Json(json!({ "success": false, "error": message.to_string() }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => failure(StatusCode::BAD_REQUEST, message),
            ApiError::Query(e) => match e {
                QueryError::EmptyStatement
                | QueryError::MultiStatement
                | QueryError::ProfiledStatement
                | QueryError::InvalidConfirmationLevel(_) => failure(StatusCode::BAD_REQUEST, e),
                QueryError::AnalystModeViolation => (
                    StatusCode::FORBIDDEN,
                    Json(json!({
                        "success": false,
                        "error": e.to_string(),
                        "isDangerous": false,
                        "needsConfirmation": false,
                    })),
                )
                    .into_response(),
                QueryError::GenerationFailed => failure(StatusCode::INTERNAL_SERVER_ERROR, e),
                QueryError::SqlExecution(message) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "error": message, "sqlError": true })),
                )
                    .into_response(),
            },
            ApiError::Db(e) => match e {
                DbError::InvalidIdentifier(_) | DbError::InvalidDefinition(_) => {
                    failure(StatusCode::BAD_REQUEST, e)
                }
                DbError::TableNotFound(_) => failure(StatusCode::NOT_FOUND, e),
                DbError::Statement(message) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "error": message, "sqlError": true })),
                )
                    .into_response(),
                other => {
                    error!("Database failure: {}", other);
                    failure(StatusCode::INTERNAL_SERVER_ERROR, other)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::from(QueryError::MultiStatement), StatusCode::BAD_REQUEST),
            (ApiError::from(QueryError::InvalidConfirmationLevel(7)), StatusCode::BAD_REQUEST),
            (ApiError::from(QueryError::AnalystModeViolation), StatusCode::FORBIDDEN),
            (ApiError::from(QueryError::GenerationFailed), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::from(QueryError::ProfiledStatement), StatusCode::BAD_REQUEST),
            (
                ApiError::from(QueryError::SqlExecution("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::from(DbError::InvalidIdentifier("a b".into())), StatusCode::BAD_REQUEST),
            (ApiError::from(DbError::TableNotFound("t".into())), StatusCode::NOT_FOUND),
            (ApiError::BadRequest("missing".into()), StatusCode::BAD_REQUEST),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
