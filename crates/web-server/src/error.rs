use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use database::{DbError, StoreError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("Invalid spell: {0}")]
    InvalidSpell(String),
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Database(DbError::Cancelled | DbError::DeadlineExceeded) => {
                tracing::warn!("Store operation did not finish in time.");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "The document store did not answer in time".to_string(),
                )
            }
            AppError::Database(DbError::WriteError(StoreError::Decode(e))) => {
                (StatusCode::BAD_REQUEST, format!("Invalid spell document: {e}"))
            }
            AppError::Database(db_err) => {
                tracing::error!(error = ?db_err, "Database error.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal database error occurred".to_string(),
                )
            }
            AppError::InvalidSpell(message) => (StatusCode::BAD_REQUEST, message),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
