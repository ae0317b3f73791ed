//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::LedgerError;
use crate::storage::StorageError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Account not found: {0}")]
    AccountNotFound(i64),

    #[error("User not found: {0}")]
    UserNotFound(i64),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(i64),

    // Storage errors propagate unchanged; the status depends on the kind
    #[error(transparent)]
    Storage(#[from] StorageError),

    // Amount bounds are the caller's fault, balance overflow is not
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    // Server errors (5xx)
    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Export(err.to_string())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // 404 Not Found
            AppError::AccountNotFound(id) => {
                (StatusCode::NOT_FOUND, "account_not_found", Some(id.to_string()))
            }
            AppError::UserNotFound(id) => {
                (StatusCode::NOT_FOUND, "user_not_found", Some(id.to_string()))
            }
            AppError::TransactionNotFound(id) => {
                (StatusCode::NOT_FOUND, "transaction_not_found", Some(id.to_string()))
            }

            // Storage errors - constraint violations are the caller's fault
            AppError::Storage(storage_err) => match storage_err {
                StorageError::Duplicate(msg) => {
                    (StatusCode::CONFLICT, "duplicate", Some(msg.clone()))
                }
                StorageError::MissingReference(msg) => {
                    (StatusCode::BAD_REQUEST, "missing_reference", Some(msg.clone()))
                }
                StorageError::RowNotFound(msg) => {
                    (StatusCode::NOT_FOUND, "row_not_found", Some(msg.clone()))
                }
                StorageError::OutOfRange(msg) => {
                    (StatusCode::BAD_REQUEST, "value_out_of_range", Some(msg.clone()))
                }
                StorageError::Finished => {
                    tracing::error!("Storage used after commit");
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
                }
                StorageError::Database(e) => {
                    tracing::error!("Database error: {:?}", e);
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
                }
                StorageError::Corrupt(msg) => {
                    tracing::error!("Corrupt data: {}", msg);
                    (StatusCode::INTERNAL_SERVER_ERROR, "corrupt_data", None)
                }
            },

            AppError::Ledger(ledger_err) => match ledger_err {
                LedgerError::AmountTooLarge(amount) => {
                    (StatusCode::BAD_REQUEST, "amount_too_large", Some(amount.to_string()))
                }
                LedgerError::Overflow { transaction_id } => {
                    tracing::error!(transaction_id = *transaction_id, "Balance overflow");
                    (StatusCode::INTERNAL_SERVER_ERROR, "balance_overflow", None)
                }
            },

            // 500 Internal Server Error
            AppError::Export(msg) => {
                tracing::error!("Export error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "export_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
