//! Error handling for the Inventory Ledger platform
//!
//! Every failure maps onto one of four classes: caller-fixable validation
//! (including insufficient stock), missing resources, retryable concurrency
//! conflicts, and infrastructure faults.

use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::StockShortfall;
use thiserror::Error;
use uuid::Uuid;

/// PostgreSQL SQLSTATE codes the ledger distinguishes
const PG_SERIALIZATION_FAILURE: &str = "40001";
const PG_DEADLOCK_DETECTED: &str = "40P01";
const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";
const PG_CHECK_VIOLATION: &str = "23514";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Insufficient stock for product {product_id}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        product_id: Uuid,
        available: i32,
        requested: i32,
    },

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Infrastructure errors
    #[error("Concurrent update conflict: {0}")]
    Concurrency(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),
}

impl AppError {
    /// Shorthand for a field-level validation failure
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Caller-fixable errors, never retried automatically
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. }
                | AppError::ValidationError(_)
                | AppError::InsufficientStock { .. }
        )
    }

    /// Whether re-running the whole operation may succeed unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Concurrency(_))
    }
}

impl From<StockShortfall> for AppError {
    fn from(shortfall: StockShortfall) -> Self {
        AppError::InsufficientStock {
            product_id: shortfall.product_id,
            available: shortfall.available,
            requested: shortfall.requested,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let code = err
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .map(|code| code.into_owned());

        match code.as_deref() {
            Some(PG_SERIALIZATION_FAILURE) | Some(PG_DEADLOCK_DETECTED) => {
                AppError::Concurrency(err.to_string())
            }
            Some(PG_UNIQUE_VIOLATION) => AppError::DuplicateEntry(
                err.as_database_error()
                    .and_then(|db_err| db_err.constraint())
                    .unwrap_or("record")
                    .to_string(),
            ),
            Some(PG_FOREIGN_KEY_VIOLATION) => {
                AppError::NotFound("Referenced item".to_string())
            }
            Some(PG_CHECK_VIOLATION) => {
                AppError::ValidationError("Value violates a stock constraint".to_string())
            }
            _ => AppError::DatabaseError(err),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|field| field.to_string())
            .unwrap_or_default();
        AppError::Validation {
            field,
            message: errors.to_string(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::validation("query", rejection.body_text())
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl ErrorDetail {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
            retryable: false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_TOKEN", "Invalid token"),
            ),
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", message.clone()),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    field: Some(field.clone()),
                    ..ErrorDetail::new("VALIDATION_ERROR", message.clone())
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", msg.clone()),
            ),
            AppError::InsufficientStock { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("INSUFFICIENT_STOCK", self.to_string()),
            ),
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    field: Some(field.clone()),
                    ..ErrorDetail::new(
                        "DUPLICATE_ENTRY",
                        format!("A record with this {} already exists", field),
                    )
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::Concurrency(_) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    retryable: true,
                    ..ErrorDetail::new(
                        "CONCURRENT_UPDATE",
                        "The stock changed concurrently, please retry",
                    )
                },
            ),
            AppError::Timeout(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail::new("TIMEOUT", "The operation timed out and was rolled back"),
            ),
            AppError::Store(_) | AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
            ),
            AppError::Cache(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("CACHE_ERROR", "A cache error occurred"),
            ),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
