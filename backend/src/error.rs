//! Error handling for the Rice Inventory Management System
//!
//! Provides consistent error responses in English and Korean

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::LedgerError;
use thiserror::Error;

/// Name of the check constraint that ties stock status to its references
const STOCK_LINK_CONSTRAINT: &str = "stocks_status_links_check";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_ko: String,
    },

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Locked: {0}")]
    Locked(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(what) => AppError::NotFound(what),
            LedgerError::DuplicateKey(what) => AppError::DuplicateEntry(what),
            LedgerError::InvalidState(msg) => AppError::InvalidStateTransition(msg),
            LedgerError::Locked(msg) => AppError::Locked(msg),
            LedgerError::Conflict(msg) => AppError::Conflict(msg),
            LedgerError::Timeout(msg) => AppError::Timeout(msg),
            LedgerError::Validation { field, message } => AppError::Validation {
                message_ko: format!("입력값이 올바르지 않습니다: {}", message),
                field,
                message,
            },
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return AppError::DuplicateEntry(
                    db_err.constraint().unwrap_or("record").to_string(),
                );
            }
            if db_err.constraint() == Some(STOCK_LINK_CONSTRAINT) {
                return AppError::InvalidStateTransition(
                    "Stock status and its batch/release references disagree".to_string(),
                );
            }
        }
        AppError::DatabaseError(err)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let (field, message) = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                (field.to_string(), message)
            })
            .unwrap_or_else(|| ("request".to_string(), "Invalid request".to_string()));

        AppError::Validation {
            message_ko: format!("입력값이 올바르지 않습니다: {}", message),
            field,
            message,
        }
    }
}

impl AppError {
    /// Convert back into the domain taxonomy, used when a bulk operation
    /// reports a per-item failure instead of failing the whole request
    pub fn into_ledger_error(self) -> LedgerError {
        match self {
            AppError::NotFound(what) => LedgerError::NotFound(what),
            AppError::DuplicateEntry(what) => LedgerError::DuplicateKey(what),
            AppError::InvalidStateTransition(msg) => LedgerError::InvalidState(msg),
            AppError::Locked(msg) => LedgerError::Locked(msg),
            AppError::Conflict(msg) => LedgerError::Conflict(msg),
            AppError::Timeout(msg) => LedgerError::Timeout(msg),
            AppError::Validation { field, message, .. } => LedgerError::Validation { field, message },
            other => LedgerError::Conflict(other.to_string()),
        }
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
    pub message_en: String,
    pub message_ko: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "UNAUTHORIZED".to_string(),
                    message_en: msg.clone(),
                    message_ko: "인증이 필요합니다".to_string(),
                    field: None,
                },
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "INSUFFICIENT_PERMISSIONS".to_string(),
                    message_en: "You do not have permission to perform this action".to_string(),
                    message_ko: "이 작업을 수행할 권한이 없습니다".to_string(),
                    field: None,
                },
            ),
            AppError::Validation { field, message, message_ko } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: message.clone(),
                    message_ko: message_ko.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::DuplicateEntry(what) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "DUPLICATE_KEY".to_string(),
                    message_en: format!("{} already exists", what),
                    message_ko: format!("이미 등록된 {} 입니다", what),
                    field: None,
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("{} not found", resource),
                    message_ko: format!("{}을(를) 찾을 수 없습니다", resource),
                    field: None,
                },
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INVALID_STATE".to_string(),
                    message_en: msg.clone(),
                    message_ko: format!("현재 상태에서는 처리할 수 없습니다: {}", msg),
                    field: None,
                },
            ),
            AppError::Locked(msg) => (
                StatusCode::LOCKED,
                ErrorDetail {
                    code: "LOCKED".to_string(),
                    message_en: msg.clone(),
                    message_ko: format!("마감된 작업입니다: {}", msg),
                    field: None,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message_en: msg.clone(),
                    message_ko: format!("처리할 수 없습니다: {}", msg),
                    field: None,
                },
            ),
            AppError::Timeout(msg) => (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorDetail {
                    code: "TIMEOUT".to_string(),
                    message_en: msg.clone(),
                    message_ko: "처리 시간이 초과되었습니다. 다시 시도해 주세요".to_string(),
                    field: None,
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message_en: "A database error occurred".to_string(),
                    message_ko: "데이터베이스 오류가 발생했습니다".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_ko: "서버 내부 오류가 발생했습니다".to_string(),
                    field: None,
                },
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
