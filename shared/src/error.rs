//! Domain error taxonomy for the inventory engine

use thiserror::Error;

/// Errors raised by the stock lifecycle rules.
///
/// Messages are written as domain statements so callers can show them to
/// operators verbatim (e.g. in a "3 skipped" bulk report).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    DuplicateKey(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Locked(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{message}")]
    Validation { field: String, message: String },
}

impl LedgerError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        LedgerError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::NotFound(_) => "NOT_FOUND",
            LedgerError::DuplicateKey(_) => "DUPLICATE_KEY",
            LedgerError::InvalidState(_) => "INVALID_STATE",
            LedgerError::Locked(_) => "LOCKED",
            LedgerError::Conflict(_) => "CONFLICT",
            LedgerError::Timeout(_) => "TIMEOUT",
            LedgerError::Validation { .. } => "VALIDATION_ERROR",
        }
    }
}

/// Result alias for domain rule checks
pub type LedgerResult<T> = Result<T, LedgerError>;
