//! # Engine Error Type
//!
//! The one error every engine operation returns.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  caller ──► StockLedger / CashRegisterManager / Reports                 │
//! │                   │                                                     │
//! │                   ├── ValidationError ─┐                                │
//! │                   ├── CoreError ───────┼─► EngineError { code, message }│
//! │                   └── DbError ─────────┘         │                      │
//! │                                                  ▼                      │
//! │                         { "code": "INSUFFICIENT_STOCK",                 │
//! │                           "message": "Insufficient stock for ..." }     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage failures are logged in full and reported with a generic message.

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use shopkeep_core::{CoreError, ValidationError};
use shopkeep_db::DbError;

/// Error returned by engine operations.
///
/// ```json
/// { "code": "NOT_FOUND", "message": "Product not found: 6f1c..." }
/// ```
#[derive(Debug, Clone, Error, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
#[error("[{code:?}] {message}")]
pub struct EngineError {
    /// Machine-readable code
    pub code: ErrorCode,

    /// Human-readable message
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorCode {
    /// Product or register does not exist
    NotFound,

    /// Bad quantity, unknown movement kind, malformed field
    InvalidArgument,

    /// EXIT larger than the stock on hand
    InsufficientStock,

    /// Product code already taken
    Duplicate,

    /// Role or ownership does not allow the operation
    Forbidden,

    /// Register already closed
    Conflict,

    /// Close requested without the figures it needs
    ValidationError,

    /// Database failure
    StorageError,
}

impl EngineError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        EngineError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        EngineError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        EngineError::new(ErrorCode::InvalidArgument, message)
    }

    fn storage(message: impl Into<String>) -> Self {
        EngineError::new(ErrorCode::StorageError, message)
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::invalid(err.to_string())
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => EngineError::not_found("Product", &id),
            CoreError::RegisterNotFound(id) => EngineError::not_found("Cash register", &id),
            e @ CoreError::InsufficientStock { .. } => {
                EngineError::new(ErrorCode::InsufficientStock, e.to_string())
            }
            e @ CoreError::Forbidden(_) => EngineError::new(ErrorCode::Forbidden, e.to_string()),
            e @ CoreError::RegisterClosed(_) => EngineError::new(ErrorCode::Conflict, e.to_string()),
            e @ CoreError::IncompleteClose { .. } => {
                EngineError::new(ErrorCode::ValidationError, e.to_string())
            }
            CoreError::Validation(e) => e.into(),
        }
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => EngineError::new(
                ErrorCode::Duplicate,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                EngineError::invalid("Invalid reference")
            }
            DbError::ConstraintViolation(message) => {
                tracing::error!("Constraint refused write: {}", message);
                EngineError::storage("Database rejected the write")
            }
            DbError::Busy(e) => {
                tracing::error!("Database busy: {}", e);
                EngineError::storage("Database is busy, try again")
            }
            DbError::PoolExhausted => EngineError::storage("Database pool exhausted"),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                EngineError::storage("Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Migration failed: {}", e);
                EngineError::storage("Database migration failed")
            }
            DbError::QueryFailed(e) | DbError::Internal(e) => {
                tracing::error!("Database operation failed: {}", e);
                EngineError::storage("Database operation failed")
            }
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
