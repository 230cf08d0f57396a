//! # Error Types
//!
//! Domain-specific error types for shopkeep-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shopkeep-core errors (this file)                                       │
//! │  ├── CoreError        - Domain rule violations                          │
//! │  └── ValidationError  - Malformed input fields                          │
//! │                                                                         │
//! │  shopkeep-db errors                                                     │
//! │  └── DbError          - Storage failures, unique violations             │
//! │                                                                         │
//! │  shopkeep-engine errors                                                 │
//! │  └── EngineError      - { code, message } surfaced to callers           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                   │
//! │                          DbError ───┴──► EngineError → Caller           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Referenced product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Referenced register record does not exist.
    #[error("Cash register not found: {0}")]
    RegisterNotFound(String),

    /// An EXIT asked for more units than are on hand.
    ///
    /// ## User Workflow
    /// ```text
    /// Stock: JAM001 = 50
    ///      │
    ///      ▼
    /// EXIT 60
    ///      │
    ///      ▼
    /// InsufficientStock { code: "JAM001", available: 50, requested: 60 }
    ///      │
    ///      ▼
    /// Stock stays 50, no movement is written
    /// ```
    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    /// The acting user's role or ownership does not allow the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A closed register was touched by someone who may not override it.
    #[error("Cash register {0} is closed")]
    RegisterClosed(String),

    /// A close was requested without the figures reconciliation needs.
    #[error("Cannot close register, missing: {}", missing.join(", "))]
    IncompleteClose { missing: Vec<String> },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business rule runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, bad characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            code: "JAM001".to_string(),
            available: 50,
            requested: 60,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for JAM001: available 50, requested 60"
        );

        let err = CoreError::IncompleteClose {
            missing: vec!["closingFloat".to_string(), "cashSales".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Cannot close register, missing: closingFloat, cashSales"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
