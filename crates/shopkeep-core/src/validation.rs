//! # Validation Module
//!
//! Field-level input checks for Shopkeep.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request deserialization (serde)                               │
//! │  ├── Shape and type of the payload                                      │
//! │  └── MovementKind / Role parsing                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Lengths, characters, signs                                         │
//! │  └── Runs before any transaction is opened                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── NOT NULL / CHECK (stock >= 0) constraints                          │
//! │  ├── UNIQUE (products.code)                                             │
//! │  └── Foreign keys                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shopkeep_core::validation::{validate_code, validate_movement_quantity};
//! use shopkeep_core::MovementKind;
//!
//! validate_code("JAM001").unwrap();
//! validate_movement_quantity(MovementKind::Adjust, 0).unwrap();
//! assert!(validate_movement_quantity(MovementKind::Exit, 0).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::MovementKind;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_CODE_LEN: usize = 50;
const MAX_NAME_LEN: usize = 200;
const MAX_UNIT_LEN: usize = 30;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and underscores only
///
/// ```rust
/// use shopkeep_core::validation::validate_code;
///
/// assert!(validate_code("JAM001").is_ok());
/// assert!(validate_code("").is_err());
/// assert!(validate_code("has space").is_err());
/// ```
pub fn validate_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.chars().count() > MAX_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name: required, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a unit of measure. Empty means "use the default".
pub fn validate_unit(unit: &str) -> ValidationResult<()> {
    if unit.trim().chars().count() > MAX_UNIT_LEN {
        return Err(ValidationError::TooLong {
            field: "unit".to_string(),
            max: MAX_UNIT_LEN,
        });
    }
    Ok(())
}

/// Trims optional free text and drops it when blank.
///
/// ```rust
/// use shopkeep_core::validation::normalize_optional_text;
///
/// let note = normalize_optional_text("note", Some("  restock  "), 100).unwrap();
/// assert_eq!(note.as_deref(), Some("restock"));
/// assert_eq!(normalize_optional_text("note", Some("   "), 100).unwrap(), None);
/// ```
pub fn normalize_optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> ValidationResult<Option<String>> {
    let Some(text) = value.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    if text.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(Some(text.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a movement quantity for its kind.
///
/// ```text
/// ┌────────────┬──────────────────────────────┐
/// │ ENTRY/EXIT │ quantity > 0                 │
/// │ ADJUST     │ quantity >= 0 (new level)    │
/// └────────────┴──────────────────────────────┘
/// ```
pub fn validate_movement_quantity(kind: MovementKind, quantity: i64) -> ValidationResult<()> {
    match kind {
        MovementKind::Entry | MovementKind::Exit if quantity <= 0 => {
            Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            })
        }
        MovementKind::Adjust if quantity < 0 => Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: i64::MAX,
        }),
        _ => Ok(()),
    }
}

/// Validates a price in cents. Zero is allowed.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates the stock a product is created with.
pub fn validate_initial_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Resolves a requested page size.
///
/// `None` falls back to `default`; anything above `max` is capped.
pub fn resolve_page_limit(requested: Option<u32>, default: u32, max: u32) -> ValidationResult<u32> {
    match requested {
        Some(0) => Err(ValidationError::MustBePositive {
            field: "limit".to_string(),
        }),
        Some(n) => Ok(n.min(max)),
        None => Ok(default.min(max)),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
