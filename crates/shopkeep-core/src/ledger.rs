//! # Stock Ledger Rules
//!
//! How one movement changes one product, and how the whole movement
//! history rebuilds the stock level.
//!
//! ## Replay Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  product.stock == replay(movements of product, oldest first, from 0)    │
//! │                                                                         │
//! │    0 ──ENTRY 50──► 50 ──EXIT 10──► 40 ──ADJUST 45──► 45 ──EXIT 5──► 40  │
//! │                                                                         │
//! │  Every movement also records the stock on both sides of it, so          │
//! │  stock_before of one row equals stock_after of the previous row.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{MovementKind, Product, StockMovement};
use crate::validation::validate_movement_quantity;

// =============================================================================
// Applying a Movement
// =============================================================================

/// Stock level on both sides of a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    pub before: i64,
    pub after: i64,
}

/// Computes the effect of a movement on `current` stock.
///
/// `code` only feeds the InsufficientStock message.
///
/// ```rust
/// use shopkeep_core::ledger::apply_movement;
/// use shopkeep_core::MovementKind;
///
/// let change = apply_movement("JAM001", 50, MovementKind::Exit, 50).unwrap();
/// assert_eq!(change.after, 0);
/// assert!(apply_movement("JAM001", 50, MovementKind::Exit, 51).is_err());
/// ```
pub fn apply_movement(
    code: &str,
    current: i64,
    kind: MovementKind,
    quantity: i64,
) -> CoreResult<StockChange> {
    validate_movement_quantity(kind, quantity)?;

    let after = match kind {
        MovementKind::Entry => current.checked_add(quantity).ok_or_else(|| {
            CoreError::Validation(crate::ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: i64::MAX - current,
            })
        })?,
        MovementKind::Exit => {
            if current < quantity {
                return Err(CoreError::InsufficientStock {
                    code: code.to_string(),
                    available: current,
                    requested: quantity,
                });
            }
            current - quantity
        }
        MovementKind::Adjust => quantity,
    };

    Ok(StockChange {
        before: current,
        after,
    })
}

/// Rebuilds stock from a movement history ordered oldest first.
pub fn replay<'a, I>(movements: I) -> i64
where
    I: IntoIterator<Item = &'a StockMovement>,
{
    movements.into_iter().fold(0, step)
}

fn step(stock: i64, m: &StockMovement) -> i64 {
    match m.kind {
        MovementKind::Entry => stock.saturating_add(m.quantity),
        MovementKind::Exit => stock.saturating_sub(m.quantity),
        MovementKind::Adjust => m.quantity,
    }
}

// =============================================================================
// Audit
// =============================================================================

/// Stored stock versus the stock implied by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockAudit {
    pub product_id: String,
    pub code: String,
    pub stored: i64,
    pub replayed: i64,
    pub consistent: bool,
    pub movement_count: usize,
    /// Id of the first movement whose `stock_before` does not match the
    /// running replay, if any.
    pub first_broken_link: Option<String>,
}

/// Audits `product` against its movements (oldest first).
pub fn audit(product: &Product, movements: &[StockMovement]) -> StockAudit {
    let mut running = 0;
    let mut first_broken_link = None;

    for m in movements {
        if first_broken_link.is_none() && m.stock_before != running {
            first_broken_link = Some(m.id.clone());
        }
        running = step(running, m);
    }

    StockAudit {
        product_id: product.id.clone(),
        code: product.code.clone(),
        stored: product.stock,
        replayed: running,
        consistent: running == product.stock && first_broken_link.is_none(),
        movement_count: movements.len(),
        first_broken_link,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
