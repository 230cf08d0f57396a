//! # Domain Types
//!
//! Records shared by every layer of Shopkeep.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌──────────────────────┐  │
//! │  │    Product      │   │  StockMovement  │   │ CashRegisterRecord   │  │
//! │  │  ─────────────  │   │  ─────────────  │   │  ──────────────────  │  │
//! │  │  id (UUID)      │◄──│  product_id     │   │  id (UUID)           │  │
//! │  │  code (unique)  │   │  kind           │   │  owner_id            │  │
//! │  │  price_cents    │   │  quantity       │   │  opened_at (day)     │  │
//! │  │  stock          │   │  stock_before   │   │  *_cents figures     │  │
//! │  └─────────────────┘   │  stock_after    │   │  closed              │  │
//! │                        └─────────────────┘   └──────────────────────┘  │
//! │                                                                         │
//! │  MovementEntry  = StockMovement + product code/name + actor name        │
//! │  RegisterEntry  = CashRegisterRecord + owner name                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every record carries a UUID `id`. Products also carry a human `code`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// An inventory item with its current stock level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business identifier printed on shelves. Unique.
    pub code: String,

    pub name: String,

    pub description: Option<String>,

    /// Sale price in cents.
    pub price_cents: i64,

    /// Unit of measure ("unit", "kg", "box", ...).
    pub unit: String,

    pub category: Option<String>,

    pub supplier: Option<String>,

    /// Units on hand. Never negative.
    pub stock: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Price times units on hand.
    #[inline]
    pub fn stock_value(&self) -> Money {
        self.price().multiply_quantity(self.stock)
    }

    /// At or below the threshold counts as low.
    #[inline]
    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.stock <= threshold
    }
}

// =============================================================================
// Movement Kind
// =============================================================================

/// What a stock movement does to a product's stock.
///
/// | Kind   | Effect              |
/// |--------|---------------------|
/// | ENTRY  | stock + quantity    |
/// | EXIT   | stock - quantity    |
/// | ADJUST | stock = quantity    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum MovementKind {
    Entry,
    Exit,
    Adjust,
}

impl MovementKind {
    pub const ALL: [MovementKind; 3] = [MovementKind::Entry, MovementKind::Exit, MovementKind::Adjust];

    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Entry => "ENTRY",
            MovementKind::Exit => "EXIT",
            MovementKind::Adjust => "ADJUST",
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = ValidationError;

    /// Case-insensitive; anything else is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MovementKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "kind".to_string(),
                allowed: MovementKind::ALL.iter().map(|k| k.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// One immutable ledger row.
///
/// `stock_before`/`stock_after` are the product's stock on either side of
/// this movement, captured inside the same transaction that applied it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub kind: MovementKind,
    /// Units moved (ENTRY/EXIT) or the new absolute level (ADJUST).
    pub quantity: i64,
    pub stock_before: i64,
    pub stock_after: i64,
    pub note: Option<String>,
    /// Who recorded the movement.
    pub actor_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A movement joined with the product and user it references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MovementEntry {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    #[ts(flatten)]
    pub movement: StockMovement,
    pub product_code: String,
    pub product_name: String,
    /// `None` when the actor never registered a display name.
    pub actor_name: Option<String>,
}

// =============================================================================
// Cash Register Record
// =============================================================================

/// One user's cash register for one business day.
///
/// ```text
///   open ──► (update)* ──► close ──► immutable*
///                                    * admins may still edit, never reopen
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CashRegisterRecord {
    pub id: String,
    /// User who opened the register.
    pub owner_id: String,
    /// Business date of the record.
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    pub opening_float_cents: i64,
    /// Counted cash at close. `None` until someone counts it.
    pub closing_float_cents: Option<i64>,
    pub cash_sales_cents: i64,
    pub card_sales_cents: i64,
    pub transfer_sales_cents: i64,
    pub expenses_cents: i64,
    pub notes: String,
    pub closed: bool,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CashRegisterRecord {
    #[inline]
    pub fn opening_float(&self) -> Money {
        Money::from_cents(self.opening_float_cents)
    }

    #[inline]
    pub fn closing_float(&self) -> Option<Money> {
        self.closing_float_cents.map(Money::from_cents)
    }

    #[inline]
    pub fn cash_sales(&self) -> Money {
        Money::from_cents(self.cash_sales_cents)
    }

    #[inline]
    pub fn card_sales(&self) -> Money {
        Money::from_cents(self.card_sales_cents)
    }

    #[inline]
    pub fn transfer_sales(&self) -> Money {
        Money::from_cents(self.transfer_sales_cents)
    }

    #[inline]
    pub fn expenses(&self) -> Money {
        Money::from_cents(self.expenses_cents)
    }

    /// Cash + card + transfer.
    pub fn total_sales(&self) -> Money {
        self.cash_sales() + self.card_sales() + self.transfer_sales()
    }

    pub fn status(&self) -> RegisterStatus {
        if self.closed {
            RegisterStatus::Closed
        } else {
            RegisterStatus::Open
        }
    }
}

/// Lifecycle state of a register record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum RegisterStatus {
    Open,
    Closed,
}

/// A register record joined with its owner's display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterEntry {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    #[ts(flatten)]
    pub record: CashRegisterRecord,
    pub owner_name: Option<String>,
}

impl RegisterEntry {
    /// Owner name when known, owner id otherwise.
    pub fn owner_label(&self) -> &str {
        self.owner_name.as_deref().unwrap_or(&self.record.owner_id)
    }
}

// =============================================================================
// User
// =============================================================================

/// Display info for a user id issued by the auth collaborator.
///
/// The row appears the first time the id acts; the name only once the
/// collaborator supplies one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
