//! # shopkeep-core: Pure Business Rules for Shopkeep
//!
//! Every rule the engine enforces lives here as a pure function: how a
//! stock movement changes a product, when a register may be touched, what
//! a closed register should have in its drawer.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shopkeep Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Presentation layer + auth collaborator               │   │
//! │  │         (out of tree, supplies Actor { user_id, role })         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │     shopkeep-engine: StockLedger, RegisterManager, Reporting    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ shopkeep-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ │   │
//! │  │  │  types  │ │  money  │ │ ledger  │ │ register │ │  auth   │ │   │
//! │  │  └─────────┘ └─────────┘ └─────────┘ └──────────┘ └─────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 shopkeep-db (Persistence Gateway)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Product, StockMovement, CashRegisterRecord)
//! - [`money`] - Integer-cent money
//! - [`auth`] - Roles, capabilities, the acting user
//! - [`ledger`] - Stock movement effects, replay, audits
//! - [`register`] - Register lifecycle rules and reconciliation
//! - [`reporting`] - Read-only summaries
//! - [`validation`] - Field-level input checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use shopkeep_core::money::Money;
//! use shopkeep_core::register::reconcile;
//!
//! let r = reconcile(
//!     Money::from_major_minor(1000, 0), // opening float
//!     Money::from_major_minor(500, 0),  // cash sales
//!     Money::from_major_minor(50, 0),   // expenses
//!     Money::from_major_minor(1400, 0), // counted at close
//! );
//! assert_eq!(r.difference.cents(), -5000);
//! assert!(r.flagged);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod error;
pub mod ledger;
pub mod money;
pub mod register;
pub mod reporting;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use auth::{Actor, Capability, Role};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Products at or below this stock level count as "low stock".
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Unit of measure used when a product is created without one.
pub const DEFAULT_UNIT: &str = "unit";

/// Longest free-text note accepted on a movement or register.
pub const MAX_NOTE_LEN: usize = 1000;
