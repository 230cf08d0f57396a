//! # Repository Module
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Engine service                                                         │
//! │       │                                                                 │
//! │       │  let mut tx = db.begin().await?;                                │
//! │       │  db.products().lock(&mut tx, id)                                │
//! │       ▼                                                                 │
//! │  ProductRepository / MovementRepository / RegisterRepository / Users    │
//! │  ├── pool reads:  list, get, count       (&self.pool)                   │
//! │  └── tx writes:   lock, insert, save      (&mut SqliteConnection)       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every write takes a connection so the caller decides the transaction
//! boundary. Reads go straight to the pool.
//!
//! - [`ProductRepository`](product::ProductRepository) - products and stock
//! - [`MovementRepository`](movement::MovementRepository) - append-only ledger
//! - [`RegisterRepository`](register::RegisterRepository) - cash registers
//! - [`UserRepository`](user::UserRepository) - display names

pub mod movement;
pub mod product;
pub mod register;
pub mod user;
