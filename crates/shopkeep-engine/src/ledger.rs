//! # Stock Ledger
//!
//! Products and the movements that change their stock.
//!
//! ## Recording a Movement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_movement(EXIT 3 of JAM001, actor)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  parse kind, check quantity and note ──── bad? InvalidArgument          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │   ├── lock product row (read + write lock, one statement)               │
//! │   │        └── missing? NotFound ─────────────────────┐                 │
//! │   ├── ensure actor row                                │                 │
//! │   ├── apply_movement(stock, EXIT, 3)                  │                 │
//! │   │        └── stock < 3? InsufficientStock ──────────┤                 │
//! │   ├── UPDATE products.stock                           │                 │
//! │   └── INSERT stock_movements                          ▼                 │
//! │  COMMIT                                     transaction dropped,        │
//! │                                             nothing written             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any role may record any movement kind. Only administrators may read the
//! global ledger.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use shopkeep_core::ledger::{self, StockAudit};
use shopkeep_core::register::AmountInput;
use shopkeep_core::validation::{
    normalize_optional_text, resolve_page_limit, validate_code, validate_initial_stock,
    validate_movement_quantity, validate_price_cents, validate_product_name, validate_unit,
};
use shopkeep_core::{
    Actor, Capability, CoreError, Money, MovementEntry, MovementKind, Product, StockMovement,
    ValidationError, DEFAULT_UNIT, MAX_NOTE_LEN,
};
use shopkeep_db::{Database, DbError, MovementQuery};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

// =============================================================================
// Requests & Responses
// =============================================================================

/// A product to create. `initial_stock` is booked as an ENTRY movement.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price in currency units, as a number or a numeric string.
    /// Omitted means free; present but not a number is rejected.
    #[serde(default)]
    pub price: Option<AmountInput>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub initial_stock: i64,
}

/// A newly created product and the ENTRY that booked its initial stock.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductCreated {
    pub product: Product,
    /// `None` when the product started at zero.
    pub opening_movement: Option<StockMovement>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MovementRequest {
    pub product_id: String,
    /// `ENTRY`, `EXIT` or `ADJUST`, any case.
    pub kind: String,
    pub quantity: i64,
    #[serde(default)]
    pub note: Option<String>,
}

/// Product state after a movement, and the movement itself.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MovementRecorded {
    pub product: Product,
    pub movement: StockMovement,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct MovementFilter {
    /// Page size. Defaults to the configured page, capped by the maximum.
    pub limit: Option<u32>,
    pub product_id: Option<String>,
    pub kind: Option<String>,
    pub actor_id: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

#[derive(Debug, Clone)]
pub struct StockLedger {
    db: Database,
    config: Arc<EngineConfig>,
}

impl StockLedger {
    pub fn new(db: Database, config: Arc<EngineConfig>) -> Self {
        StockLedger { db, config }
    }

    /// Creates a product, booking any initial stock as its first movement.
    ///
    /// Requires `ManageProducts` (administrators and managers).
    pub async fn create_product(
        &self,
        request: NewProduct,
        actor: &Actor,
    ) -> EngineResult<ProductCreated> {
        actor.require(Capability::ManageProducts)?;

        let code = request.code.trim();
        let name = request.name.trim();
        validate_code(code)?;
        validate_product_name(name)?;

        let price = match &request.price {
            Some(input) => input.to_money().ok_or_else(|| ValidationError::InvalidFormat {
                field: "price".to_string(),
                reason: "not a number".to_string(),
            })?,
            None => Money::zero(),
        };
        validate_price_cents(price.cents())?;
        validate_initial_stock(request.initial_stock)?;

        let unit = match request.unit.as_deref().map(str::trim) {
            Some(unit) if !unit.is_empty() => {
                validate_unit(unit)?;
                unit.to_string()
            }
            _ => DEFAULT_UNIT.to_string(),
        };

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            name: name.to_string(),
            description: normalize_optional_text(
                "description",
                request.description.as_deref(),
                MAX_NOTE_LEN,
            )?,
            price_cents: price.cents(),
            unit,
            category: normalize_optional_text("category", request.category.as_deref(), 100)?,
            supplier: normalize_optional_text("supplier", request.supplier.as_deref(), 200)?,
            stock: request.initial_stock,
            created_at: now,
            updated_at: now,
        };

        let opening = (request.initial_stock > 0).then(|| StockMovement {
            id: Uuid::new_v4().to_string(),
            product_id: product.id.clone(),
            kind: MovementKind::Entry,
            quantity: request.initial_stock,
            stock_before: 0,
            stock_after: request.initial_stock,
            note: Some("Initial stock".to_string()),
            actor_id: actor.user_id.clone(),
            created_at: now,
        });

        let mut tx = self.db.begin().await?;
        self.db.users().ensure(&mut tx, &actor.user_id).await?;
        self.db.products().insert(&mut tx, &product).await?;
        if let Some(movement) = &opening {
            self.db.movements().insert(&mut tx, movement).await?;
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(
            product_id = %product.id,
            code = %product.code,
            stock = product.stock,
            actor = %actor.user_id,
            "Product created"
        );

        Ok(ProductCreated {
            product,
            opening_movement: opening,
        })
    }

    /// Applies one movement to one product.
    ///
    /// The stock check and both writes run against the row as locked by
    /// this transaction, so concurrent EXITs can never oversell.
    pub async fn record_movement(
        &self,
        request: MovementRequest,
        actor: &Actor,
    ) -> EngineResult<MovementRecorded> {
        actor.require(Capability::RecordMovement)?;

        let kind: MovementKind = request.kind.parse()?;
        validate_movement_quantity(kind, request.quantity)?;
        let note = normalize_optional_text("note", request.note.as_deref(), MAX_NOTE_LEN)?;

        debug!(
            product_id = %request.product_id,
            kind = %kind,
            quantity = request.quantity,
            "record_movement"
        );

        let mut tx = self.db.begin().await?;

        let current = self
            .db
            .products()
            .lock(&mut tx, &request.product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(request.product_id.clone()))?;

        let change = match ledger::apply_movement(&current.code, current.stock, kind, request.quantity)
        {
            Ok(change) => change,
            Err(e) => {
                warn!(code = %current.code, error = %e, "Movement rejected");
                return Err(e.into());
            }
        };

        self.db.users().ensure(&mut tx, &actor.user_id).await?;

        let now = Utc::now();
        let product = self
            .db
            .products()
            .set_stock(&mut tx, &current.id, change.after, now)
            .await?;

        let movement = StockMovement {
            id: Uuid::new_v4().to_string(),
            product_id: current.id.clone(),
            kind,
            quantity: request.quantity,
            stock_before: change.before,
            stock_after: change.after,
            note,
            actor_id: actor.user_id.clone(),
            created_at: now,
        };
        self.db.movements().insert(&mut tx, &movement).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            code = %product.code,
            kind = %kind,
            quantity = movement.quantity,
            before = change.before,
            after = change.after,
            actor = %actor.user_id,
            "Movement recorded"
        );

        Ok(MovementRecorded { product, movement })
    }

    /// Newest movements first, with product and actor names.
    /// Administrators only.
    pub async fn list_movements(
        &self,
        filter: MovementFilter,
        actor: &Actor,
    ) -> EngineResult<Vec<MovementEntry>> {
        actor.require(Capability::ViewLedger)?;

        let limit = resolve_page_limit(
            filter.limit,
            self.config.movement_page_size,
            self.config.max_movement_page,
        )?;
        let kind = filter
            .kind
            .as_deref()
            .map(str::parse::<MovementKind>)
            .transpose()?;

        let query = MovementQuery {
            product_id: filter.product_id,
            kind,
            actor_id: filter.actor_id,
        };

        Ok(self.db.movements().list_recent(&query, limit).await?)
    }

    /// Every product, ordered by name.
    pub async fn list_products(&self) -> EngineResult<Vec<Product>> {
        Ok(self.db.products().list().await?)
    }

    pub async fn get_product(&self, product_id: &str) -> EngineResult<Product> {
        self.db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Product", product_id))
    }

    /// All movements of one product, oldest first.
    pub async fn product_history(&self, product_id: &str) -> EngineResult<Vec<StockMovement>> {
        // Existence check so an unknown id is NotFound, not an empty list.
        self.get_product(product_id).await?;
        Ok(self.db.movements().list_for_product(product_id).await?)
    }

    /// Replays a product's movements from zero and compares the result with
    /// its stored stock.
    ///
    /// Reads are not isolated from concurrent writers; run it when the
    /// product is quiet for an exact answer.
    pub async fn audit_product(&self, product_id: &str) -> EngineResult<StockAudit> {
        let product = self.get_product(product_id).await?;
        let movements = self.db.movements().list_for_product(product_id).await?;
        let audit = ledger::audit(&product, &movements);

        if audit.consistent {
            debug!(code = %audit.code, movements = audit.movement_count, "Stock audit passed");
        } else {
            warn!(
                code = %audit.code,
                stored = audit.stored,
                replayed = audit.replayed,
                broken_at = ?audit.first_broken_link,
                "Stock audit failed"
            );
        }

        Ok(audit)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::Engine;
    use shopkeep_core::Role;

    fn admin() -> Actor {
        Actor::new("u-admin", Role::Admin)
    }

    fn employee() -> Actor {
        Actor::new("u-emp", Role::Employee)
    }

    fn new_product(code: &str, stock: i64) -> NewProduct {
        NewProduct {
            code: code.to_string(),
            name: format!("Product {code}"),
            description: None,
            price: Some(AmountInput::Number(3.5)),
            unit: None,
            category: None,
            supplier: None,
            initial_stock: stock,
        }
    }

    fn movement(product_id: &str, kind: &str, quantity: i64) -> MovementRequest {
        MovementRequest {
            product_id: product_id.to_string(),
            kind: kind.to_string(),
            quantity,
            note: None,
        }
    }

    async fn setup(stock: i64) -> (Engine, Product) {
        let engine = Engine::connect(EngineConfig::in_memory()).await.unwrap();
        let created = engine
            .ledger()
            .create_product(new_product("JAM001", stock), &admin())
            .await
            .unwrap();
        (engine, created.product)
    }

    #[tokio::test]
    async fn test_create_product_books_initial_stock() {
        let (engine, product) = setup(50).await;
        assert_eq!(product.stock, 50);
        assert_eq!(product.unit, "unit");
        assert_eq!(product.price_cents, 350);

        let history = engine.ledger().product_history(&product.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, MovementKind::Entry);
        assert_eq!(history[0].quantity, 50);
        assert!(engine.ledger().audit_product(&product.id).await.unwrap().consistent);
    }

    #[tokio::test]
    async fn test_create_product_rules() {
        let (engine, _) = setup(0).await;
        let ledger = engine.ledger();

        let err = ledger
            .create_product(new_product("JAM001", 1), &admin())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Duplicate);

        let err = ledger
            .create_product(new_product("BREAD", 1), &employee())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let manager = Actor::new("u-mgr", Role::Manager);
        assert!(ledger.create_product(new_product("BREAD", 0), &manager).await.is_ok());

        let mut bad_price = new_product("MILK", 0);
        bad_price.price = Some(AmountInput::from("cheap"));
        let err = ledger.create_product(bad_price, &admin()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);

        let err = ledger
            .create_product(new_product("EGGS", -1), &admin())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);

        let err = ledger
            .create_product(new_product("   ", 0), &admin())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
    }

    #[tokio::test]
    async fn test_create_product_without_price_is_free() {
        let engine = Engine::connect(EngineConfig::in_memory()).await.unwrap();
        let request: NewProduct =
            serde_json::from_str(r#"{"code":"A1","name":"Queso"}"#).unwrap();
        assert!(request.price.is_none());

        let created = engine.ledger().create_product(request, &admin()).await.unwrap();
        assert_eq!(created.product.price_cents, 0);
        assert_eq!(created.product.stock, 0);
        assert!(created.opening_movement.is_none());
    }

    #[tokio::test]
    async fn test_failed_movement_insert_rolls_back_stock() {
        let (engine, product) = setup(0).await;
        let db = engine.database();

        let result: Result<(), DbError> = async {
            let mut tx = db.begin().await?;
            let locked = db
                .products()
                .lock(&mut tx, &product.id)
                .await?
                .ok_or_else(|| DbError::not_found("Product", &product.id))?;
            let now = Utc::now();
            db.products().set_stock(&mut tx, &locked.id, 10, now).await?;
            // actor row never created, so the movement trips the users FK
            let orphan = StockMovement {
                id: Uuid::new_v4().to_string(),
                product_id: locked.id.clone(),
                kind: MovementKind::Entry,
                quantity: 10,
                stock_before: 0,
                stock_after: 10,
                note: None,
                actor_id: "u-ghost".to_string(),
                created_at: now,
            };
            db.movements().insert(&mut tx, &orphan).await?;
            tx.commit().await?;
            Ok(())
        }
        .await;

        assert!(matches!(result, Err(DbError::ForeignKeyViolation { .. })));
        let ledger = engine.ledger();
        assert_eq!(ledger.get_product(&product.id).await.unwrap().stock, 0);
        assert!(db.movements().list_for_product(&product.id).await.unwrap().is_empty());
        assert!(ledger.audit_product(&product.id).await.unwrap().consistent);
    }

    #[tokio::test]
    async fn test_exit_beyond_stock_changes_nothing() {
        let (engine, product) = setup(50).await;

        let err = engine
            .ledger()
            .record_movement(movement(&product.id, "EXIT", 60), &employee())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let after = engine.ledger().get_product(&product.id).await.unwrap();
        assert_eq!(after.stock, 50);
        let history = engine.ledger().product_history(&product.id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_entry_adds_stock_and_one_movement() {
        let (engine, product) = setup(50).await;

        let recorded = engine
            .ledger()
            .record_movement(movement(&product.id, "ENTRY", 10), &employee())
            .await
            .unwrap();
        assert_eq!(recorded.product.stock, 60);
        assert_eq!(recorded.movement.kind, MovementKind::Entry);
        assert_eq!(recorded.movement.quantity, 10);
        assert_eq!(recorded.movement.stock_before, 50);
        assert_eq!(recorded.movement.stock_after, 60);
        assert_eq!(recorded.movement.actor_id, "u-emp");

        let history = engine.ledger().product_history(&product.id).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_exit_boundary() {
        let (engine, product) = setup(5).await;
        let ledger = engine.ledger();

        let err = ledger
            .record_movement(movement(&product.id, "exit", 6), &employee())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let ok = ledger
            .record_movement(movement(&product.id, "exit", 5), &employee())
            .await
            .unwrap();
        assert_eq!(ok.product.stock, 0);
    }

    #[tokio::test]
    async fn test_adjust_sets_absolute_level() {
        let (engine, product) = setup(12).await;
        let ledger = engine.ledger();

        let adjusted = ledger
            .record_movement(movement(&product.id, "ADJUST", 3), &employee())
            .await
            .unwrap();
        assert_eq!(adjusted.product.stock, 3);

        let zeroed = ledger
            .record_movement(movement(&product.id, "ADJUST", 0), &employee())
            .await
            .unwrap();
        assert_eq!(zeroed.product.stock, 0);

        let err = ledger
            .record_movement(movement(&product.id, "ADJUST", -4), &employee())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
    }

    #[tokio::test]
    async fn test_invalid_requests() {
        let (engine, product) = setup(10).await;
        let ledger = engine.ledger();

        for (kind, qty) in [("ENTRY", 0), ("EXIT", -1), ("RETURN", 1)] {
            let err = ledger
                .record_movement(movement(&product.id, kind, qty), &employee())
                .await
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidArgument, "{kind} {qty}");
        }

        let err = ledger
            .record_movement(movement("no-such-product", "ENTRY", 1), &employee())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        assert_eq!(ledger.get_product(&product.id).await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_identical_entries_are_not_deduplicated() {
        let (engine, product) = setup(0).await;
        let ledger = engine.ledger();

        for _ in 0..2 {
            ledger
                .record_movement(movement(&product.id, "ENTRY", 4), &employee())
                .await
                .unwrap();
        }

        assert_eq!(ledger.get_product(&product.id).await.unwrap().stock, 8);
        assert_eq!(ledger.product_history(&product.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_replay_and_pairing_hold_after_mixed_sequence() {
        let (engine, product) = setup(50).await;
        let ledger = engine.ledger();

        let steps = [
            ("EXIT", 10),
            ("ENTRY", 7),
            ("EXIT", 60), // rejected
            ("ADJUST", 45),
            ("EXIT", 5),
            ("ENTRY", 0), // rejected
        ];
        for (kind, qty) in steps {
            let _ = ledger
                .record_movement(movement(&product.id, kind, qty), &employee())
                .await;
        }

        let history = ledger.product_history(&product.id).await.unwrap();
        assert_eq!(history.len(), 5);
        for pair in history.windows(2) {
            assert_eq!(pair[0].stock_after, pair[1].stock_before);
        }

        let audit = ledger.audit_product(&product.id).await.unwrap();
        assert!(audit.consistent);
        assert_eq!(audit.stored, 40);
        assert_eq!(audit.replayed, 40);
        assert_eq!(audit.movement_count, 5);
    }

    #[tokio::test]
    async fn test_list_movements_is_admin_only() {
        let (engine, product) = setup(20).await;
        let ledger = engine.ledger();
        engine.database().users().upsert("u-emp", Some("Lucía")).await.unwrap();

        ledger
            .record_movement(movement(&product.id, "EXIT", 2), &employee())
            .await
            .unwrap();

        for role in [Role::Manager, Role::Employee] {
            let err = ledger
                .list_movements(MovementFilter::default(), &Actor::new("x", role))
                .await
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::Forbidden);
        }

        let all = ledger
            .list_movements(MovementFilter::default(), &admin())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].movement.kind, MovementKind::Exit);
        assert_eq!(all[0].product_code, "JAM001");
        assert_eq!(all[0].actor_name.as_deref(), Some("Lucía"));

        let exits = MovementFilter {
            kind: Some("exit".to_string()),
            ..Default::default()
        };
        assert_eq!(ledger.list_movements(exits, &admin()).await.unwrap().len(), 1);

        let one = MovementFilter {
            limit: Some(1),
            ..Default::default()
        };
        assert_eq!(ledger.list_movements(one, &admin()).await.unwrap().len(), 1);

        let zero = MovementFilter {
            limit: Some(0),
            ..Default::default()
        };
        let err = ledger.list_movements(zero, &admin()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
    }

    #[tokio::test]
    async fn test_unknown_product_audit_is_not_found() {
        let (engine, _) = setup(0).await;
        let err = engine.ledger().audit_product("ghost").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_exits_never_oversell() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            database_path: dir.path().join("shopkeep.db"),
            db_max_connections: 8,
            ..EngineConfig::in_memory()
        };
        let engine = Engine::connect(config).await.unwrap();
        let product = engine
            .ledger()
            .create_product(new_product("JAM001", 10), &admin())
            .await
            .unwrap()
            .product;

        let mut handles = Vec::new();
        for i in 0..25 {
            let engine = engine.clone();
            let product_id = product.id.clone();
            handles.push(tokio::spawn(async move {
                let actor = Actor::new(format!("u-{i}"), Role::Employee);
                engine
                    .ledger()
                    .record_movement(movement(&product_id, "EXIT", 1), &actor)
                    .await
            }));
        }

        let mut ok = 0;
        let mut insufficient = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) if e.code == ErrorCode::InsufficientStock => insufficient += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(ok, 10);
        assert_eq!(insufficient, 15);

        let audit = engine.ledger().audit_product(&product.id).await.unwrap();
        assert_eq!(audit.stored, 0);
        assert!(audit.consistent);
        assert_eq!(audit.movement_count, 11);
    }
}
