//! # shopkeep-engine
//!
//! Stock ledger, cash register reconciliation and reporting for a small
//! shop, over the persistence gateway in `shopkeep-db`.
//!
//! ## Module Organization
//! ```text
//! shopkeep_engine/
//! ├── lib.rs          ◄─── Engine handle (you are here)
//! ├── ledger.rs       ◄─── StockLedger: products, movements, audits
//! ├── registers.rs    ◄─── CashRegisterManager: open / update / close
//! ├── reports.rs      ◄─── Reports: dashboard, register analytics
//! ├── config.rs       ◄─── EngineConfig from SHOPKEEP_* variables
//! ├── telemetry.rs    ◄─── tracing subscriber setup
//! ├── error.rs        ◄─── EngineError { code, message }
//! └── main.rs         ◄─── `shopkeep` admin CLI
//! ```
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  caller (HTTP handler, CLI, test) with Actor { user_id, role }          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Engine (Clone + Send + Sync) ──► ledger() / registers() / reports()    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  shopkeep-core: capability check, validation, ledger math               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  shopkeep-db: one transaction per mutation, row lock first              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let engine = Engine::connect(EngineConfig::from_env()).await?;
//! let actor = Actor::new("u-1", Role::Employee);
//!
//! engine.record_movement(MovementRequest {
//!     product_id,
//!     kind: "EXIT".into(),
//!     quantity: 3,
//!     note: None,
//! }, &actor).await?;
//! ```

pub mod config;
pub mod error;
pub mod ledger;
pub mod registers;
pub mod reports;
pub mod telemetry;

use std::sync::Arc;

use tracing::info;

use shopkeep_core::ledger::StockAudit;
use shopkeep_core::register::RegisterFields;
use shopkeep_core::reporting::{DashboardSummary, RegisterAnalytics};
use shopkeep_core::{Actor, MovementEntry, Product};
use shopkeep_db::Database;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult, ErrorCode};
pub use ledger::{
    MovementFilter, MovementRecorded, MovementRequest, NewProduct, ProductCreated, StockLedger,
};
pub use registers::{CashRegisterManager, RegisterFilter, RegisterView};
pub use reports::{AnalyticsFilter, Reports};

/// Shared handle to the engine's services.
///
/// Cloning is cheap: clones share one connection pool and one config.
#[derive(Debug, Clone)]
pub struct Engine {
    db: Database,
    config: Arc<EngineConfig>,
}

impl Engine {
    /// Opens (and migrates) the database named by `config`.
    pub async fn connect(config: EngineConfig) -> EngineResult<Self> {
        if !config.is_in_memory() {
            if let Some(dir) = config.database_path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir).map_err(|e| {
                    tracing::error!(dir = %dir.display(), error = %e, "Cannot create data directory");
                    EngineError::new(ErrorCode::StorageError, "Cannot create data directory")
                })?;
            }
        }

        let db = Database::new(config.db_config()).await?;
        info!(path = %config.database_path.display(), "Engine ready");

        Ok(Engine::new(db, config))
    }

    /// Wraps an already-open database.
    pub fn new(db: Database, config: EngineConfig) -> Self {
        Engine {
            db,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn ledger(&self) -> StockLedger {
        StockLedger::new(self.db.clone(), self.config.clone())
    }

    pub fn registers(&self) -> CashRegisterManager {
        CashRegisterManager::new(self.db.clone())
    }

    pub fn reports(&self) -> Reports {
        Reports::new(self.db.clone(), self.config.clone())
    }

    // =========================================================================
    // Inbound Operations
    // =========================================================================

    pub async fn create_product(&self, request: NewProduct, actor: &Actor) -> EngineResult<ProductCreated> {
        self.ledger().create_product(request, actor).await
    }

    pub async fn record_movement(
        &self,
        request: MovementRequest,
        actor: &Actor,
    ) -> EngineResult<MovementRecorded> {
        self.ledger().record_movement(request, actor).await
    }

    pub async fn list_movements(
        &self,
        filter: MovementFilter,
        actor: &Actor,
    ) -> EngineResult<Vec<MovementEntry>> {
        self.ledger().list_movements(filter, actor).await
    }

    pub async fn list_products(&self) -> EngineResult<Vec<Product>> {
        self.ledger().list_products().await
    }

    pub async fn audit_product(&self, product_id: &str) -> EngineResult<StockAudit> {
        self.ledger().audit_product(product_id).await
    }

    /// `None` opens a new register; `Some(id)` updates it, or closes it
    /// when `closing` is set.
    pub async fn open_or_update_register(
        &self,
        register_id: Option<&str>,
        fields: RegisterFields,
        actor: &Actor,
        closing: bool,
    ) -> EngineResult<RegisterView> {
        self.registers()
            .open_or_update(register_id, fields, actor, closing)
            .await
    }

    pub async fn list_registers(
        &self,
        filter: RegisterFilter,
        actor: &Actor,
    ) -> EngineResult<Vec<RegisterView>> {
        self.registers().list(filter, actor).await
    }

    pub async fn get_register(&self, register_id: &str, actor: &Actor) -> EngineResult<RegisterView> {
        self.registers().get(register_id, actor).await
    }

    pub async fn dashboard_summary(&self) -> EngineResult<DashboardSummary> {
        self.reports().dashboard_summary().await
    }

    pub async fn register_analytics(
        &self,
        filter: AnalyticsFilter,
        actor: &Actor,
    ) -> EngineResult<RegisterAnalytics> {
        self.reports().register_analytics(filter, actor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopkeep_core::register::AmountInput;
    use shopkeep_core::Role;

    fn assert_send_sync<T: Send + Sync + Clone + 'static>() {}

    #[test]
    fn test_engine_is_shareable() {
        assert_send_sync::<Engine>();
    }

    #[tokio::test]
    async fn test_end_to_end_day() {
        let engine = Engine::connect(EngineConfig::in_memory()).await.unwrap();
        let admin = Actor::new("u-admin", Role::Admin);
        let clerk = Actor::new("u-clerk", Role::Employee);

        let created = engine
            .create_product(
                NewProduct {
                    code: "COFFEE".to_string(),
                    name: "Coffee beans".to_string(),
                    description: Some("1kg bag".to_string()),
                    price: Some(AmountInput::from("18.90")),
                    unit: Some("bag".to_string()),
                    category: None,
                    supplier: None,
                    initial_stock: 12,
                },
                &admin,
            )
            .await
            .unwrap();
        let product_id = created.product.id.clone();

        engine
            .record_movement(
                MovementRequest {
                    product_id: product_id.clone(),
                    kind: "EXIT".to_string(),
                    quantity: 2,
                    note: Some("sold".to_string()),
                },
                &clerk,
            )
            .await
            .unwrap();

        let register = engine
            .open_or_update_register(
                None,
                RegisterFields {
                    opening_float: Some(AmountInput::Number(50.0)),
                    ..Default::default()
                },
                &clerk,
                false,
            )
            .await
            .unwrap();
        let closed = engine
            .open_or_update_register(
                Some(&register.entry.record.id),
                RegisterFields {
                    cash_sales: Some(AmountInput::Number(37.8)),
                    closing_float: Some(AmountInput::from("87.80")),
                    ..Default::default()
                },
                &clerk,
                true,
            )
            .await
            .unwrap();
        assert!(!closed.reconciliation.unwrap().flagged);

        let products = engine.list_products().await.unwrap();
        assert_eq!(products[0].stock, 10);
        assert!(engine.audit_product(&product_id).await.unwrap().consistent);
        assert_eq!(
            engine
                .list_movements(MovementFilter::default(), &admin)
                .await
                .unwrap()
                .len(),
            2
        );
        assert_eq!(
            engine
                .list_registers(RegisterFilter::default(), &clerk)
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(engine.get_register(&register.entry.record.id, &clerk).await.is_ok());

        let summary = engine.dashboard_summary().await.unwrap();
        assert_eq!(summary.inventory.inventory_value.cents(), 18_900);
        let analytics = engine
            .register_analytics(AnalyticsFilter::default(), &admin)
            .await
            .unwrap();
        assert_eq!(analytics.closed_registers, 1);
    }
}
