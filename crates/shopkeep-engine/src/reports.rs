//! # Reports
//!
//! Read-only folds over products and registers. Nothing here writes.
//!
//! ```text
//! dashboard_summary()              register_analytics(filter, actor)
//!   products ─► summarize_inventory  closed + visible registers
//!   today's registers ─► summarize_day   └─► analyze_registers
//! ```
//!
//! "Today" is the local calendar day of the machine running the engine.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use shopkeep_core::register::day_bounds;
use shopkeep_core::reporting::{
    analyze_registers, summarize_day, summarize_inventory, DashboardSummary, RegisterAnalytics,
};
use shopkeep_core::{Actor, CashRegisterRecord, Capability};
use shopkeep_db::{Database, RegisterQuery};

use crate::config::EngineConfig;
use crate::error::EngineResult;

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct AnalyticsFilter {
    /// First local business day included.
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    /// Last local business day included.
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Reports {
    db: Database,
    config: Arc<EngineConfig>,
}

impl Reports {
    pub fn new(db: Database, config: Arc<EngineConfig>) -> Self {
        Reports { db, config }
    }

    /// Inventory totals plus today's registers, open or closed.
    pub async fn dashboard_summary(&self) -> EngineResult<DashboardSummary> {
        let generated_at = Utc::now();
        let business_date = generated_at.with_timezone(&Local).date_naive();
        let threshold = self.config.low_stock_threshold;

        let products = self.db.products().list().await?;
        let inventory = summarize_inventory(&products, threshold);

        let query = RegisterQuery {
            opened_between: Some(day_bounds(business_date, &Local)),
            ..Default::default()
        };
        let records: Vec<CashRegisterRecord> = self
            .db
            .registers()
            .list(&query)
            .await?
            .into_iter()
            .map(|entry| entry.record)
            .collect();
        let today = summarize_day(&records);

        debug!(
            products = inventory.product_count,
            low_stock = inventory.low_stock_count,
            registers = records.len(),
            "Dashboard summary built"
        );

        Ok(DashboardSummary {
            business_date,
            generated_at,
            low_stock_threshold: threshold,
            inventory,
            today,
        })
    }

    /// Totals over the closed registers `actor` may see.
    pub async fn register_analytics(
        &self,
        filter: AnalyticsFilter,
        actor: &Actor,
    ) -> EngineResult<RegisterAnalytics> {
        let owner_id = if actor.can(Capability::ViewAllRegisters) {
            filter.owner_id
        } else {
            match filter.owner_id {
                Some(other) if !actor.is(&other) => return Ok(analyze_registers(&[], &Local)),
                _ => Some(actor.user_id.clone()),
            }
        };

        let opened_between = match (filter.from, filter.to) {
            (None, None) => None,
            (from, to) => Some((
                from.map(|d| day_bounds(d, &Local).0).unwrap_or_else(epoch),
                to.map(|d| day_bounds(d, &Local).1).unwrap_or_else(Utc::now),
            )),
        };

        let query = RegisterQuery {
            owner_id,
            opened_between,
            closed: Some(true),
            limit: None,
        };
        let entries = self.db.registers().list(&query).await?;
        debug!(count = entries.len(), "Register analytics input loaded");

        Ok(analyze_registers(&entries, &Local))
    }
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}
