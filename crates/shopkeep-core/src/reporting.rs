//! # Reporting Folds
//!
//! Read-only summaries computed over rows the caller already loaded.
//! Nothing here mutates or queries; the engine decides which rows to pass.
//!
//! ```text
//!   products ─────────► summarize_inventory ──► InventorySummary ─┐
//!   today's registers ─► summarize_day ────────► DaySummary ──────┴─► DashboardSummary
//!
//!   closed, visible registers ─► analyze_registers ─► RegisterAnalytics
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::register::business_day;
use crate::types::{CashRegisterRecord, Product, RegisterEntry};

// =============================================================================
// Summary Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InventorySummary {
    pub product_count: usize,
    pub low_stock_count: usize,
    /// Σ price × stock.
    pub inventory_value: Money,
}

/// Sales split by how the customer paid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesByMethod {
    pub cash: Money,
    pub card: Money,
    pub transfer: Money,
}

impl SalesByMethod {
    pub fn total(&self) -> Money {
        self.cash + self.card + self.transfer
    }

    fn add(&mut self, record: &CashRegisterRecord) {
        self.cash += record.cash_sales();
        self.card += record.card_sales();
        self.transfer += record.transfer_sales();
    }
}

/// Register activity for one business day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DaySummary {
    pub open_registers: usize,
    pub closed_registers: usize,
    /// Closed registers whose count is off by more than the tolerance.
    pub flagged_registers: usize,
    pub sales: SalesByMethod,
    pub total_sales: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardSummary {
    #[ts(as = "String")]
    pub business_date: NaiveDate,
    #[ts(as = "String")]
    pub generated_at: DateTime<Utc>,
    pub low_stock_threshold: i64,
    pub inventory: InventorySummary,
    pub today: DaySummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserSales {
    pub user_id: String,
    /// Display name, or the user id when no name is known.
    pub label: String,
    pub registers: usize,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DailySales {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub registers: usize,
    pub total: Money,
}

/// Aggregates over closed registers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterAnalytics {
    pub closed_registers: usize,
    pub total_sales: Money,
    pub total_expenses: Money,
    pub flagged_registers: usize,
    /// 0.0 when there are no registers.
    pub flagged_percentage: f64,
    pub total_absolute_difference: Money,
    /// Integer division in cents; 0 when there are no registers.
    pub average_sales: Money,
    pub by_method: SalesByMethod,
    /// Highest total first.
    pub by_user: Vec<UserSales>,
    /// Oldest day first.
    pub by_day: Vec<DailySales>,
}

// =============================================================================
// Folds
// =============================================================================

pub fn summarize_inventory(products: &[Product], low_stock_threshold: i64) -> InventorySummary {
    InventorySummary {
        product_count: products.len(),
        low_stock_count: products
            .iter()
            .filter(|p| p.is_low_stock(low_stock_threshold))
            .count(),
        inventory_value: products.iter().map(Product::stock_value).sum(),
    }
}

/// Summarizes every register of one day, open or closed.
pub fn summarize_day(records: &[CashRegisterRecord]) -> DaySummary {
    let mut sales = SalesByMethod::default();
    let mut open_registers = 0;
    let mut flagged_registers = 0;

    for record in records {
        sales.add(record);
        if !record.closed {
            open_registers += 1;
        } else if record.reconciliation().is_some_and(|r| r.flagged) {
            flagged_registers += 1;
        }
    }

    DaySummary {
        open_registers,
        closed_registers: records.len() - open_registers,
        flagged_registers,
        total_sales: sales.total(),
        sales,
    }
}

/// Aggregates closed registers. Open ones in `entries` are skipped.
pub fn analyze_registers<Tz: TimeZone>(entries: &[RegisterEntry], tz: &Tz) -> RegisterAnalytics {
    let mut by_method = SalesByMethod::default();
    let mut total_expenses = Money::zero();
    let mut total_absolute_difference = Money::zero();
    let mut flagged_registers = 0;
    let mut count = 0usize;
    let mut users: BTreeMap<&str, UserSales> = BTreeMap::new();
    let mut days: BTreeMap<NaiveDate, DailySales> = BTreeMap::new();

    for entry in entries.iter().filter(|e| e.record.closed) {
        let record = &entry.record;
        count += 1;
        by_method.add(record);
        total_expenses += record.expenses();

        if let Some(r) = record.reconciliation() {
            total_absolute_difference += r.difference.abs();
            if r.flagged {
                flagged_registers += 1;
            }
        }

        let sales = record.total_sales();

        let user = users.entry(record.owner_id.as_str()).or_insert_with(|| UserSales {
            user_id: record.owner_id.clone(),
            label: entry.owner_label().to_string(),
            registers: 0,
            total: Money::zero(),
        });
        user.registers += 1;
        user.total += sales;

        let date = business_day(record.opened_at, tz);
        let day = days.entry(date).or_insert_with(|| DailySales {
            date,
            registers: 0,
            total: Money::zero(),
        });
        day.registers += 1;
        day.total += sales;
    }

    let total_sales = by_method.total();
    let (flagged_percentage, average_sales) = if count == 0 {
        (0.0, Money::zero())
    } else {
        (
            flagged_registers as f64 / count as f64 * 100.0,
            Money::from_cents(total_sales.cents() / count as i64),
        )
    };

    let mut by_user: Vec<UserSales> = users.into_values().collect();
    by_user.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.label.cmp(&b.label)));

    RegisterAnalytics {
        closed_registers: count,
        total_sales,
        total_expenses,
        flagged_registers,
        flagged_percentage,
        total_absolute_difference,
        average_sales,
        by_method,
        by_user,
        by_day: days.into_values().collect(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
