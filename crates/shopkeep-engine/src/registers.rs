//! # Cash Register Manager
//!
//! Opens, updates and closes per-user cash registers.
//!
//! ## One Entry Point, Three Paths
//! ```text
//! open_or_update(id, fields, actor, closing)
//!      │
//!      ├── id = None ───────────────► open   (defaults: 0, closing float unset)
//!      ├── id = Some, closing=false ► update (absent fields keep old values)
//!      └── id = Some, closing=true ─► close  (update + closed=true)
//!
//! close: closingFloat + cashSales must be in the request,
//!        checked before the database is touched.
//! ```
//!
//! A closed register never reopens. Administrators may still correct its
//! figures; `closed_at` keeps the original close time.

use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use shopkeep_core::register::{
    authorize_update, can_view, day_bounds, require_close_inputs, Reconciliation,
    RegisterAmounts, RegisterFields,
};
use shopkeep_core::{
    Actor, Capability, CashRegisterRecord, CoreError, RegisterEntry, RegisterStatus,
};
use shopkeep_db::{Database, DbError, RegisterQuery};

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Requests & Responses
// =============================================================================

/// A register as callers see it: record, owner name, status and, once a
/// closing float exists, its reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterView {
    #[serde(flatten)]
    #[ts(flatten)]
    pub entry: RegisterEntry,
    pub status: RegisterStatus,
    pub reconciliation: Option<Reconciliation>,
}

impl From<RegisterEntry> for RegisterView {
    fn from(entry: RegisterEntry) -> Self {
        RegisterView {
            status: entry.record.status(),
            reconciliation: entry.record.reconciliation(),
            entry,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct RegisterFilter {
    /// Local business day.
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    pub owner_id: Option<String>,
    pub open_only: bool,
}

// =============================================================================
// Service
// =============================================================================

#[derive(Debug, Clone)]
pub struct CashRegisterManager {
    db: Database,
}

impl CashRegisterManager {
    pub fn new(db: Database) -> Self {
        CashRegisterManager { db }
    }

    /// Dispatches to [`open`](Self::open), [`update`](Self::update) or
    /// [`close`](Self::close).
    pub async fn open_or_update(
        &self,
        register_id: Option<&str>,
        fields: RegisterFields,
        actor: &Actor,
        closing: bool,
    ) -> EngineResult<RegisterView> {
        match register_id {
            None => self.open(fields, actor, closing).await,
            Some(id) if closing => self.close(id, fields, actor).await,
            Some(id) => self.update(id, fields, actor).await,
        }
    }

    /// Opens a register owned by `actor`. With `closing` the register is
    /// opened and closed in one step.
    pub async fn open(
        &self,
        fields: RegisterFields,
        actor: &Actor,
        closing: bool,
    ) -> EngineResult<RegisterView> {
        actor.require(Capability::OwnRegister)?;
        if closing {
            require_close_inputs(&fields)?;
        }
        let amounts = RegisterAmounts::for_new_register(&fields)?;

        let now = Utc::now();
        let mut record = CashRegisterRecord {
            id: Uuid::new_v4().to_string(),
            owner_id: actor.user_id.clone(),
            opened_at: now,
            opening_float_cents: 0,
            closing_float_cents: None,
            cash_sales_cents: 0,
            card_sales_cents: 0,
            transfer_sales_cents: 0,
            expenses_cents: 0,
            notes: String::new(),
            closed: closing,
            closed_at: closing.then_some(now),
            created_at: now,
            updated_at: now,
        };
        apply_amounts(&mut record, amounts);

        let mut tx = self.db.begin().await?;
        self.db.users().ensure(&mut tx, &record.owner_id).await?;
        self.db.registers().insert(&mut tx, &record).await?;
        let owner_name = self.db.users().name_within(&mut tx, &record.owner_id).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            id = %record.id,
            owner = %record.owner_id,
            opening_float = %record.opening_float(),
            closed = record.closed,
            "Cash register opened"
        );
        log_reconciliation(&record);

        Ok(RegisterView::from(RegisterEntry { record, owner_name }))
    }

    /// Merges `fields` onto an open register (or a closed one, for
    /// administrators).
    pub async fn update(
        &self,
        register_id: &str,
        fields: RegisterFields,
        actor: &Actor,
    ) -> EngineResult<RegisterView> {
        self.save(register_id, fields, actor, false).await
    }

    /// Merges `fields` and closes the register.
    pub async fn close(
        &self,
        register_id: &str,
        fields: RegisterFields,
        actor: &Actor,
    ) -> EngineResult<RegisterView> {
        require_close_inputs(&fields).map_err(|e| {
            warn!(id = %register_id, error = %e, "Close rejected");
            e
        })?;
        self.save(register_id, fields, actor, true).await
    }

    async fn save(
        &self,
        register_id: &str,
        fields: RegisterFields,
        actor: &Actor,
        closing: bool,
    ) -> EngineResult<RegisterView> {
        let mut tx = self.db.begin().await?;

        let current = self
            .db
            .registers()
            .lock(&mut tx, register_id)
            .await?
            .ok_or_else(|| CoreError::RegisterNotFound(register_id.to_string()))?;

        if let Err(e) = authorize_update(&current, actor) {
            warn!(id = %register_id, actor = %actor.user_id, error = %e, "Register update refused");
            return Err(e.into());
        }

        let amounts = RegisterAmounts::merged_onto(&current, &fields)?;

        let now = Utc::now();
        let mut next = current.clone();
        apply_amounts(&mut next, amounts);
        next.updated_at = now;
        if closing && !current.closed {
            next.closed = true;
            next.closed_at = Some(now);
        }

        let saved = self.db.registers().save(&mut tx, &next).await?;
        let owner_name = self.db.users().name_within(&mut tx, &saved.owner_id).await?;
        tx.commit().await.map_err(DbError::from)?;

        if current.closed {
            info!(id = %saved.id, actor = %actor.user_id, "Closed register overridden");
        } else if saved.closed {
            info!(id = %saved.id, actor = %actor.user_id, "Cash register closed");
        } else {
            debug!(id = %saved.id, "Cash register updated");
        }
        log_reconciliation(&saved);

        Ok(RegisterView::from(RegisterEntry {
            record: saved,
            owner_name,
        }))
    }

    /// Registers visible to `actor`, newest first.
    ///
    /// Without `ViewAllRegisters` only the actor's own registers come back,
    /// whatever `owner_id` asks for.
    pub async fn list(&self, filter: RegisterFilter, actor: &Actor) -> EngineResult<Vec<RegisterView>> {
        let owner_id = if actor.can(Capability::ViewAllRegisters) {
            filter.owner_id
        } else {
            match filter.owner_id {
                Some(other) if !actor.is(&other) => return Ok(Vec::new()),
                _ => Some(actor.user_id.clone()),
            }
        };

        let query = RegisterQuery {
            owner_id,
            opened_between: filter.date.map(|date| day_bounds(date, &Local)),
            closed: filter.open_only.then_some(false),
            limit: None,
        };

        let entries = self.db.registers().list(&query).await?;
        debug!(count = entries.len(), "Registers listed");
        Ok(entries.into_iter().map(RegisterView::from).collect())
    }

    /// One register. Registers the actor may not see are reported as
    /// missing.
    pub async fn get(&self, register_id: &str, actor: &Actor) -> EngineResult<RegisterView> {
        let view = self.view(register_id).await?;
        if !can_view(&view.entry.record.owner_id, actor) {
            return Err(EngineError::not_found("Cash register", register_id));
        }
        Ok(view)
    }

    async fn view(&self, register_id: &str) -> EngineResult<RegisterView> {
        self.db
            .registers()
            .get(register_id)
            .await?
            .map(RegisterView::from)
            .ok_or_else(|| EngineError::not_found("Cash register", register_id))
    }
}

fn apply_amounts(record: &mut CashRegisterRecord, amounts: RegisterAmounts) {
    record.opening_float_cents = amounts.opening_float.cents();
    record.closing_float_cents = amounts.closing_float.map(|m| m.cents());
    record.cash_sales_cents = amounts.cash_sales.cents();
    record.card_sales_cents = amounts.card_sales.cents();
    record.transfer_sales_cents = amounts.transfer_sales.cents();
    record.expenses_cents = amounts.expenses.cents();
    record.notes = amounts.notes;
}

fn log_reconciliation(record: &CashRegisterRecord) {
    if !record.closed {
        return;
    }
    if let Some(r) = record.reconciliation() {
        if r.flagged {
            warn!(
                id = %record.id,
                expected = %r.expected_cash,
                counted = %r.counted_cash,
                difference = %r.difference,
                "Register closed with a discrepancy"
            );
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::{Engine, EngineConfig};
    use shopkeep_core::register::AmountInput;
    use shopkeep_core::{Money, Role};

    fn owner() -> Actor {
        Actor::new("u-ana", Role::Employee)
    }

    fn admin() -> Actor {
        Actor::new("u-admin", Role::Admin)
    }

    fn amount(n: f64) -> Option<AmountInput> {
        Some(AmountInput::Number(n))
    }

    async fn engine() -> Engine {
        Engine::connect(EngineConfig::in_memory()).await.unwrap()
    }

    async fn open_with_float(engine: &Engine, float: f64) -> RegisterView {
        let fields = RegisterFields {
            opening_float: amount(float),
            ..Default::default()
        };
        engine.registers().open(fields, &owner(), false).await.unwrap()
    }

    fn closing(cash_sales: f64, expenses: f64, closing_float: f64) -> RegisterFields {
        RegisterFields {
            cash_sales: amount(cash_sales),
            expenses: amount(expenses),
            closing_float: amount(closing_float),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_open_defaults() {
        let engine = engine().await;
        let fields = RegisterFields {
            opening_float: Some(AmountInput::from("abc")),
            card_sales: Some(AmountInput::from("12.50")),
            ..Default::default()
        };
        let view = engine.registers().open(fields, &owner(), false).await.unwrap();
        let record = &view.entry.record;

        assert_eq!(record.opening_float_cents, 0);
        assert_eq!(record.card_sales_cents, 1250);
        assert_eq!(record.closing_float_cents, None);
        assert_eq!(record.owner_id, "u-ana");
        assert_eq!(view.status, RegisterStatus::Open);
        assert!(view.reconciliation.is_none());
    }

    #[tokio::test]
    async fn test_balanced_close_is_not_flagged() {
        let engine = engine().await;
        let opened = open_with_float(&engine, 1000.0).await;

        let closed = engine
            .registers()
            .close(&opened.entry.record.id, closing(500.0, 50.0, 1450.0), &owner())
            .await
            .unwrap();

        let r = closed.reconciliation.unwrap();
        assert_eq!(r.expected_cash, Money::from_major_minor(1450, 0));
        assert_eq!(r.difference, Money::zero());
        assert!(!r.flagged);
        assert_eq!(closed.status, RegisterStatus::Closed);
        assert!(closed.entry.record.closed_at.is_some());
    }

    #[tokio::test]
    async fn test_short_close_is_flagged() {
        let engine = engine().await;
        let opened = open_with_float(&engine, 1000.0).await;

        let closed = engine
            .registers()
            .close(&opened.entry.record.id, closing(500.0, 50.0, 1400.0), &owner())
            .await
            .unwrap();

        let r = closed.reconciliation.unwrap();
        assert_eq!(r.difference, Money::from_cents(-5000));
        assert!(r.flagged);
    }

    #[tokio::test]
    async fn test_card_and_transfer_do_not_reconcile() {
        let engine = engine().await;
        let opened = open_with_float(&engine, 100.0).await;

        let mut fields = closing(20.0, 0.0, 120.0);
        fields.card_sales = amount(999.0);
        fields.transfer_sales = amount(55.5);
        let closed = engine
            .registers()
            .close(&opened.entry.record.id, fields, &owner())
            .await
            .unwrap();

        assert!(!closed.reconciliation.unwrap().flagged);
    }

    #[tokio::test]
    async fn test_returned_view_is_the_committed_state() {
        let engine = engine().await;
        engine.database().users().upsert("u-ana", Some("Ana")).await.unwrap();

        let opened = open_with_float(&engine, 100.0).await;
        assert_eq!(opened.entry.owner_name.as_deref(), Some("Ana"));

        let closed = engine
            .registers()
            .close(&opened.entry.record.id, closing(20.0, 0.0, 120.0), &owner())
            .await
            .unwrap();
        let fetched = engine
            .registers()
            .get(&opened.entry.record.id, &owner())
            .await
            .unwrap();

        assert_eq!(closed.entry, fetched.entry);
        assert_eq!(closed.status, fetched.status);
        assert_eq!(closed.reconciliation, fetched.reconciliation);
    }

    #[tokio::test]
    async fn test_huge_amounts_saturate_instead_of_overflowing() {
        let engine = engine().await;
        let opened = open_with_float(&engine, 9.0e16).await;

        let closed = engine
            .registers()
            .close(&opened.entry.record.id, closing(9.0e16, 0.0, 0.0), &owner())
            .await
            .unwrap();

        let r = closed.reconciliation.unwrap();
        assert_eq!(r.expected_cash, Money::from_cents(i64::MAX));
        assert_eq!(r.difference, Money::from_cents(-i64::MAX));
        assert!(r.flagged);

        let summary = engine.reports().dashboard_summary().await.unwrap();
        assert_eq!(summary.today.flagged_registers, 1);
        assert_eq!(summary.today.sales.cash, Money::from_cents(9_000_000_000_000_000_000));
    }

    #[tokio::test]
    async fn test_close_without_cash_sales_changes_nothing() {
        let engine = engine().await;
        let opened = open_with_float(&engine, 1000.0).await;
        let id = opened.entry.record.id.clone();

        let fields = RegisterFields {
            closing_float: amount(1450.0),
            expenses: amount(50.0),
            ..Default::default()
        };
        let err = engine.registers().close(&id, fields, &owner()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let after = engine.registers().get(&id, &owner()).await.unwrap();
        assert_eq!(after.entry.record, opened.entry.record);
    }

    #[tokio::test]
    async fn test_close_with_garbage_float_is_rejected() {
        let engine = engine().await;
        let opened = open_with_float(&engine, 10.0).await;

        let fields = RegisterFields {
            closing_float: Some(AmountInput::from("n/a")),
            cash_sales: amount(0.0),
            ..Default::default()
        };
        let err = engine
            .registers()
            .close(&opened.entry.record.id, fields, &owner())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_non_owner_cannot_update() {
        let engine = engine().await;
        let opened = open_with_float(&engine, 1000.0).await;
        let id = opened.entry.record.id.clone();

        let intruder = Actor::new("u-bea", Role::Manager);
        let fields = RegisterFields {
            cash_sales: amount(1.0),
            ..Default::default()
        };
        let err = engine
            .registers()
            .update(&id, fields, &intruder)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let after = engine.registers().get(&id, &owner()).await.unwrap();
        assert_eq!(after.entry.record, opened.entry.record);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let engine = engine().await;
        let opened = open_with_float(&engine, 200.0).await;
        let id = opened.entry.record.id.clone();

        let fields = RegisterFields {
            cash_sales: amount(35.25),
            expenses: Some(AmountInput::from("oops")),
            notes: Some("  shift A  ".to_string()),
            ..Default::default()
        };
        let updated = engine.registers().update(&id, fields, &owner()).await.unwrap();
        let record = &updated.entry.record;

        assert_eq!(record.opening_float_cents, 20_000);
        assert_eq!(record.cash_sales_cents, 3525);
        assert_eq!(record.expenses_cents, 0);
        assert_eq!(record.notes, "shift A");
        assert!(!record.closed);

        let again = engine
            .registers()
            .update(&id, RegisterFields::default(), &owner())
            .await
            .unwrap();
        assert_eq!(again.entry.record.notes, "shift A");
        assert_eq!(again.entry.record.cash_sales_cents, 3525);
    }

    #[tokio::test]
    async fn test_closed_register_is_immutable_to_owner() {
        let engine = engine().await;
        let opened = open_with_float(&engine, 100.0).await;
        let id = opened.entry.record.id.clone();
        let closed = engine
            .registers()
            .close(&id, closing(10.0, 0.0, 110.0), &owner())
            .await
            .unwrap();

        let fields = RegisterFields {
            cash_sales: amount(99.0),
            ..Default::default()
        };
        let err = engine.registers().update(&id, fields.clone(), &owner()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);

        let manager = Actor::new("u-ana", Role::Manager);
        let err = engine.registers().update(&id, fields, &manager).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);

        let after = engine.registers().get(&id, &owner()).await.unwrap();
        assert_eq!(after.entry.record, closed.entry.record);
    }

    #[tokio::test]
    async fn test_admin_override_keeps_register_closed() {
        let engine = engine().await;
        let opened = open_with_float(&engine, 100.0).await;
        let id = opened.entry.record.id.clone();
        let closed = engine
            .registers()
            .close(&id, closing(10.0, 0.0, 110.0), &owner())
            .await
            .unwrap();

        let fields = RegisterFields {
            cash_sales: amount(12.0),
            ..Default::default()
        };
        let corrected = engine.registers().update(&id, fields, &admin()).await.unwrap();
        let record = &corrected.entry.record;

        assert!(record.closed);
        assert_eq!(record.cash_sales_cents, 1200);
        assert_eq!(record.closed_at, closed.entry.record.closed_at);
        assert!(corrected.reconciliation.unwrap().flagged);

        let reclosed = engine
            .registers()
            .close(&id, closing(10.0, 0.0, 110.0), &admin())
            .await
            .unwrap();
        assert!(reclosed.entry.record.closed);
        assert_eq!(reclosed.entry.record.closed_at, closed.entry.record.closed_at);
    }

    #[tokio::test]
    async fn test_open_or_update_dispatch() {
        let engine = engine().await;
        let registers = engine.registers();

        let opened = registers
            .open_or_update(None, RegisterFields::default(), &owner(), false)
            .await
            .unwrap();
        let id = opened.entry.record.id.clone();

        let updated = registers
            .open_or_update(Some(&id), closing(5.0, 0.0, 0.0), &owner(), false)
            .await
            .unwrap();
        assert!(!updated.entry.record.closed);

        let closed = registers
            .open_or_update(Some(&id), closing(5.0, 0.0, 5.0), &owner(), true)
            .await
            .unwrap();
        assert!(closed.entry.record.closed);

        let instant = registers
            .open_or_update(None, closing(1.0, 0.0, 1.0), &owner(), true)
            .await
            .unwrap();
        assert!(instant.entry.record.closed);

        let err = registers
            .open_or_update(None, RegisterFields::default(), &owner(), true)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = registers
            .open_or_update(Some("ghost"), RegisterFields::default(), &owner(), false)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_list_visibility() {
        let engine = engine().await;
        engine.database().users().upsert("u-ana", Some("Ana")).await.unwrap();

        open_with_float(&engine, 10.0).await;
        let other = Actor::new("u-bea", Role::Employee);
        let theirs = engine
            .registers()
            .open(RegisterFields::default(), &other, false)
            .await
            .unwrap();
        engine
            .registers()
            .close(&theirs.entry.record.id, closing(0.0, 0.0, 0.0), &other)
            .await
            .unwrap();

        let mine = engine.registers().list(RegisterFilter::default(), &owner()).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].entry.owner_name.as_deref(), Some("Ana"));

        let snooping = RegisterFilter {
            owner_id: Some("u-bea".to_string()),
            ..Default::default()
        };
        assert!(engine.registers().list(snooping, &owner()).await.unwrap().is_empty());

        let all = engine.registers().list(RegisterFilter::default(), &admin()).await.unwrap();
        assert_eq!(all.len(), 2);

        let open_only = RegisterFilter {
            open_only: true,
            ..Default::default()
        };
        assert_eq!(engine.registers().list(open_only, &admin()).await.unwrap().len(), 1);

        let today = RegisterFilter {
            date: Some(Local::now().date_naive()),
            ..Default::default()
        };
        assert_eq!(engine.registers().list(today, &admin()).await.unwrap().len(), 2);

        let long_ago = RegisterFilter {
            date: NaiveDate::from_ymd_opt(2001, 1, 1),
            ..Default::default()
        };
        assert!(engine.registers().list(long_ago, &admin()).await.unwrap().is_empty());

        let err = engine
            .registers()
            .get(&theirs.entry.record.id, &owner())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(engine.registers().get(&theirs.entry.record.id, &admin()).await.is_ok());
    }
}
