//! # Cash Register Rules
//!
//! Lifecycle rules for a register record and the reconciliation math.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   open(fields) ───► OPEN ──update(fields)──► OPEN                       │
//! │                      │                                                  │
//! │                      └──close(fields)──► CLOSED (terminal)              │
//! │                                            │                            │
//! │                                            └─ admin override: amounts   │
//! │                                               change, still CLOSED      │
//! │                                                                         │
//! │   update/close by non-owner without ManageAnyRegister ──► Forbidden     │
//! │   update/close on CLOSED without OverrideClosedRegister ──► Conflict    │
//! │   close without closingFloat + cashSales in request ──► Validation      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Reconciliation
//! ```text
//! expected   = opening_float + cash_sales - expenses
//! difference = closing_float - expected     (+ excess, - shortage)
//! flagged    = |difference| > 1 cent
//! ```
//! Card and transfer sales never reach the drawer, so they stay out.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::auth::{Actor, Capability};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::CashRegisterRecord;
use crate::MAX_NOTE_LEN;

/// Differences up to this size are rounding noise.
pub const DISCREPANCY_TOLERANCE: Money = Money::from_cents(1);

// =============================================================================
// Reconciliation
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Reconciliation {
    pub expected_cash: Money,
    pub counted_cash: Money,
    pub difference: Money,
    pub flagged: bool,
}

/// Compares counted cash with what the drawer should hold.
pub fn reconcile(
    opening_float: Money,
    cash_sales: Money,
    expenses: Money,
    counted_cash: Money,
) -> Reconciliation {
    let expected_cash = opening_float + cash_sales - expenses;
    let difference = counted_cash - expected_cash;
    Reconciliation {
        expected_cash,
        counted_cash,
        difference,
        flagged: difference.abs() > DISCREPANCY_TOLERANCE,
    }
}

impl CashRegisterRecord {
    /// `None` until a closing float has been counted.
    pub fn reconciliation(&self) -> Option<Reconciliation> {
        self.closing_float().map(|counted| {
            reconcile(
                self.opening_float(),
                self.cash_sales(),
                self.expenses(),
                counted,
            )
        })
    }
}

// =============================================================================
// Amount Inputs
// =============================================================================

/// A register amount as typed into a form: a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

impl AmountInput {
    /// `None` when the input is not a finite number.
    pub fn to_money(&self) -> Option<Money> {
        match self {
            AmountInput::Number(n) => Money::from_amount(*n),
            AmountInput::Text(s) => Money::parse_amount(s),
        }
    }
}

impl From<f64> for AmountInput {
    fn from(n: f64) -> Self {
        AmountInput::Number(n)
    }
}

impl From<&str> for AmountInput {
    fn from(s: &str) -> Self {
        AmountInput::Text(s.to_string())
    }
}

/// Fields a caller may send when opening, updating or closing a register.
///
/// Every field is optional. What an absent or unparsable field means
/// depends on the operation: zero when opening, "keep" when updating.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct RegisterFields {
    pub opening_float: Option<AmountInput>,
    pub closing_float: Option<AmountInput>,
    pub cash_sales: Option<AmountInput>,
    pub card_sales: Option<AmountInput>,
    pub transfer_sales: Option<AmountInput>,
    pub expenses: Option<AmountInput>,
    pub notes: Option<String>,
}

fn parsed(input: &Option<AmountInput>) -> Option<Money> {
    input.as_ref().and_then(AmountInput::to_money)
}

/// Fails unless the request itself carries a numeric closing float and
/// cash sales figure. Zero counts as present.
pub fn require_close_inputs(fields: &RegisterFields) -> CoreResult<()> {
    let mut missing = Vec::new();
    if parsed(&fields.closing_float).is_none() {
        missing.push("closingFloat".to_string());
    }
    if parsed(&fields.cash_sales).is_none() {
        missing.push("cashSales".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CoreError::IncompleteClose { missing })
    }
}

// =============================================================================
// Resolved Amounts
// =============================================================================

/// Register figures after defaults or merge rules have been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterAmounts {
    pub opening_float: Money,
    pub closing_float: Option<Money>,
    pub cash_sales: Money,
    pub card_sales: Money,
    pub transfer_sales: Money,
    pub expenses: Money,
    pub notes: String,
}

impl RegisterAmounts {
    /// Amounts for a brand-new register: absent or garbage means zero,
    /// except the closing float which stays unset.
    pub fn for_new_register(fields: &RegisterFields) -> CoreResult<Self> {
        Ok(RegisterAmounts {
            opening_float: parsed(&fields.opening_float).unwrap_or_default(),
            closing_float: parsed(&fields.closing_float),
            cash_sales: parsed(&fields.cash_sales).unwrap_or_default(),
            card_sales: parsed(&fields.card_sales).unwrap_or_default(),
            transfer_sales: parsed(&fields.transfer_sales).unwrap_or_default(),
            expenses: parsed(&fields.expenses).unwrap_or_default(),
            notes: checked_notes(fields.notes.as_deref())?.unwrap_or_default(),
        })
    }

    /// Amounts for an existing register: absent or garbage keeps what
    /// the record already holds.
    pub fn merged_onto(record: &CashRegisterRecord, fields: &RegisterFields) -> CoreResult<Self> {
        Ok(RegisterAmounts {
            opening_float: parsed(&fields.opening_float).unwrap_or(record.opening_float()),
            closing_float: parsed(&fields.closing_float).or(record.closing_float()),
            cash_sales: parsed(&fields.cash_sales).unwrap_or(record.cash_sales()),
            card_sales: parsed(&fields.card_sales).unwrap_or(record.card_sales()),
            transfer_sales: parsed(&fields.transfer_sales).unwrap_or(record.transfer_sales()),
            expenses: parsed(&fields.expenses).unwrap_or(record.expenses()),
            notes: checked_notes(fields.notes.as_deref())?.unwrap_or_else(|| record.notes.clone()),
        })
    }

    pub fn reconciliation(&self) -> Option<Reconciliation> {
        self.closing_float
            .map(|counted| reconcile(self.opening_float, self.cash_sales, self.expenses, counted))
    }
}

fn checked_notes(notes: Option<&str>) -> CoreResult<Option<String>> {
    match notes {
        Some(text) if text.chars().count() > MAX_NOTE_LEN => Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTE_LEN,
        }
        .into()),
        Some(text) => Ok(Some(text.trim().to_string())),
        None => Ok(None),
    }
}

// =============================================================================
// Authority
// =============================================================================

/// May `actor` change `record`? Ownership is checked before closed state.
pub fn authorize_update(record: &CashRegisterRecord, actor: &Actor) -> CoreResult<()> {
    actor.require(Capability::OwnRegister)?;

    if !actor.is(&record.owner_id) && !actor.can(Capability::ManageAnyRegister) {
        return Err(CoreError::Forbidden(format!(
            "{} may not {}",
            actor.role,
            Capability::ManageAnyRegister.describe()
        )));
    }

    if record.closed && !actor.can(Capability::OverrideClosedRegister) {
        return Err(CoreError::RegisterClosed(record.id.clone()));
    }

    Ok(())
}

/// Non-admins only ever see their own registers.
pub fn can_view(owner_id: &str, actor: &Actor) -> bool {
    actor.is(owner_id) || actor.can(Capability::ViewAllRegisters)
}

// =============================================================================
// Business Days
// =============================================================================

/// UTC bounds of a local business day: `[00:00:00.000, 23:59:59.999]`.
///
/// ```rust
/// use chrono::{NaiveDate, Utc};
/// use shopkeep_core::register::day_bounds;
///
/// let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
/// let (start, end) = day_bounds(day, &Utc);
/// assert_eq!(start.to_rfc3339(), "2026-03-14T00:00:00+00:00");
/// assert_eq!(end.to_rfc3339(), "2026-03-14T23:59:59.999+00:00");
/// ```
pub fn day_bounds<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(chrono::NaiveTime::default());
    let end = start + chrono::Duration::milliseconds(86_400_000 - 1);
    (resolve_local(tz, start, true), resolve_local(tz, end, false))
}

/// Local calendar date of an instant.
pub fn business_day<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime, earliest: bool) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(first, last) => {
            if earliest {
                first.with_timezone(&Utc)
            } else {
                last.with_timezone(&Utc)
            }
        }
        // Skipped by a DST jump: step toward the inside of the day.
        LocalResult::None => {
            let shifted = if earliest {
                naive + chrono::Duration::hours(1)
            } else {
                naive - chrono::Duration::hours(1)
            };
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use chrono::FixedOffset;

    fn record(owner: &str, closed: bool) -> CashRegisterRecord {
        let now = Utc::now();
        CashRegisterRecord {
            id: "r-1".to_string(),
            owner_id: owner.to_string(),
            opened_at: now,
            opening_float_cents: 100_000,
            closing_float_cents: None,
            cash_sales_cents: 50_000,
            card_sales_cents: 20_000,
            transfer_sales_cents: 5_000,
            expenses_cents: 5_000,
            notes: "morning".to_string(),
            closed,
            closed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn m(major: i64) -> Money {
        Money::from_major_minor(major, 0)
    }

    #[test]
    fn test_reconcile_shortage() {
        let r = reconcile(m(1000), m(500), m(50), m(1400));
        assert_eq!(r.expected_cash, m(1450));
        assert_eq!(r.difference, Money::from_cents(-5000));
        assert!(r.flagged);
    }

    #[test]
    fn test_reconcile_exact_and_tolerance() {
        assert!(!reconcile(m(1000), m(500), m(50), m(1450)).flagged);

        let one_cent_over = m(1450) + Money::from_cents(1);
        assert!(!reconcile(m(1000), m(500), m(50), one_cent_over).flagged);

        let two_cents_under = m(1450) - Money::from_cents(2);
        let r = reconcile(m(1000), m(500), m(50), two_cents_under);
        assert!(r.flagged);
        assert_eq!(r.difference.cents(), -2);
    }

    #[test]
    fn test_card_and_transfer_ignored() {
        let mut rec = record("u-1", true);
        rec.closing_float_cents = Some(145_000);
        let r = rec.reconciliation().unwrap();
        assert!(!r.flagged);

        rec.card_sales_cents = 9_999_999;
        rec.transfer_sales_cents = 1;
        assert_eq!(rec.reconciliation().unwrap(), r);
    }

    #[test]
    fn test_no_reconciliation_without_count() {
        assert!(record("u-1", false).reconciliation().is_none());
    }

    #[test]
    fn test_amount_input_parsing() {
        assert_eq!(AmountInput::from(12.5).to_money(), Some(Money::from_cents(1250)));
        assert_eq!(AmountInput::from("12.5").to_money(), Some(Money::from_cents(1250)));
        assert_eq!(AmountInput::from("abc").to_money(), None);

        let fields: RegisterFields =
            serde_json::from_str(r#"{"openingFloat":"1000","cashSales":500.25}"#).unwrap();
        assert_eq!(parsed(&fields.opening_float), Some(m(1000)));
        assert_eq!(parsed(&fields.cash_sales), Some(Money::from_cents(50025)));
        assert_eq!(fields.expenses, None);
    }

    #[test]
    fn test_new_register_defaults() {
        let fields = RegisterFields {
            opening_float: Some("garbage".into()),
            card_sales: Some(10.0.into()),
            ..Default::default()
        };
        let amounts = RegisterAmounts::for_new_register(&fields).unwrap();
        assert_eq!(amounts.opening_float, Money::zero());
        assert_eq!(amounts.card_sales, m(10));
        assert_eq!(amounts.closing_float, None);
        assert_eq!(amounts.notes, "");
    }

    #[test]
    fn test_merge_keeps_previous_values() {
        let rec = record("u-1", false);
        let fields = RegisterFields {
            cash_sales: Some("600".into()),
            expenses: Some("not a number".into()),
            ..Default::default()
        };
        let amounts = RegisterAmounts::merged_onto(&rec, &fields).unwrap();
        assert_eq!(amounts.cash_sales, m(600));
        assert_eq!(amounts.expenses, m(50));
        assert_eq!(amounts.opening_float, m(1000));
        assert_eq!(amounts.notes, "morning");

        let cleared = RegisterFields {
            notes: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(RegisterAmounts::merged_onto(&rec, &cleared).unwrap().notes, "");
    }

    #[test]
    fn test_close_requires_both_figures() {
        let err = require_close_inputs(&RegisterFields::default()).unwrap_err();
        match err {
            CoreError::IncompleteClose { missing } => {
                assert_eq!(missing, vec!["closingFloat", "cashSales"])
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let zeroes = RegisterFields {
            closing_float: Some(0.0.into()),
            cash_sales: Some("0".into()),
            ..Default::default()
        };
        assert!(require_close_inputs(&zeroes).is_ok());

        let garbage = RegisterFields {
            closing_float: Some("lots".into()),
            cash_sales: Some(1.0.into()),
            ..Default::default()
        };
        assert!(require_close_inputs(&garbage).is_err());
    }

    #[test]
    fn test_authorize_update() {
        let owner = Actor::new("u-1", Role::Employee);
        let other = Actor::new("u-2", Role::Manager);
        let admin = Actor::new("u-9", Role::Admin);

        let open = record("u-1", false);
        assert!(authorize_update(&open, &owner).is_ok());
        assert!(matches!(authorize_update(&open, &other), Err(CoreError::Forbidden(_))));
        assert!(authorize_update(&open, &admin).is_ok());

        let closed = record("u-1", true);
        assert!(matches!(authorize_update(&closed, &owner), Err(CoreError::RegisterClosed(_))));
        // Ownership is reported before closed state.
        assert!(matches!(authorize_update(&closed, &other), Err(CoreError::Forbidden(_))));
        assert!(authorize_update(&closed, &admin).is_ok());
    }

    #[test]
    fn test_can_view() {
        assert!(can_view("u-1", &Actor::new("u-1", Role::Employee)));
        assert!(!can_view("u-1", &Actor::new("u-2", Role::Manager)));
        assert!(can_view("u-1", &Actor::new("u-3", Role::Admin)));
    }

    #[test]
    fn test_day_bounds_with_offset() {
        let tz = FixedOffset::west_opt(3 * 3600).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let (start, end) = day_bounds(day, &tz);
        assert_eq!(start.to_rfc3339(), "2026-10-16T03:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2026-10-17T02:59:59.999+00:00");

        assert_eq!(business_day(start, &tz), day);
        assert_eq!(business_day(end, &tz), day);
        let next = end + chrono::Duration::milliseconds(1);
        assert_eq!(business_day(next, &tz), day.succ_opt().unwrap());
    }
}
