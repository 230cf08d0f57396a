//! # Cash Register Repository
//!
//! Storage for cash register records. Rules about who may change what
//! live in shopkeep-core; this file only reads, locks and writes rows.
//!
//! Records are never deleted, and the schema refuses to flip `closed`
//! back to 0.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use shopkeep_core::{CashRegisterRecord, RegisterEntry};

const REGISTER_COLUMNS: &str = "id, owner_id, opened_at, opening_float_cents, closing_float_cents, \
                                cash_sales_cents, card_sales_cents, transfer_sales_cents, \
                                expenses_cents, notes, closed, closed_at, created_at, updated_at";

/// Optional narrowing for [`RegisterRepository::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterQuery {
    pub owner_id: Option<String>,
    /// Inclusive `opened_at` bounds.
    pub opened_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub closed: Option<bool>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct RegisterRepository {
    pool: SqlitePool,
}

impl RegisterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RegisterRepository { pool }
    }

    pub async fn insert(&self, conn: &mut SqliteConnection, record: &CashRegisterRecord) -> DbResult<()> {
        debug!(id = %record.id, owner_id = %record.owner_id, "Inserting cash register");

        sqlx::query(
            r#"
            INSERT INTO cash_registers (
                id, owner_id, opened_at, opening_float_cents, closing_float_cents,
                cash_sales_cents, card_sales_cents, transfer_sales_cents, expenses_cents,
                notes, closed, closed_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&record.id)
        .bind(&record.owner_id)
        .bind(record.opened_at)
        .bind(record.opening_float_cents)
        .bind(record.closing_float_cents)
        .bind(record.cash_sales_cents)
        .bind(record.card_sales_cents)
        .bind(record.transfer_sales_cents)
        .bind(record.expenses_cents)
        .bind(&record.notes)
        .bind(record.closed)
        .bind(record.closed_at)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Locks the record for the rest of the transaction and returns it.
    pub async fn lock(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<CashRegisterRecord>> {
        debug!(id = %id, "Locking cash register");

        let sql = format!(
            "UPDATE cash_registers SET updated_at = updated_at WHERE id = ?1 RETURNING {REGISTER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, CashRegisterRecord>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(record)
    }

    /// Writes every mutable column of `record` back to its row.
    pub async fn save(
        &self,
        conn: &mut SqliteConnection,
        record: &CashRegisterRecord,
    ) -> DbResult<CashRegisterRecord> {
        debug!(id = %record.id, closed = record.closed, "Saving cash register");

        let sql = format!(
            r#"
            UPDATE cash_registers SET
                opening_float_cents = ?2,
                closing_float_cents = ?3,
                cash_sales_cents = ?4,
                card_sales_cents = ?5,
                transfer_sales_cents = ?6,
                expenses_cents = ?7,
                notes = ?8,
                closed = ?9,
                closed_at = ?10,
                updated_at = ?11
            WHERE id = ?1
            RETURNING {REGISTER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, CashRegisterRecord>(&sql)
            .bind(&record.id)
            .bind(record.opening_float_cents)
            .bind(record.closing_float_cents)
            .bind(record.cash_sales_cents)
            .bind(record.card_sales_cents)
            .bind(record.transfer_sales_cents)
            .bind(record.expenses_cents)
            .bind(&record.notes)
            .bind(record.closed)
            .bind(record.closed_at)
            .bind(record.updated_at)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("Cash register", &record.id))
    }

    /// One record with its owner's name.
    pub async fn get(&self, id: &str) -> DbResult<Option<RegisterEntry>> {
        let mut qb = Self::select_entries();
        qb.push(" WHERE r.id = ").push_bind(id.to_string());

        let entry = qb
            .build_query_as::<RegisterEntry>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(entry)
    }

    /// Records matching `query`, newest business date first.
    pub async fn list(&self, query: &RegisterQuery) -> DbResult<Vec<RegisterEntry>> {
        debug!(?query, "Listing cash registers");

        let mut qb = Self::select_entries();
        qb.push(" WHERE 1 = 1");

        if let Some(owner_id) = &query.owner_id {
            qb.push(" AND r.owner_id = ").push_bind(owner_id.clone());
        }
        if let Some((start, end)) = query.opened_between {
            qb.push(" AND r.opened_at >= ").push_bind(start);
            qb.push(" AND r.opened_at <= ").push_bind(end);
        }
        if let Some(closed) = query.closed {
            qb.push(" AND r.closed = ").push_bind(closed);
        }

        qb.push(" ORDER BY r.opened_at DESC, r.rowid DESC");

        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let entries = qb
            .build_query_as::<RegisterEntry>()
            .fetch_all(&self.pool)
            .await?;

        debug!(count = entries.len(), "Cash registers loaded");
        Ok(entries)
    }

    fn select_entries() -> QueryBuilder<'static, Sqlite> {
        QueryBuilder::new(
            r#"
            SELECT
                r.id, r.owner_id, r.opened_at, r.opening_float_cents, r.closing_float_cents,
                r.cash_sales_cents, r.card_sales_cents, r.transfer_sales_cents,
                r.expenses_cents, r.notes, r.closed, r.closed_at, r.created_at, r.updated_at,
                u.name AS owner_name
            FROM cash_registers r
            LEFT JOIN users u ON u.id = r.owner_id
            "#,
        )
    }
}
