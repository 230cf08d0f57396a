//! # Movement Repository
//!
//! The append-only stock ledger. There is an insert and there are reads;
//! there is no update or delete, and the schema's triggers refuse both.
//!
//! Ledger order is insertion order (`rowid`): writers are serialized by
//! the product row lock, so rowid order is commit order even when two
//! movements share a timestamp.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use shopkeep_core::{MovementEntry, MovementKind, StockMovement};

/// Optional narrowing for [`MovementRepository::list_recent`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementQuery {
    pub product_id: Option<String>,
    pub kind: Option<MovementKind>,
    pub actor_id: Option<String>,
}

/// Repository for stock movement operations.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Appends a movement. Call inside the transaction that changed stock.
    pub async fn insert(&self, conn: &mut SqliteConnection, movement: &StockMovement) -> DbResult<()> {
        debug!(
            product_id = %movement.product_id,
            kind = %movement.kind,
            quantity = movement.quantity,
            "Inserting stock movement"
        );

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, product_id, kind, quantity, stock_before, stock_after,
                note, actor_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.product_id)
        .bind(movement.kind)
        .bind(movement.quantity)
        .bind(movement.stock_before)
        .bind(movement.stock_after)
        .bind(&movement.note)
        .bind(&movement.actor_id)
        .bind(movement.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Newest first, joined with product code/name and actor name.
    pub async fn list_recent(&self, filter: &MovementQuery, limit: u32) -> DbResult<Vec<MovementEntry>> {
        debug!(?filter, limit = limit, "Listing recent movements");

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT
                m.id, m.product_id, m.kind, m.quantity, m.stock_before, m.stock_after,
                m.note, m.actor_id, m.created_at,
                p.code AS product_code,
                p.name AS product_name,
                u.name AS actor_name
            FROM stock_movements m
            INNER JOIN products p ON p.id = m.product_id
            LEFT JOIN users u ON u.id = m.actor_id
            WHERE 1 = 1
            "#,
        );

        if let Some(product_id) = &filter.product_id {
            qb.push(" AND m.product_id = ").push_bind(product_id.clone());
        }
        if let Some(kind) = filter.kind {
            qb.push(" AND m.kind = ").push_bind(kind);
        }
        if let Some(actor_id) = &filter.actor_id {
            qb.push(" AND m.actor_id = ").push_bind(actor_id.clone());
        }

        qb.push(" ORDER BY m.rowid DESC LIMIT ").push_bind(i64::from(limit));

        let entries = qb
            .build_query_as::<MovementEntry>()
            .fetch_all(&self.pool)
            .await?;

        debug!(count = entries.len(), "Recent movements loaded");
        Ok(entries)
    }

    /// Every movement of one product, oldest first.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, product_id, kind, quantity, stock_before, stock_after,
                   note, actor_id, created_at
            FROM stock_movements
            WHERE product_id = ?1
            ORDER BY rowid ASC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_movements")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};
    use chrono::Utc;
    use shopkeep_core::Product;

    async fn seed(db: &Database) -> Product {
        let now = Utc::now();
        let product = Product {
            id: "p-1".to_string(),
            code: "ACE001".to_string(),
            name: "Aceite".to_string(),
            description: None,
            price_cents: 900,
            unit: "l".to_string(),
            category: None,
            supplier: None,
            stock: 0,
            created_at: now,
            updated_at: now,
        };
        db.users().upsert("u-1", Some("Ana")).await.unwrap();
        let mut tx = db.begin().await.unwrap();
        db.users().ensure(&mut tx, "u-2").await.unwrap();
        db.products().insert(&mut tx, &product).await.unwrap();
        tx.commit().await.unwrap();
        product
    }

    fn movement(id: &str, kind: MovementKind, quantity: i64, actor: &str) -> StockMovement {
        StockMovement {
            id: id.to_string(),
            product_id: "p-1".to_string(),
            kind,
            quantity,
            stock_before: 0,
            stock_after: quantity,
            note: Some(format!("{kind} {quantity}")),
            actor_id: actor.to_string(),
            created_at: Utc::now(),
        }
    }

    async fn append(db: &Database, m: &StockMovement) {
        let mut tx = db.begin().await.unwrap();
        db.movements().insert(&mut tx, m).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_list_recent_newest_first_with_joins() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed(&db).await;
        append(&db, &movement("m1", MovementKind::Entry, 10, "u-1")).await;
        append(&db, &movement("m2", MovementKind::Exit, 3, "u-2")).await;
        append(&db, &movement("m3", MovementKind::Adjust, 9, "u-1")).await;

        let all = db.movements().list_recent(&MovementQuery::default(), 100).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|e| e.movement.id.as_str()).collect();
        assert_eq!(ids, vec!["m3", "m2", "m1"]);
        assert_eq!(all[0].product_code, "ACE001");
        assert_eq!(all[0].product_name, "Aceite");
        assert_eq!(all[0].actor_name.as_deref(), Some("Ana"));
        assert_eq!(all[1].actor_name, None);

        let limited = db.movements().list_recent(&MovementQuery::default(), 2).await.unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn test_list_recent_filters() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed(&db).await;
        append(&db, &movement("m1", MovementKind::Entry, 10, "u-1")).await;
        append(&db, &movement("m2", MovementKind::Exit, 3, "u-2")).await;

        let exits = MovementQuery {
            kind: Some(MovementKind::Exit),
            ..Default::default()
        };
        let found = db.movements().list_recent(&exits, 100).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].movement.id, "m2");

        let by_actor = MovementQuery {
            actor_id: Some("u-1".to_string()),
            product_id: Some("p-1".to_string()),
            ..Default::default()
        };
        let found = db.movements().list_recent(&by_actor, 100).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].movement.kind, MovementKind::Entry);
    }

    #[tokio::test]
    async fn test_history_oldest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed(&db).await;
        append(&db, &movement("m1", MovementKind::Entry, 10, "u-1")).await;
        append(&db, &movement("m2", MovementKind::Entry, 10, "u-1")).await;

        let history = db.movements().list_for_product("p-1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, "m1");
        assert_eq!(history[0].note.as_deref(), Some("ENTRY 10"));
        assert!(db.movements().list_for_product("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ledger_rows_cannot_be_rewritten() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed(&db).await;
        append(&db, &movement("m1", MovementKind::Entry, 10, "u-1")).await;

        let update = sqlx::query("UPDATE stock_movements SET quantity = 99 WHERE id = 'm1'")
            .execute(db.pool())
            .await
            .map_err(DbError::from);
        assert!(matches!(update, Err(DbError::ConstraintViolation(_))));

        let delete = sqlx::query("DELETE FROM stock_movements WHERE id = 'm1'")
            .execute(db.pool())
            .await
            .map_err(DbError::from);
        assert!(matches!(delete, Err(DbError::ConstraintViolation(_))));

        assert_eq!(db.movements().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_actor_rejected_by_foreign_key() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed(&db).await;

        let mut tx = db.begin().await.unwrap();
        let err = db
            .movements()
            .insert(&mut tx, &movement("m1", MovementKind::Entry, 1, "nobody"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
