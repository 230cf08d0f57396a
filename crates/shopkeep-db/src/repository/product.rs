//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Row Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SQLite has no SELECT ... FOR UPDATE. A no-op UPDATE takes the          │
//! │  database write lock and RETURNING hands back the row in the same       │
//! │  statement:                                                             │
//! │                                                                         │
//! │   BEGIN                                                                 │
//! │   UPDATE products SET updated_at = updated_at WHERE id = ?  ◄─ lock     │
//! │          RETURNING ...                                      ◄─ read     │
//! │   ... decide with the returned snapshot ...                             │
//! │   UPDATE products SET stock = ?                                         │
//! │   INSERT INTO stock_movements ...                                       │
//! │   COMMIT                                                                │
//! │                                                                         │
//! │  A second writer blocks at its own lock statement until COMMIT, then    │
//! │  reads the committed stock. There is no window between check and act.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use shopkeep_core::Product;

const PRODUCT_COLUMNS: &str = "id, code, name, description, price_cents, unit, category, \
                               supplier, stock, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// All products ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name, code");
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE code = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Locks the product row for the rest of the transaction and returns it.
    ///
    /// `Ok(None)` when no product has this id.
    pub async fn lock(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
        debug!(id = %id, "Locking product");

        let sql = format!(
            "UPDATE products SET updated_at = updated_at WHERE id = ?1 RETURNING {PRODUCT_COLUMNS}"
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(product)
    }

    /// Inserts a product. A taken code becomes `UniqueViolation { field: "code" }`.
    pub async fn insert(&self, conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
        debug!(code = %product.code, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, code, name, description, price_cents, unit, category,
                supplier, stock, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(&product.unit)
        .bind(&product.category)
        .bind(&product.supplier)
        .bind(product.stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("code", &product.code),
            other => other,
        })?;

        Ok(())
    }

    /// Writes a new stock level. Only the ledger calls this, inside the
    /// transaction that also inserts the matching movement.
    pub async fn set_stock(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        stock: i64,
        updated_at: DateTime<Utc>,
    ) -> DbResult<Product> {
        debug!(id = %id, stock = stock, "Setting stock");

        let sql = format!(
            "UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1 RETURNING {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(stock)
            .bind(updated_at)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }
}
