//! # User Repository
//!
//! Users are owned by the auth collaborator. This table only exists so
//! movements and registers have something to reference and a name to show.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use shopkeep_core::User;

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts the user or refreshes its display name.
    ///
    /// A `None` name leaves an existing name untouched.
    pub async fn upsert(&self, id: &str, name: Option<&str>) -> DbResult<()> {
        debug!(id = %id, "Upserting user");
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, name, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT (id) DO UPDATE SET
                name = COALESCE(excluded.name, users.name),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Makes sure a row exists for `id` inside an open transaction.
    pub async fn ensure(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, name, created_at, updated_at)
            VALUES (?1, NULL, ?2, ?2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Display name of `id` as an open transaction sees it.
    pub async fn name_within(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<String>> {
        let name = sqlx::query_scalar::<_, Option<String>>("SELECT name FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(name.flatten())
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, name FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}
