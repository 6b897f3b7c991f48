use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::{Row, SqlitePool};

use super::{SessionRecord, SessionStore, SessionStoreError, offline_session_id};

/// On-disk session storage backed by the `shopify_sessions` table.
///
/// Rows are keyed by session id; `get` reads the offline session of a shop.
#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load a session by its id.
    ///
    /// # Errors
    ///
    /// Returns `SessionStoreError` if the query fails.
    pub async fn load(&self, id: &str) -> Result<Option<SessionRecord>, SessionStoreError> {
        let row = sqlx::query(
            r"
            SELECT id, shop, access_token, scope, is_online, obtained_at
            FROM shopify_sessions
            WHERE id = ?
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| record_from_row(&row)).transpose()
    }

    /// Delete a session by its id. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `SessionStoreError` if the query fails.
    pub async fn delete(&self, id: &str) -> Result<bool, SessionStoreError> {
        let result = sqlx::query("DELETE FROM shopify_sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Check that the database answers.
    ///
    /// # Errors
    ///
    /// Returns `SessionStoreError` if the database is unreachable.
    pub async fn ping(&self) -> Result<(), SessionStoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionRecord, SessionStoreError> {
    let scope: String = row.try_get("scope")?;
    let access_token: String = row.try_get("access_token")?;
    Ok(SessionRecord {
        id: row.try_get("id")?,
        shop: row.try_get("shop")?,
        access_token: SecretString::from(access_token),
        scope: split_scopes(&scope),
        is_online: row.try_get("is_online")?,
        obtained_at: row.try_get("obtained_at")?,
    })
}

fn split_scopes(scope: &str) -> Vec<String> {
    scope
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, shop: &str) -> Result<Option<SessionRecord>, SessionStoreError> {
        self.load(&offline_session_id(shop)).await
    }

    async fn put(&self, _shop: &str, record: SessionRecord) -> Result<(), SessionStoreError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r"
            INSERT INTO shopify_sessions
                (id, shop, access_token, scope, is_online, obtained_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                shop = excluded.shop,
                access_token = excluded.access_token,
                scope = excluded.scope,
                is_online = excluded.is_online,
                obtained_at = excluded.obtained_at,
                updated_at = excluded.updated_at
            ",
        )
        .bind(&record.id)
        .bind(&record.shop)
        .bind(record.access_token.expose_secret())
        .bind(record.scope.join(","))
        .bind(record.is_online)
        .bind(record.obtained_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        tracing::debug!(shop = %record.shop, id = %record.id, "Stored Shopify session");
        Ok(())
    }
}
