//! # Credential Repository
//!
//! Key/value rows in the `credentials` table.
//!
//! ```text
//! ┌──────────────────────────────┬──────────────────────┬──────────────────┐
//! │ key                          │ value                │ updated_at       │
//! ├──────────────────────────────┼──────────────────────┼──────────────────┤
//! │ sb-abcd-auth-token           │ {"access_token":..}  │ 2026-10-17T09:.. │
//! └──────────────────────────────┴──────────────────────┴──────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::StoreResult;

#[derive(Debug, Clone)]
pub struct CredentialRepository {
    pool: SqlitePool,
}

impl CredentialRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CredentialRepository { pool }
    }

    pub async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM credentials WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        debug!(key = %key, found = value.is_some(), "Credential read");
        Ok(value)
    }

    /// Inserts or replaces the value for `key`.
    pub async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO credentials (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(key = %key, bytes = value.len(), "Credential written");
        Ok(())
    }

    /// Deletes `key`. Returns whether a row existed.
    pub async fn remove(&self, key: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM credentials WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        debug!(key = %key, removed = result.rows_affected(), "Credential removed");
        Ok(result.rows_affected() > 0)
    }

    /// All stored keys, sorted. Values are never listed.
    pub async fn keys(&self) -> StoreResult<Vec<String>> {
        let keys: Vec<String> = sqlx::query_scalar("SELECT key FROM credentials ORDER BY key")
            .fetch_all(&self.pool)
            .await?;
        Ok(keys)
    }
}
