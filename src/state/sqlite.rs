//! SQLite Cache Backend
//!
//! Persists cache entries in a single SQLite table so batch records,
//! correlation entries and shard checkpoints survive process restarts and
//! can be shared by several instances pointing at the same database file.
//!
//! # Storage
//! - `cache_entries(key TEXT PRIMARY KEY, value TEXT, expires_at INTEGER NULL)`
//! - `expires_at` is a unix timestamp in milliseconds; `NULL` never expires
//! - expired rows are invisible to reads and are deleted on every write

use super::SharedCache;
use crate::error::CacheError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Bind parameters per multi-get query, below SQLite's variable limit
const KEYS_PER_QUERY: usize = 500;

/// Shared cache backed by SQLite through sqlx
#[derive(Clone)]
pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    /// Connect to the database and create the cache table if needed
    ///
    /// In-memory URLs are pinned to a single long-lived connection, since
    /// every SQLite memory connection is a separate database.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let in_memory = url.contains(":memory:");

        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        let cache = Self { pool };
        cache.migrate().await?;
        info!("SQLite cache ready at {}", url);
        Ok(cache)
    }

    async fn migrate(&self) -> Result<(), CacheError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                expires_at INTEGER NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn expiry(ttl: Option<Duration>) -> Option<i64> {
        ttl.map(|ttl| Self::now_ms() + ttl.as_millis() as i64)
    }
}

#[async_trait]
impl SharedCache for SqliteCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let row = sqlx::query(
            "SELECT value FROM cache_entries
             WHERE key = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(key)
        .bind(Self::now_ms())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row.try_get::<String, _>("value")).transpose()?)
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let now = Self::now_ms();
        let mut found = HashMap::with_capacity(keys.len());
        for chunk in keys.chunks(KEYS_PER_QUERY) {
            let mut builder =
                QueryBuilder::<Sqlite>::new("SELECT key, value FROM cache_entries WHERE key IN (");
            {
                let mut separated = builder.separated(", ");
                for key in chunk {
                    separated.push_bind(key.clone());
                }
            }
            builder.push(") AND (expires_at IS NULL OR expires_at > ");
            builder.push_bind(now);
            builder.push(")");

            for row in builder.build().fetch_all(&self.pool).await? {
                let key: String = row.try_get("key")?;
                let value: String = row.try_get("value")?;
                found.insert(key, value);
            }
        }

        debug!("Multi-get of {} keys returned {} entries", keys.len(), found.len());
        Ok(keys.iter().map(|key| found.get(key).cloned()).collect())
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut tx = self.pool.begin().await?;

        let purged = sqlx::query(
            "DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at <= ?",
        )
        .bind(Self::now_ms())
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if purged > 0 {
            debug!("Purged {} expired cache entries", purged);
        }

        sqlx::query(
            "INSERT INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(Self::expiry(ttl))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM cache_entries
             WHERE key = ? AND expires_at IS NOT NULL AND expires_at <= ?",
        )
        .bind(key)
        .bind(Self::now_ms())
        .execute(&mut *tx)
        .await?;

        let inserted = sqlx::query(
            "INSERT INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO NOTHING",
        )
        .bind(key)
        .bind(value)
        .bind(Self::expiry(Some(ttl)))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok(inserted == 1)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool, CacheError> {
        let deleted = sqlx::query("DELETE FROM cache_entries WHERE key = ? AND value = ?")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted == 1)
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let rows = sqlx::query(
            "SELECT key FROM cache_entries
             WHERE substr(key, 1, length(?)) = ? AND (expires_at IS NULL OR expires_at > ?)
             ORDER BY key",
        )
        .bind(prefix)
        .bind(prefix)
        .bind(Self::now_ms())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("key").map_err(CacheError::from))
            .collect()
    }
}
