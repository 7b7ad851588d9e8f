//! Distributed cache
//!
//! A key/value store with per-entry expiry, shared by every process that
//! opens the same database. Ops uses it as the short-lived mailbox for the
//! directory authentication handshake; Promenade caches location and
//! segment lookups in it.

pub mod handshake;
pub mod keys;

use crate::Result;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct DistributedCache {
    pool: SqlitePool,
}

impl DistributedCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// Unexpired value for `key`
    pub async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar(
            "SELECT value FROM cache_entries WHERE key = ? AND expires_at > ?",
        )
        .bind(key)
        .bind(Self::now_ms())
        .fetch_optional(&self.pool)
        .await?;

        Ok(value.filter(|v| !v.is_empty()))
    }

    pub async fn get_int(&self, key: &str) -> Result<Option<i64>> {
        Ok(self
            .get_string(key)
            .await?
            .and_then(|value| value.trim().parse().ok()))
    }

    /// Deserialize a cached JSON value; a value that no longer matches the
    /// type is treated as a miss
    pub async fn get_object<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.get_string(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Discarding unreadable cache entry {}: {}", key, e);
                self.remove(key).await?;
                Ok(None)
            }
        }
    }

    pub async fn save_string(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let expires_at = Self::now_ms() + i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX / 2);

        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        debug!(key, ttl_secs = ttl.as_secs(), "Cached value");
        Ok(())
    }

    pub async fn save_int(&self, key: &str, value: i64, ttl: Duration) -> Result<()> {
        self.save_string(key, &value.to_string(), ttl).await
    }

    pub async fn save_object<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.save_string(key, &json, ttl).await
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete expired rows; returns how many were removed
    pub async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE expires_at <= ?")
            .bind(Self::now_ms())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;
    use serde::Deserialize;

    async fn cache() -> DistributedCache {
        DistributedCache::new(init_memory_database().await.unwrap())
    }

    #[tokio::test]
    async fn test_save_and_get_string() {
        let cache = cache().await;
        cache
            .save_string("k", "value", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get_string("k").await.unwrap().as_deref(), Some("value"));
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_absent() {
        let cache = cache().await;
        cache.save_string("k", "value", Duration::ZERO).await.unwrap();
        assert!(cache.get_string("k").await.unwrap().is_none());
        assert_eq!(cache.purge_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let cache = cache().await;
        cache.save_int("n", 1, Duration::from_secs(60)).await.unwrap();
        cache.save_int("n", 2, Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get_int("n").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_remove() {
        let cache = cache().await;
        cache.save_string("k", "v", Duration::from_secs(60)).await.unwrap();
        cache.remove("k").await.unwrap();
        assert!(cache.get_string("k").await.unwrap().is_none());
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: i64,
        name: String,
    }

    #[tokio::test]
    async fn test_object_round_trip_and_type_mismatch() {
        let cache = cache().await;
        let sample = Sample {
            id: 3,
            name: "Central".into(),
        };
        cache
            .save_object("obj", &sample, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get_object::<Sample>("obj").await.unwrap(), Some(sample));

        cache
            .save_string("obj", "not json", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(cache.get_object::<Sample>("obj").await.unwrap().is_none());
        assert!(cache.get_string("obj").await.unwrap().is_none());
    }
}
