//! Time-boxed search result cache.
//!
//! Keyed by (normalized query, store). TTLs come from the store's
//! source-type class: fast API-backed sources go stale quickly, heavy
//! rendering sources are worth keeping longer. Reads never return expired
//! entries; writes are last-write-wins upserts. Every cache failure is
//! swallowed — a broken cache degrades to a miss, never a failed search.

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use tracing::warn;

use crate::config::CacheConfig;
use crate::models::{RawCandidate, SourceType};
use crate::normalize::normalize_query;

/// Handle over the durable `search_cache` table.
#[derive(Clone)]
pub struct ResultCache {
    pool: SqlitePool,
    config: CacheConfig,
}

impl ResultCache {
    pub fn new(pool: SqlitePool, config: CacheConfig) -> Self {
        Self { pool, config }
    }

    /// Cached candidates for this query/store, or `None` on a miss.
    ///
    /// Absent, expired, undecodable, and unreadable entries all report as a
    /// miss; this method never fails.
    pub async fn get(&self, query: &str, store: &str) -> Option<Vec<RawCandidate>> {
        let key = normalize_query(query);
        let now = Utc::now().timestamp();

        let row: Result<Option<String>, sqlx::Error> = sqlx::query_scalar(
            "SELECT results_json FROM search_cache
             WHERE query_normalized = ? AND store = ? AND expires_at > ?",
        )
        .bind(&key)
        .bind(store)
        .bind(now)
        .fetch_optional(&self.pool)
        .await;

        let json = match row {
            Ok(json) => json?,
            Err(err) => {
                warn!(store, error = %err, "cache read failed; treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&json) {
            Ok(results) => Some(results),
            Err(err) => {
                warn!(store, error = %err, "cache entry undecodable; treating as miss");
                None
            }
        }
    }

    /// Store results with an expiry from the source type's TTL. A failed
    /// write is logged and dropped; it must not abort the caller's search.
    pub async fn set(
        &self,
        query: &str,
        store: &str,
        results: &[RawCandidate],
        source_type: SourceType,
    ) {
        let key = normalize_query(query);
        let now = Utc::now();
        let expires = now + Duration::minutes(self.config.ttl_minutes(source_type));

        let json = match serde_json::to_string(results) {
            Ok(json) => json,
            Err(err) => {
                warn!(store, error = %err, "cache serialize failed; skipping write");
                return;
            }
        };

        let written = sqlx::query(
            r#"
            INSERT INTO search_cache (query_normalized, store, results_json, cached_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(query_normalized, store) DO UPDATE SET
                results_json = excluded.results_json,
                cached_at = excluded.cached_at,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(&key)
        .bind(store)
        .bind(&json)
        .bind(now.timestamp())
        .bind(expires.timestamp())
        .execute(&self.pool)
        .await;

        if let Err(err) = written {
            warn!(store, error = %err, "cache write failed; continuing without");
        }
    }

    /// Delete expired entries. Returns the number removed.
    pub async fn purge_expired(&self) -> anyhow::Result<u64> {
        let now = Utc::now().timestamp();
        let done = sqlx::query("DELETE FROM search_cache WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, ResultCache) {
        let tmp = TempDir::new().unwrap();
        let pool = crate::db::connect_path(&tmp.path().join("cache.sqlite"))
            .await
            .unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        (tmp, ResultCache::new(pool, CacheConfig::default()))
    }

    fn candidate(name: &str, price: f64) -> RawCandidate {
        RawCandidate {
            store: "acme".to_string(),
            name: name.to_string(),
            price: Some(price),
            original_price: None,
            url: "https://acme.example/p/1".to_string(),
            review_score: None,
            review_count: None,
            specs: None,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_round_trip_within_ttl() {
        let (_tmp, cache) = setup().await;
        let results = vec![candidate("LG C3 OLED", 1299.0), candidate("TCL Q7", 549.0)];
        cache
            .set("55 inch tv", "acme", &results, SourceType::Fast)
            .await;

        let hit = cache.get("55 inch tv", "acme").await.unwrap();
        assert_eq!(hit.len(), 2);
        assert_eq!(hit[0].name, "LG C3 OLED");
        assert_eq!(hit[1].price, Some(549.0));
    }

    #[tokio::test]
    async fn test_query_normalization_shares_entry() {
        let (_tmp, cache) = setup().await;
        cache
            .set("canon eos r8", "acme", &[candidate("Canon EOS R8", 1299.0)], SourceType::Fast)
            .await;
        let hit = cache.get("  Canon EOS R8 ", "acme").await;
        assert!(hit.is_some());
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let (_tmp, cache) = setup().await;
        cache
            .set("55 inch tv", "acme", &[candidate("LG C3", 1299.0)], SourceType::Fast)
            .await;

        let past = (Utc::now() - Duration::minutes(1)).timestamp();
        sqlx::query("UPDATE search_cache SET expires_at = ?")
            .bind(past)
            .execute(&cache.pool)
            .await
            .unwrap();

        assert!(cache.get("55 inch tv", "acme").await.is_none());
    }

    #[tokio::test]
    async fn test_overwrite_is_last_write_wins() {
        let (_tmp, cache) = setup().await;
        cache
            .set("tv", "acme", &[candidate("old", 100.0)], SourceType::Fast)
            .await;
        cache
            .set("tv", "acme", &[candidate("new", 200.0)], SourceType::Fast)
            .await;

        let hit = cache.get("tv", "acme").await.unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].name, "new");
    }

    #[tokio::test]
    async fn test_miss_for_unknown_store() {
        let (_tmp, cache) = setup().await;
        assert!(cache.get("tv", "other").await.is_none());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (_tmp, cache) = setup().await;
        cache
            .set("tv", "acme", &[candidate("a", 100.0)], SourceType::Fast)
            .await;
        cache
            .set("tv", "other", &[candidate("b", 100.0)], SourceType::Fast)
            .await;

        let past = (Utc::now() - Duration::minutes(1)).timestamp();
        sqlx::query("UPDATE search_cache SET expires_at = ? WHERE store = 'acme'")
            .bind(past)
            .execute(&cache.pool)
            .await
            .unwrap();

        let removed = cache.purge_expired().await.unwrap();
        assert_eq!(removed, 1);
        assert!(cache.get("tv", "other").await.is_some());
    }
}
