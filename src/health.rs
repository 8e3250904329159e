//! Per-store health tracking (circuit breaker).
//!
//! Each store carries two independent consecutive-failure counters: hard
//! failures (network/HTTP errors, timeouts) and soft failures (a call that
//! succeeded but returned zero results). Hard failures mean the source is
//! broken; soft failures mean silent breakage — markup drift that turns
//! every search into an empty page — and get a higher threshold so
//! legitimately empty result sets don't trip the breaker.
//!
//! Tripping either threshold disables the store for a cooldown window. The
//! store re-enables itself by time passage alone; no manual reset exists.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, SqlitePool};

use crate::config::BreakerConfig;
use crate::models::StoreHealthRecord;

/// Handle over the durable `store_health` table.
#[derive(Clone)]
pub struct StoreHealth {
    pool: SqlitePool,
    config: BreakerConfig,
}

impl StoreHealth {
    pub fn new(pool: SqlitePool, config: BreakerConfig) -> Self {
        Self { pool, config }
    }

    /// A successful call with results: both counters reset, any cooldown is
    /// cleared, and `last_success_at` is stamped.
    pub async fn record_success(&self, store: &str) -> Result<()> {
        let now = Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO store_health (store, consecutive_failures, consecutive_soft_failures, last_success_at, disabled_until)
            VALUES (?, 0, 0, ?, NULL)
            ON CONFLICT(store) DO UPDATE SET
                consecutive_failures = 0,
                consecutive_soft_failures = 0,
                last_success_at = excluded.last_success_at,
                disabled_until = NULL
            "#,
        )
        .bind(store)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// A network/HTTP error, adapter exception, or timeout.
    pub async fn record_hard_failure(&self, store: &str) -> Result<()> {
        let count = self.bump_counter(store, "consecutive_failures").await?;
        if count >= self.config.hard_failure_threshold {
            self.set_cooldown(store).await?;
        }
        Ok(())
    }

    /// A call that succeeded but produced zero results.
    pub async fn record_soft_failure(&self, store: &str) -> Result<()> {
        let count = self
            .bump_counter(store, "consecutive_soft_failures")
            .await?;
        if count >= self.config.soft_failure_threshold {
            self.set_cooldown(store).await?;
        }
        Ok(())
    }

    /// True iff a cooldown is set and has not yet passed.
    pub async fn is_disabled(&self, store: &str) -> Result<bool> {
        let until: Option<Option<i64>> =
            sqlx::query_scalar("SELECT disabled_until FROM store_health WHERE store = ?")
                .bind(store)
                .fetch_optional(&self.pool)
                .await?;
        let now = Utc::now().timestamp();
        Ok(matches!(until, Some(Some(ts)) if ts > now))
    }

    pub async fn get(&self, store: &str) -> Result<Option<StoreHealthRecord>> {
        let row = sqlx::query("SELECT * FROM store_health WHERE store = ?")
            .bind(store)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(record_from_row))
    }

    /// All known health records, for the `stores` listing.
    pub async fn all(&self) -> Result<Vec<StoreHealthRecord>> {
        let rows = sqlx::query("SELECT * FROM store_health ORDER BY store")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(record_from_row).collect())
    }

    async fn bump_counter(&self, store: &str, column: &str) -> Result<i64> {
        let now = Utc::now().timestamp();
        // Column name comes from the two callers above, never from input.
        let sql = format!(
            r#"
            INSERT INTO store_health (store, {column}, last_failure_at)
            VALUES (?, 1, ?)
            ON CONFLICT(store) DO UPDATE SET
                {column} = {column} + 1,
                last_failure_at = excluded.last_failure_at
            "#
        );
        sqlx::query(&sql)
            .bind(store)
            .bind(now)
            .execute(&self.pool)
            .await?;

        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT {column} FROM store_health WHERE store = ?"
        ))
        .bind(store)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn set_cooldown(&self, store: &str) -> Result<()> {
        let until = (Utc::now() + Duration::hours(self.config.cooldown_hours)).timestamp();
        sqlx::query("UPDATE store_health SET disabled_until = ? WHERE store = ?")
            .bind(until)
            .bind(store)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> StoreHealthRecord {
    StoreHealthRecord {
        store: row.get("store"),
        consecutive_failures: row.get("consecutive_failures"),
        consecutive_soft_failures: row.get("consecutive_soft_failures"),
        last_failure_at: ts_opt(row.get("last_failure_at")),
        last_success_at: ts_opt(row.get("last_success_at")),
        disabled_until: ts_opt(row.get("disabled_until")),
    }
}

fn ts_opt(ts: Option<i64>) -> Option<DateTime<Utc>> {
    ts.and_then(|t| DateTime::from_timestamp(t, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, StoreHealth) {
        let tmp = TempDir::new().unwrap();
        let pool = crate::db::connect_path(&tmp.path().join("health.sqlite"))
            .await
            .unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        (tmp, StoreHealth::new(pool, BreakerConfig::default()))
    }

    #[tokio::test]
    async fn test_five_hard_failures_disable() {
        let (_tmp, health) = setup().await;
        for _ in 0..4 {
            health.record_hard_failure("acme").await.unwrap();
            assert!(!health.is_disabled("acme").await.unwrap());
        }
        health.record_hard_failure("acme").await.unwrap();
        assert!(health.is_disabled("acme").await.unwrap());
    }

    #[tokio::test]
    async fn test_eight_soft_failures_disable() {
        let (_tmp, health) = setup().await;
        for _ in 0..7 {
            health.record_soft_failure("acme").await.unwrap();
            assert!(!health.is_disabled("acme").await.unwrap());
        }
        health.record_soft_failure("acme").await.unwrap();
        assert!(health.is_disabled("acme").await.unwrap());
    }

    #[tokio::test]
    async fn test_success_resets_both_counters() {
        let (_tmp, health) = setup().await;
        for _ in 0..4 {
            health.record_hard_failure("acme").await.unwrap();
        }
        for _ in 0..7 {
            health.record_soft_failure("acme").await.unwrap();
        }
        health.record_success("acme").await.unwrap();

        let record = health.get("acme").await.unwrap().unwrap();
        assert_eq!(record.consecutive_failures, 0);
        assert_eq!(record.consecutive_soft_failures, 0);
        assert!(record.disabled_until.is_none());
        assert!(record.last_success_at.is_some());

        // One more failure after the reset must not trip the breaker
        health.record_hard_failure("acme").await.unwrap();
        assert!(!health.is_disabled("acme").await.unwrap());
    }

    #[tokio::test]
    async fn test_counters_are_independent() {
        let (_tmp, health) = setup().await;
        for _ in 0..4 {
            health.record_hard_failure("acme").await.unwrap();
            health.record_soft_failure("acme").await.unwrap();
        }
        // 4 hard + 4 soft: neither threshold reached
        assert!(!health.is_disabled("acme").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_cooldown_reenables() {
        let (_tmp, health) = setup().await;
        for _ in 0..5 {
            health.record_hard_failure("acme").await.unwrap();
        }
        assert!(health.is_disabled("acme").await.unwrap());

        // Rewind the cooldown into the past; the store must re-enable
        // without any explicit intervention.
        let past = (Utc::now() - Duration::hours(1)).timestamp();
        sqlx::query("UPDATE store_health SET disabled_until = ? WHERE store = ?")
            .bind(past)
            .bind("acme")
            .execute(&health.pool)
            .await
            .unwrap();
        assert!(!health.is_disabled("acme").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_store_is_enabled() {
        let (_tmp, health) = setup().await;
        assert!(!health.is_disabled("never-seen").await.unwrap());
        assert!(health.get("never-seen").await.unwrap().is_none());
    }
}
