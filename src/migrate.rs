use anyhow::Result;
use sqlx::SqlitePool;

/// Create the durable tables owned by this engine. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Per-store circuit-breaker state
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS store_health (
            store TEXT PRIMARY KEY,
            consecutive_failures INTEGER NOT NULL DEFAULT 0,
            consecutive_soft_failures INTEGER NOT NULL DEFAULT 0,
            last_failure_at INTEGER,
            last_success_at INTEGER,
            disabled_until INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Time-boxed search result cache
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS search_cache (
            query_normalized TEXT NOT NULL,
            store TEXT NOT NULL,
            results_json TEXT NOT NULL,
            cached_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL,
            UNIQUE(query_normalized, store)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_search_cache_expires ON search_cache(expires_at)")
        .execute(pool)
        .await?;

    Ok(())
}
