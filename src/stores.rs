use anyhow::Result;
use chrono::Utc;

use crate::config::Config;
use crate::db;
use crate::health::StoreHealth;
use crate::models::{SourceType, StoreHealthRecord};

/// List configured stores with their breaker state.
pub async fn list_stores(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let health = StoreHealth::new(pool.clone(), config.breaker.clone());
    let records = health.all().await?;
    let now = Utc::now();

    println!(
        "{:<16} {:<8} {:<8} {:<6} {:<6} {:<6} STATUS",
        "STORE", "KIND", "TYPE", "TRUST", "HARD", "SOFT"
    );

    for (key, store) in &config.stores {
        let record = records.iter().find(|r| &r.store == key);
        let (hard, soft) = record
            .map(|r| (r.consecutive_failures, r.consecutive_soft_failures))
            .unwrap_or((0, 0));
        println!(
            "{:<16} {:<8} {:<8} {:<6} {:<6} {:<6} {}",
            key,
            store.kind,
            type_label(store.source_type),
            store.trust,
            hard,
            soft,
            status_label(record, now)
        );
    }

    // Health rows for stores no longer in the config still show up; stale
    // entries would otherwise be invisible.
    for record in &records {
        if !config.stores.contains_key(&record.store) {
            println!(
                "{:<16} {:<8} {:<8} {:<6} {:<6} {:<6} {} (not configured)",
                record.store,
                "-",
                "-",
                "-",
                record.consecutive_failures,
                record.consecutive_soft_failures,
                status_label(Some(record), now)
            );
        }
    }

    pool.close().await;
    Ok(())
}

fn type_label(source_type: SourceType) -> &'static str {
    match source_type {
        SourceType::Fast => "fast",
        SourceType::Scraped => "scraped",
        SourceType::Heavy => "heavy",
    }
}

fn status_label(record: Option<&StoreHealthRecord>, now: chrono::DateTime<Utc>) -> String {
    match record {
        Some(r) if r.is_disabled(now) => {
            let until = r
                .disabled_until
                .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_default();
            format!("DISABLED until {until}")
        }
        _ => "ok".to_string(),
    }
}
