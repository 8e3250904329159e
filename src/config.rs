use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::models::SourceType;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub breaker: BreakerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub fanout: FanOutConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    /// Store key → store profile. BTreeMap keeps listing order stable.
    #[serde(default)]
    pub stores: BTreeMap<String, StoreConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Circuit-breaker thresholds and cooldown.
#[derive(Debug, Deserialize, Clone)]
pub struct BreakerConfig {
    /// Consecutive hard failures (errors/timeouts) before a store is disabled.
    #[serde(default = "default_hard_threshold")]
    pub hard_failure_threshold: i64,
    /// Consecutive zero-result successes before a store is disabled. Higher
    /// than the hard threshold: legitimately empty result sets are common,
    /// silent markup breakage takes longer to confirm.
    #[serde(default = "default_soft_threshold")]
    pub soft_failure_threshold: i64,
    #[serde(default = "default_cooldown_hours")]
    pub cooldown_hours: i64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            hard_failure_threshold: default_hard_threshold(),
            soft_failure_threshold: default_soft_threshold(),
            cooldown_hours: default_cooldown_hours(),
        }
    }
}

fn default_hard_threshold() -> i64 {
    5
}
fn default_soft_threshold() -> i64 {
    8
}
fn default_cooldown_hours() -> i64 {
    6
}

/// Per-source-type cache TTLs, in minutes.
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_fast")]
    pub ttl_fast_minutes: i64,
    #[serde(default = "default_ttl_scraped")]
    pub ttl_scraped_minutes: i64,
    #[serde(default = "default_ttl_heavy")]
    pub ttl_heavy_minutes: i64,
}

impl CacheConfig {
    pub fn ttl_minutes(&self, source_type: SourceType) -> i64 {
        match source_type {
            SourceType::Fast => self.ttl_fast_minutes,
            SourceType::Scraped => self.ttl_scraped_minutes,
            SourceType::Heavy => self.ttl_heavy_minutes,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_fast_minutes: default_ttl_fast(),
            ttl_scraped_minutes: default_ttl_scraped(),
            ttl_heavy_minutes: default_ttl_heavy(),
        }
    }
}

fn default_ttl_fast() -> i64 {
    15
}
fn default_ttl_scraped() -> i64 {
    30
}
fn default_ttl_heavy() -> i64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct FanOutConfig {
    /// Hard ceiling per adapter call; exceeding it is a hard failure for
    /// that store only.
    #[serde(default = "default_adapter_timeout")]
    pub adapter_timeout_secs: u64,
    /// Default per-store result cap passed to adapters.
    #[serde(default = "default_per_store_cap")]
    pub per_store_result_cap: usize,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            adapter_timeout_secs: default_adapter_timeout(),
            per_store_result_cap: default_per_store_cap(),
        }
    }
}

fn default_adapter_timeout() -> u64 {
    15
}
fn default_per_store_cap() -> usize {
    40
}

/// Relevance-filter tuning. The upward size allowance is a judgment call,
/// kept configurable rather than baked in.
#[derive(Debug, Deserialize, Clone)]
pub struct FilterConfig {
    /// Multiplier widening the size band upward (larger-than-requested).
    #[serde(default = "default_upward_multiplier")]
    pub upward_multiplier: f64,
    /// Target size at or above which the band stays symmetric.
    #[serde(default = "default_upward_cutoff")]
    pub upward_cutoff_inches: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            upward_multiplier: default_upward_multiplier(),
            upward_cutoff_inches: default_upward_cutoff(),
        }
    }
}

fn default_upward_multiplier() -> f64 {
    2.0
}
fn default_upward_cutoff() -> f64 {
    50.0
}

#[derive(Debug, Deserialize, Clone)]
pub struct RankingConfig {
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
    /// Max results from one brand before the rest are demoted.
    #[serde(default = "default_brand_cap")]
    pub per_brand_cap: usize,
    /// Max results from one store before the rest are demoted.
    #[serde(default = "default_store_cap")]
    pub per_store_cap: usize,
    /// Price at or above which a high-quality product earns "Premium".
    #[serde(default = "default_premium_price")]
    pub premium_price: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            result_limit: default_result_limit(),
            per_brand_cap: default_brand_cap(),
            per_store_cap: default_store_cap(),
            premium_price: default_premium_price(),
        }
    }
}

fn default_result_limit() -> usize {
    10
}
fn default_brand_cap() -> usize {
    2
}
fn default_store_cap() -> usize {
    3
}
fn default_premium_price() -> f64 {
    1500.0
}

/// One configured store.
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Adapter kind. `"http"` is the only built-in; others are registered
    /// programmatically via [`crate::adapter::AdapterRegistry::register`].
    #[serde(default = "default_store_kind")]
    pub kind: String,
    /// Endpoint for the HTTP adapter. `{query}` is replaced with the
    /// URL-encoded search query.
    #[serde(default)]
    pub url: Option<String>,
    /// JSON pointer to the listings array in the response ("" = root).
    #[serde(default)]
    pub items_pointer: String,
    /// Store trust on a 0–10 scale; feeds the scoring engine.
    #[serde(default = "default_trust")]
    pub trust: f64,
    #[serde(default)]
    pub source_type: SourceType,
}

fn default_store_kind() -> String {
    "http".to_string()
}
fn default_trust() -> f64 {
    5.0
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.breaker.hard_failure_threshold < 1 {
        anyhow::bail!("breaker.hard_failure_threshold must be >= 1");
    }
    if config.breaker.soft_failure_threshold < 1 {
        anyhow::bail!("breaker.soft_failure_threshold must be >= 1");
    }
    if config.breaker.cooldown_hours < 1 {
        anyhow::bail!("breaker.cooldown_hours must be >= 1");
    }

    for ttl in [
        config.cache.ttl_fast_minutes,
        config.cache.ttl_scraped_minutes,
        config.cache.ttl_heavy_minutes,
    ] {
        if ttl < 1 {
            anyhow::bail!("cache TTLs must be >= 1 minute");
        }
    }

    if config.fanout.adapter_timeout_secs == 0 {
        anyhow::bail!("fanout.adapter_timeout_secs must be >= 1");
    }

    if config.filter.upward_multiplier < 1.0 {
        anyhow::bail!("filter.upward_multiplier must be >= 1.0");
    }

    if config.ranking.result_limit < 1 {
        anyhow::bail!("ranking.result_limit must be >= 1");
    }
    if config.ranking.per_brand_cap < 1 || config.ranking.per_store_cap < 1 {
        anyhow::bail!("ranking caps must be >= 1");
    }

    for (key, store) in &config.stores {
        if !(0.0..=10.0).contains(&store.trust) {
            anyhow::bail!("stores.{}.trust must be in [0, 10]", key);
        }
        if store.kind == "http" && store.url.is_none() {
            anyhow::bail!("stores.{}.url is required for the http adapter", key);
        }
    }

    Ok(config)
}

impl Config {
    /// Minimal in-memory config for tests and ad-hoc library use.
    pub fn minimal(db_path: PathBuf) -> Self {
        Self {
            db: DbConfig { path: db_path },
            breaker: BreakerConfig::default(),
            cache: CacheConfig::default(),
            fanout: FanOutConfig::default(),
            filter: FilterConfig::default(),
            ranking: RankingConfig::default(),
            stores: BTreeMap::new(),
        }
    }

    /// Trust for a store key, neutral 5.0 when unconfigured.
    pub fn store_trust(&self, store: &str) -> f64 {
        self.stores.get(store).map(|s| s.trust).unwrap_or(5.0)
    }

    pub fn store_source_type(&self, store: &str) -> SourceType {
        self.stores
            .get(store)
            .map(|s| s.source_type)
            .unwrap_or_default()
    }
}
