//! Concurrent fan-out across store adapters.
//!
//! Issues one call per enabled store, all concurrently, and waits for every
//! call to settle — one slow or broken store never blocks or fails the
//! others. Disabled stores are skipped outright: no network call, no
//! result, no error. Each call is bounded by its own timeout; exceeding it
//! is a hard failure for that store only.
//!
//! Health and cache bookkeeping happens once per store after its call
//! settles: results → success + cache write-through, zero results → soft
//! failure, error/timeout → hard failure plus an entry in the per-source
//! error list.

use futures::future::join_all;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::adapter::{AdapterRegistry, SearchOpts, StoreAdapter};
use crate::cache::ResultCache;
use crate::config::Config;
use crate::health::StoreHealth;
use crate::models::{FanOutOutcome, RawCandidate, SourceError};

/// Orchestrates one search across all configured stores.
pub struct FanOut<'a> {
    config: &'a Config,
    health: &'a StoreHealth,
    cache: &'a ResultCache,
}

enum CallOutcome {
    /// Fresh cache entry; adapter never called, health untouched.
    CacheHit(Vec<RawCandidate>),
    Results(Vec<RawCandidate>),
    Empty,
    Failed(String),
}

impl<'a> FanOut<'a> {
    pub fn new(config: &'a Config, health: &'a StoreHealth, cache: &'a ResultCache) -> Self {
        Self {
            config,
            health,
            cache,
        }
    }

    /// Run the fan-out. `store_filter`, when given, restricts the run to a
    /// subset of the registry's stores.
    pub async fn run(
        &self,
        registry: &AdapterRegistry,
        query: &str,
        opts: &SearchOpts,
        store_filter: Option<&[String]>,
    ) -> FanOutOutcome {
        let mut callable: Vec<&dyn StoreAdapter> = Vec::new();
        for adapter in registry.adapters() {
            let key = adapter.key();
            if let Some(filter) = store_filter {
                if !filter.iter().any(|s| s == key) {
                    continue;
                }
            }
            match self.health.is_disabled(key).await {
                Ok(true) => {
                    info!(store = key, "store disabled by circuit breaker; skipping");
                    continue;
                }
                Ok(false) => {}
                // A broken health read must not lose the store for the search.
                Err(err) => warn!(store = key, error = %err, "health check failed; calling anyway"),
            }
            callable.push(adapter.as_ref());
        }

        let deadline = Duration::from_secs(self.config.fanout.adapter_timeout_secs);
        let calls = callable.iter().map(|adapter| async {
            let key = adapter.key().to_string();
            if let Some(cached) = self.cache.get(query, &key).await {
                debug!(store = %key, hits = cached.len(), "cache hit");
                return (key, CallOutcome::CacheHit(cached));
            }

            match timeout(deadline, adapter.search(query, opts)).await {
                Ok(Ok(results)) if results.is_empty() => (key, CallOutcome::Empty),
                Ok(Ok(results)) => (key, CallOutcome::Results(results)),
                Ok(Err(err)) => (key, CallOutcome::Failed(format!("{err:#}"))),
                Err(_) => (
                    key,
                    CallOutcome::Failed(format!(
                        "timed out after {}s",
                        self.config.fanout.adapter_timeout_secs
                    )),
                ),
            }
        });

        let settled = join_all(calls).await;

        let mut outcome = FanOutOutcome::default();
        for (store, call) in settled {
            match call {
                CallOutcome::CacheHit(results) => {
                    outcome.results.extend(results);
                }
                CallOutcome::Results(results) => {
                    if let Err(err) = self.health.record_success(&store).await {
                        warn!(store = %store, error = %err, "failed to record success");
                    }
                    self.cache
                        .set(
                            query,
                            &store,
                            &results,
                            self.config.store_source_type(&store),
                        )
                        .await;
                    outcome.results.extend(results);
                }
                CallOutcome::Empty => {
                    debug!(store = %store, "zero results; counting soft failure");
                    if let Err(err) = self.health.record_soft_failure(&store).await {
                        warn!(store = %store, error = %err, "failed to record soft failure");
                    }
                }
                CallOutcome::Failed(message) => {
                    warn!(store = %store, message = %message, "store call failed");
                    if let Err(err) = self.health.record_hard_failure(&store).await {
                        warn!(store = %store, error = %err, "failed to record hard failure");
                    }
                    outcome.errors.push(SourceError { store, message });
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;
    use anyhow::bail;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    enum Behavior {
        Return(Vec<RawCandidate>),
        Fail(&'static str),
        Hang,
    }

    struct MockAdapter {
        key: String,
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
    }

    impl MockAdapter {
        fn new(key: &str, behavior: Behavior) -> (Box<Self>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Box::new(Self {
                    key: key.to_string(),
                    behavior,
                    calls: calls.clone(),
                }),
                calls,
            )
        }
    }

    #[async_trait]
    impl StoreAdapter for MockAdapter {
        fn key(&self) -> &str {
            &self.key
        }

        async fn search(&self, _query: &str, _opts: &SearchOpts) -> anyhow::Result<Vec<RawCandidate>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Return(results) => Ok(results.clone()),
                Behavior::Fail(message) => bail!("{}", message),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Vec::new())
                }
            }
        }
    }

    fn candidate(store: &str, name: &str) -> RawCandidate {
        RawCandidate {
            store: store.to_string(),
            name: name.to_string(),
            price: Some(999.0),
            original_price: None,
            url: String::new(),
            review_score: None,
            review_count: None,
            specs: None,
            image_url: None,
        }
    }

    async fn setup(timeout_secs: u64) -> (TempDir, Config, StoreHealth, ResultCache) {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("fanout.sqlite");
        let pool = crate::db::connect_path(&db_path).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();

        let mut config = Config::minimal(db_path);
        config.fanout.adapter_timeout_secs = timeout_secs;

        let health = StoreHealth::new(pool.clone(), config.breaker.clone());
        let cache = ResultCache::new(pool, config.cache.clone());
        (tmp, config, health, cache)
    }

    #[tokio::test]
    async fn test_merges_results_and_isolates_failures() {
        let (_tmp, config, health, cache) = setup(15).await;
        let mut registry = AdapterRegistry::new();
        let (ok_adapter, _) = MockAdapter::new("good", Behavior::Return(vec![candidate("good", "TV A")]));
        let (bad_adapter, _) = MockAdapter::new("bad", Behavior::Fail("connection refused"));
        registry.register(ok_adapter);
        registry.register(bad_adapter);

        let fanout = FanOut::new(&config, &health, &cache);
        let outcome = fanout
            .run(&registry, "55 inch tv", &SearchOpts::default(), None)
            .await;

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].store, "bad");
        assert!(outcome.errors[0].message.contains("connection refused"));

        // Bookkeeping: success cleared, failure counted
        assert_eq!(
            health.get("bad").await.unwrap().unwrap().consecutive_failures,
            1
        );
        assert!(health.get("good").await.unwrap().unwrap().last_success_at.is_some());
    }

    #[tokio::test]
    async fn test_timeout_counts_as_hard_failure() {
        let (_tmp, config, health, cache) = setup(1).await;
        let mut registry = AdapterRegistry::new();
        let (slow, _) = MockAdapter::new("slow", Behavior::Hang);
        registry.register(slow);

        let fanout = FanOut::new(&config, &health, &cache);
        let started = std::time::Instant::now();
        let outcome = fanout
            .run(&registry, "tv", &SearchOpts::default(), None)
            .await;

        // Bounded by the per-source timeout, not the adapter's sleep
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].message.contains("timed out"));
        assert_eq!(
            health.get("slow").await.unwrap().unwrap().consecutive_failures,
            1
        );
    }

    #[tokio::test]
    async fn test_disabled_store_is_never_called() {
        let (_tmp, config, health, cache) = setup(15).await;
        for _ in 0..5 {
            health.record_hard_failure("down").await.unwrap();
        }

        let mut registry = AdapterRegistry::new();
        let (adapter, calls) = MockAdapter::new("down", Behavior::Return(vec![candidate("down", "TV")]));
        registry.register(adapter);

        let fanout = FanOut::new(&config, &health, &cache);
        let outcome = fanout
            .run(&registry, "tv", &SearchOpts::default(), None)
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(outcome.results.is_empty());
        assert!(outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn test_zero_results_counts_soft_failure() {
        let (_tmp, config, health, cache) = setup(15).await;
        let mut registry = AdapterRegistry::new();
        let (adapter, _) = MockAdapter::new("empty", Behavior::Return(Vec::new()));
        registry.register(adapter);

        let fanout = FanOut::new(&config, &health, &cache);
        let outcome = fanout
            .run(&registry, "tv", &SearchOpts::default(), None)
            .await;

        assert!(outcome.results.is_empty());
        assert!(outcome.errors.is_empty());
        let record = health.get("empty").await.unwrap().unwrap();
        assert_eq!(record.consecutive_soft_failures, 1);
        assert_eq!(record.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_cache_hit_bypasses_adapter() {
        let (_tmp, config, health, cache) = setup(15).await;
        cache
            .set("tv", "cached", &[candidate("cached", "TV C")], Default::default())
            .await;

        let mut registry = AdapterRegistry::new();
        let (adapter, calls) = MockAdapter::new("cached", Behavior::Fail("should not be called"));
        registry.register(adapter);

        let fanout = FanOut::new(&config, &health, &cache);
        let outcome = fanout
            .run(&registry, "tv", &SearchOpts::default(), None)
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.results.len(), 1);
        assert!(outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn test_store_filter_restricts_run() {
        let (_tmp, config, health, cache) = setup(15).await;
        let mut registry = AdapterRegistry::new();
        let (a, a_calls) = MockAdapter::new("a", Behavior::Return(vec![candidate("a", "TV A")]));
        let (b, b_calls) = MockAdapter::new("b", Behavior::Return(vec![candidate("b", "TV B")]));
        registry.register(a);
        registry.register(b);

        let fanout = FanOut::new(&config, &health, &cache);
        let filter = vec!["a".to_string()];
        let outcome = fanout
            .run(&registry, "tv", &SearchOpts::default(), Some(&filter))
            .await;

        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.results.len(), 1);
    }
}
