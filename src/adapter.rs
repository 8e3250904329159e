//! Store adapter boundary.
//!
//! Adapters are the only component allowed to perform source-specific
//! parsing. Each one takes a query and returns raw candidate listings or an
//! error; `Ok(vec![])` is a legitimate zero-result search, `Err` is a
//! failure the health tracker should count. The engine never cares how a
//! particular store's data is extracted.
//!
//! A generic HTTP JSON adapter ships in-crate and covers API-backed stores
//! through configuration alone. Custom adapters implement [`StoreAdapter`]
//! and register via [`AdapterRegistry::register`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::{Config, StoreConfig};
use crate::models::RawCandidate;
use crate::normalize::{clean_name, extract_specs, parse_price, sanitize_price};

/// Options passed through to every adapter call.
#[derive(Debug, Clone, Default)]
pub struct SearchOpts {
    /// Per-store result cap; adapters truncate before returning.
    pub max_results: usize,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

/// One external retail data source.
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Stable store key (e.g. `"bestbuy"`). Also the health/cache row key.
    fn key(&self) -> &str;

    /// Fetch raw candidates for a query.
    ///
    /// Returns `Ok(vec![])` for a legitimate empty result set and `Err` for
    /// network, HTTP, or parse failures. Called on the tokio runtime; the
    /// orchestrator wraps every call in its own timeout.
    async fn search(&self, query: &str, opts: &SearchOpts) -> Result<Vec<RawCandidate>>;
}

/// Registry of adapters, one per configured store.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn StoreAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Registry pre-loaded with an HTTP adapter per `[stores.<key>]` entry
    /// of kind `"http"`.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();
        for (key, store_cfg) in &config.stores {
            if store_cfg.kind == "http" {
                registry.register(Box::new(HttpStoreAdapter::new(key.clone(), store_cfg.clone())));
            }
        }
        registry
    }

    pub fn register(&mut self, adapter: Box<dyn StoreAdapter>) {
        self.adapters.push(adapter);
    }

    pub fn adapters(&self) -> &[Box<dyn StoreAdapter>] {
        &self.adapters
    }

    pub fn find(&self, key: &str) -> Option<&dyn StoreAdapter> {
        self.adapters
            .iter()
            .find(|a| a.key() == key)
            .map(|a| a.as_ref())
    }

    pub fn keys(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.key().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Config-driven adapter for JSON search endpoints.
///
/// The endpoint either contains a `{query}` placeholder or receives the
/// query as a `q` parameter. The response is expected to hold an array of
/// listing objects at `items_pointer`; common field aliases are tried for
/// each candidate field, and anything malformed is dropped to `None` rather
/// than failing the store.
pub struct HttpStoreAdapter {
    key: String,
    config: StoreConfig,
    client: reqwest::Client,
}

impl HttpStoreAdapter {
    pub fn new(key: String, config: StoreConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            key,
            config,
            client,
        }
    }

    fn parse_item(&self, item: &Value) -> Option<RawCandidate> {
        let name = clean_name(str_field(item, &["name", "title"])?.trim());
        if name.is_empty() {
            return None;
        }
        let url = str_field(item, &["url", "link"]).unwrap_or_default();

        let price = money_field(item, &["price", "current_price", "sale_price"]);
        let original_price = money_field(item, &["original_price", "list_price", "was_price"]);
        let review_score = num_field(item, &["rating", "review_score", "stars"])
            .filter(|score| (0.0..=5.0).contains(score));
        let review_count = num_field(item, &["review_count", "reviews", "rating_count"])
            .filter(|count| *count >= 0.0)
            .map(|count| count as u32);
        let image_url = str_field(item, &["image", "image_url", "thumbnail"]).map(String::from);

        let specs = extract_specs(&name);
        Some(RawCandidate {
            store: self.key.clone(),
            name,
            price,
            original_price,
            url: url.to_string(),
            review_score,
            review_count,
            specs: if specs.is_empty() { None } else { Some(specs) },
            image_url,
        })
    }
}

fn str_field<'a>(item: &'a Value, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|n| item.get(n).and_then(Value::as_str))
}

fn num_field(item: &Value, names: &[&str]) -> Option<f64> {
    names.iter().find_map(|n| item.get(n).and_then(Value::as_f64))
}

/// A money field may arrive as a number or as display text ("$1,299.99").
fn money_field(item: &Value, names: &[&str]) -> Option<f64> {
    names.iter().find_map(|n| {
        let value = item.get(n)?;
        match value {
            Value::Number(num) => num.as_f64().and_then(sanitize_price),
            Value::String(text) => parse_price(text),
            _ => None,
        }
    })
}

#[async_trait]
impl StoreAdapter for HttpStoreAdapter {
    fn key(&self) -> &str {
        &self.key
    }

    async fn search(&self, query: &str, opts: &SearchOpts) -> Result<Vec<RawCandidate>> {
        let url_template = self
            .config
            .url
            .as_deref()
            .context("http adapter requires a url")?;

        let request = if url_template.contains("{query}") {
            self.client.get(url_template.replace("{query}", query))
        } else {
            self.client.get(url_template).query(&[("q", query)])
        };

        let response = request
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.key))?
            .error_for_status()
            .with_context(|| format!("{} returned an error status", self.key))?;

        let body: Value = response
            .json()
            .await
            .with_context(|| format!("{} returned non-JSON", self.key))?;

        let items = body
            .pointer(&self.config.items_pointer)
            .and_then(Value::as_array)
            .with_context(|| {
                format!(
                    "{}: no listing array at pointer '{}'",
                    self.key, self.config.items_pointer
                )
            })?;

        let mut results: Vec<RawCandidate> = items
            .iter()
            .filter_map(|item| self.parse_item(item))
            .collect();

        if opts.max_results > 0 {
            results.truncate(opts.max_results);
        }
        Ok(results)
    }
}
