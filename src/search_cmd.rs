use anyhow::{bail, Result};
use serde_json::json;

use crate::adapter::{AdapterRegistry, SearchOpts};
use crate::config::Config;
use crate::db;
use crate::engine;
use crate::models::ScoredProduct;

#[allow(clippy::too_many_arguments)]
pub async fn run_search(
    config: &Config,
    query: &str,
    limit: Option<usize>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    stores: Vec<String>,
    as_json: bool,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }
    if let (Some(min), Some(max)) = (min_price, max_price) {
        if min > max {
            bail!("--min-price must not exceed --max-price");
        }
    }

    let registry = AdapterRegistry::from_config(config);
    if registry.is_empty() {
        bail!("No stores configured. Add [stores.<key>] entries to the config file.");
    }
    for store in &stores {
        if registry.find(store).is_none() {
            bail!(
                "Unknown store '{}'. Configured: {}",
                store,
                registry.keys().join(", ")
            );
        }
    }

    let pool = db::connect(config).await?;

    let opts = SearchOpts {
        max_results: config.fanout.per_store_result_cap,
        min_price,
        max_price,
    };
    let store_filter = (!stores.is_empty()).then_some(stores.as_slice());

    let mut ranking = config.clone();
    if let Some(limit) = limit {
        ranking.ranking.result_limit = limit;
    }

    let outcome = engine::aggregate(&ranking, &pool, &registry, query, &opts, store_filter).await;
    pool.close().await;

    if as_json {
        let doc = json!({
            "query": query,
            "products": outcome.products,
            "errors": outcome.errors,
            "warnings": outcome.warnings,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }
    for error in &outcome.errors {
        eprintln!("note: {}: {}", error.store, error.message);
    }

    if outcome.products.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, product) in outcome.products.iter().enumerate() {
        print_product(i + 1, product);
    }
    Ok(())
}

fn print_product(rank: usize, product: &ScoredProduct) {
    let candidate = &product.candidate;
    let price = match candidate.price {
        Some(p) => format!("${p:.2}"),
        None => "price unknown".to_string(),
    };
    let was = candidate
        .original_price
        .filter(|orig| candidate.price.is_some_and(|p| *orig > p))
        .map(|orig| format!(" (was ${orig:.2})"))
        .unwrap_or_default();
    let tag = product
        .tag
        .as_deref()
        .map(|t| format!("  [{t}]"))
        .unwrap_or_default();

    println!(
        "{}. [{:.1}] {} — {}{}{}",
        rank,
        product.combined(),
        candidate.name,
        price,
        was,
        tag
    );
    println!(
        "    store: {}  quality: {:.1}  value: {:.1}  confidence: {:.0}%",
        candidate.store,
        product.quality,
        product.value,
        product.confidence * 100.0
    );
    if let Some(score) = candidate.review_score {
        let count = candidate.review_count.unwrap_or(0);
        println!("    reviews: {score:.1}/5 ({count})");
    }
    if !candidate.url.is_empty() {
        println!("    url: {}", candidate.url);
    }
    println!();
}
