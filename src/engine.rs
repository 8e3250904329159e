//! The search pipeline, end to end.
//!
//! One call to [`aggregate`] runs the whole sequence: parse the query
//! intent, fan out across the enabled stores, sanitize what came back,
//! filter for relevance, collapse cross-store duplicates, score the
//! survivors, and assemble the final ranking. Per-store failures ride
//! along in the outcome instead of failing the search.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::adapter::{AdapterRegistry, SearchOpts};
use crate::cache::ResultCache;
use crate::config::Config;
use crate::fanout::FanOut;
use crate::filter;
use crate::health::StoreHealth;
use crate::intent::{self, detect_category};
use crate::matcher::{self, extract_model};
use crate::models::{AggregateOutcome, Category, QueryIntent, RawCandidate};
use crate::normalize::{extract_specs, sanitize_price};
use crate::ranking;
use crate::scoring;

/// Survivor count below which an active price filter triggers a
/// relax-your-bounds warning.
const THIN_RESULT_FLOOR: usize = 3;

/// Run one search across all configured stores.
pub async fn aggregate(
    config: &Config,
    pool: &SqlitePool,
    registry: &AdapterRegistry,
    query: &str,
    opts: &SearchOpts,
    store_filter: Option<&[String]>,
) -> AggregateOutcome {
    let intent = intent::parse(query);
    debug!(
        category = ?intent.category,
        target_size = ?intent.target_size,
        brand = ?intent.brand,
        specific = intent.is_specific,
        "parsed query intent"
    );

    let health = StoreHealth::new(pool.clone(), config.breaker.clone());
    let cache = ResultCache::new(pool.clone(), config.cache.clone());
    let fanout = FanOut::new(config, &health, &cache);
    let raw = fanout.run(registry, query, opts, store_filter).await;

    let fetched = raw.results.len();
    let candidates: Vec<RawCandidate> = raw.results.into_iter().map(sanitize).collect();

    let mut survivors: Vec<(RawCandidate, f64)> = Vec::new();
    for candidate in candidates {
        let verdict = filter::evaluate(&candidate.name, &intent, &config.filter);
        if verdict.rejected {
            debug!(
                store = %candidate.store,
                name = %candidate.name,
                reason = verdict.reason.unwrap_or("unknown"),
                "candidate rejected"
            );
            continue;
        }
        if !within_price_bounds(&candidate, opts) {
            continue;
        }
        if !matches_specific_model(&candidate, &intent, query) {
            debug!(store = %candidate.store, name = %candidate.name, "model mismatch on specific query");
            continue;
        }
        survivors.push((candidate, verdict.soft_score));
    }

    let merged = matcher::collapse_duplicates(survivors, |store| config.store_trust(store));
    let matched = merged.len();

    let scored = merged
        .into_iter()
        .map(|(candidate, relevance)| {
            let category = candidate_category(&candidate, &intent);
            scoring::score(candidate, category, relevance, config)
        })
        .collect();

    let products = ranking::assemble(scored, &config.ranking);

    let mut warnings = Vec::new();
    if matched < THIN_RESULT_FLOOR && price_filter_active(opts) {
        warnings.push(
            "few results matched the price range; consider widening --min-price/--max-price"
                .to_string(),
        );
    }

    info!(
        fetched,
        ranked = products.len(),
        source_errors = raw.errors.len(),
        "search complete"
    );

    AggregateOutcome {
        products,
        errors: raw.errors,
        warnings,
    }
}

/// Normalize prices to the sane range and backfill specs from the listing
/// name when the source supplied none.
fn sanitize(mut candidate: RawCandidate) -> RawCandidate {
    candidate.price = candidate.price.and_then(sanitize_price);
    candidate.original_price = candidate.original_price.and_then(sanitize_price);
    if candidate.specs.is_none() {
        let parsed = extract_specs(&candidate.name);
        if !parsed.is_empty() {
            candidate.specs = Some(parsed);
        }
    }
    candidate
}

/// Price bounds only exclude candidates whose price is known. With a bound
/// active, an unknown price is also an exclusion: the caller asked for a
/// range and an unpriced listing can't be placed in it.
fn within_price_bounds(candidate: &RawCandidate, opts: &SearchOpts) -> bool {
    if !price_filter_active(opts) {
        return true;
    }
    let Some(price) = candidate.price else {
        return false;
    };
    if opts.min_price.is_some_and(|min| price < min) {
        return false;
    }
    if opts.max_price.is_some_and(|max| price > max) {
        return false;
    }
    true
}

fn price_filter_active(opts: &SearchOpts) -> bool {
    opts.min_price.is_some() || opts.max_price.is_some()
}

/// A specific query (brand + model) holds candidates to the exact model.
fn matches_specific_model(candidate: &RawCandidate, intent: &QueryIntent, query: &str) -> bool {
    if !intent.is_specific {
        return true;
    }
    let Some(wanted) = extract_model(query) else {
        return true;
    };
    extract_model(&candidate.name).is_some_and(|m| m == wanted)
}

/// Category used for scoring: the query's when it resolved, otherwise
/// whatever the listing name says about itself.
fn candidate_category(candidate: &RawCandidate, intent: &QueryIntent) -> Category {
    if intent.category != Category::Unknown {
        intent.category
    } else {
        detect_category(&candidate.name)
    }
}
