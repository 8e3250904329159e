//! Final ranking assembly.
//!
//! Sorts scored products by combined score, then applies diversity caps so
//! the page never reads as one brand's or one store's catalog. Capped items
//! are demoted below the uncapped ones, never discarded: if the list is
//! short they still surface.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::config::RankingConfig;
use crate::intent::brand_of;
use crate::models::ScoredProduct;
use crate::normalize::tokenize;

/// Order: combined score descending, relevance descending, name ascending.
/// The name tie-break keeps equal-scored runs stable across invocations.
fn compare(a: &ScoredProduct, b: &ScoredProduct) -> Ordering {
    b.combined()
        .partial_cmp(&a.combined())
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.candidate.name.cmp(&b.candidate.name))
}

/// Rank scored products into the final result list.
pub fn assemble(mut products: Vec<ScoredProduct>, config: &RankingConfig) -> Vec<ScoredProduct> {
    products.sort_by(compare);

    let mut brand_counts: HashMap<&'static str, usize> = HashMap::new();
    let mut store_counts: HashMap<String, usize> = HashMap::new();
    let mut kept = Vec::with_capacity(products.len());
    let mut demoted = Vec::new();

    for product in products {
        let brand = brand_of(&tokenize(&product.candidate.name));
        // Listings with no recognizable brand don't count against any cap;
        // they aren't one brand flooding the page.
        let brand_full = brand
            .map(|b| brand_counts.get(b).copied().unwrap_or(0) >= config.per_brand_cap)
            .unwrap_or(false);
        let store_full = store_counts
            .get(&product.candidate.store)
            .copied()
            .unwrap_or(0)
            >= config.per_store_cap;

        if brand_full || store_full {
            demoted.push(product);
        } else {
            if let Some(b) = brand {
                *brand_counts.entry(b).or_insert(0) += 1;
            }
            *store_counts
                .entry(product.candidate.store.clone())
                .or_insert(0) += 1;
            kept.push(product);
        }
    }

    kept.extend(demoted);
    kept.truncate(config.result_limit);
    kept
}
