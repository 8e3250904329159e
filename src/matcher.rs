//! Cross-source product matching.
//!
//! Listings from different stores carry no shared identifier, so duplicates
//! are merged on a derived match key. Brand + model extraction is attempted
//! first (model via regex templates tried in priority order); when that
//! fails, the key falls back to a truncated normalized name plus a price
//! bucket, so near-identical names at very different prices stay separate.
//!
//! Refurbished and new units of the same model must never merge: refurb
//! language adds a suffix to the key.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::intent::{brand_of, looks_like_model};
use crate::models::RawCandidate;
use crate::normalize::tokenize;

/// Price bucket width for the fallback key.
const PRICE_BUCKET: f64 = 50.0;

/// Truncation length for the fallback name fragment.
const NAME_KEY_LEN: usize = 40;

const REFURB_PHRASES: &[&str] = &[
    "refurbished",
    "refurb",
    "renewed",
    "open-box",
    "open box",
    "pre-owned",
    "preowned",
    "remanufactured",
];

fn sku_with_size_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Display SKUs embed the panel size after the line prefix; the size
    // digits are not part of the model identity (QN55S90C and a 65" of the
    // same line differ only there, but two stores listing the same 55" set
    // may or may not spell the prefix at all).
    RE.get_or_init(|| {
        Regex::new(r"^(?:qn|un|qe|kd|xr|oled)\d{2}([a-z]{1,2}\d{1,4}[a-z]{0,3})$")
            .expect("sku regex")
    })
}

fn hyphen_model_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([a-z]{1,4})-(\d{2,5}[a-z0-9]*)$").expect("hyphen regex"))
}

/// Whether the listing uses refurbished/open-box language.
pub fn is_refurbished(name: &str) -> bool {
    let lower = name.to_lowercase();
    REFURB_PHRASES.iter().any(|p| lower.contains(p))
}

/// Extract a normalized model identifier from a listing name, trying the
/// templates in priority order across all tokens.
pub fn extract_model(name: &str) -> Option<String> {
    let tokens = tokenize(name);

    // Template 1: panel SKU with embedded size
    for token in &tokens {
        if let Some(caps) = sku_with_size_re().captures(token) {
            return Some(caps[1].to_string());
        }
    }
    // Template 2: hyphenated model ("wh-1000xm5")
    for token in &tokens {
        if let Some(caps) = hyphen_model_re().captures(token) {
            return Some(format!("{}{}", &caps[1], &caps[2]));
        }
    }
    // Template 3: any plausible model token
    for token in &tokens {
        if looks_like_model(token) {
            return Some(token.chars().filter(|c| c.is_ascii_alphanumeric()).collect());
        }
    }
    None
}

/// Derive the grouping key for a candidate.
///
/// `brand:model` when both resolve, with a `:refurb` suffix for
/// refurbished/open-box listings; otherwise a truncated normalized name
/// plus a price bucket rounded to the nearest $50.
pub fn match_key(name: &str, price: Option<f64>) -> String {
    let tokens = tokenize(name);
    let refurb = is_refurbished(name);

    let brand = brand_of(&tokens);
    let model = extract_model(name);

    let mut key = match (brand, model) {
        (Some(brand), Some(model)) => format!("{brand}:{model}"),
        _ => {
            let normalized: String = tokens.join(" ").chars().take(NAME_KEY_LEN).collect();
            let bucket = price
                .map(|p| ((p / PRICE_BUCKET).round() * PRICE_BUCKET) as i64)
                .unwrap_or(0);
            format!("{normalized}:{bucket}")
        }
    };
    if refurb {
        key.push_str(":refurb");
    }
    key
}

/// Collapse candidates sharing a match key down to one representative each,
/// preserving first-seen group order. Each candidate carries its soft
/// relevance score alongside.
///
/// The representative is the candidate from the more trusted store; on a
/// trust tie, the one with more complete data wins.
pub fn collapse_duplicates<F>(
    candidates: Vec<(RawCandidate, f64)>,
    store_trust: F,
) -> Vec<(RawCandidate, f64)>
where
    F: Fn(&str) -> f64,
{
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, (RawCandidate, f64)> = HashMap::new();

    for (candidate, relevance) in candidates {
        let key = match_key(&candidate.name, candidate.price);
        match best.get_mut(&key) {
            None => {
                order.push(key.clone());
                best.insert(key, (candidate, relevance));
            }
            Some(current) => {
                let challenger_rank = (
                    store_trust(&candidate.store),
                    candidate.data_confidence(),
                );
                let incumbent_rank = (
                    store_trust(&current.0.store),
                    current.0.data_confidence(),
                );
                if challenger_rank > incumbent_rank {
                    *current = (candidate, relevance);
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| best.remove(&key))
        .collect()
}
