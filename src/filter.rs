//! Multi-phase relevance filter.
//!
//! Runs an ordered sequence of phases over each candidate name; a hard
//! reject in an earlier phase short-circuits the rest:
//!
//! - Phase A: junk and service listings (scraper artifacts, warranties,
//!   gift cards) and accessories that weren't asked for.
//! - Phase B: spec mismatches — size outside the tolerance band, category
//!   conflicts, missing or third-party brand.
//! - Phase C: a 0–1 soft relevance score for survivors. Tie-break only,
//!   never a rejection.
//!
//! The size band is asymmetric: it widens upward and stays tight downward.
//! Someone shopping for a 55" TV is happy to see a 60" deal, never a 48".

use crate::config::FilterConfig;
use crate::intent::{brand_of, detect_category};
use crate::models::{Category, QueryIntent};
use crate::normalize::{clean_name, extract_size, tokenize};

/// Outcome of evaluating one candidate name against the query intent.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub rejected: bool,
    pub reason: Option<&'static str>,
    /// Phase C relevance, 0–1. Zero for rejected candidates.
    pub soft_score: f64,
}

impl Verdict {
    fn reject(reason: &'static str) -> Self {
        Self {
            rejected: true,
            reason: Some(reason),
            soft_score: 0.0,
        }
    }

    fn accept(soft_score: f64) -> Self {
        Self {
            rejected: false,
            reason: None,
            soft_score,
        }
    }
}

/// Boilerplate fragments that mark a scraped non-listing.
const JUNK_PHRASES: &[&str] = &[
    "click here",
    "see details",
    "learn more",
    "shop now",
    "sign in",
    "currently unavailable",
];

/// Service and non-product listings, always rejected.
const SERVICE_TOKENS: &[&str] = &[
    "warranty",
    "protection",
    "giftcard",
    "installation",
    "subscription",
    "insurance",
    "membership",
];

const SERVICE_PHRASES: &[&str] = &["gift card", "service plan", "protection plan"];

/// Accessory nouns: rejected unless the query asked for one or the listing
/// is a bundle.
const ACCESSORY_NOUNS: &[&str] = &[
    "mount",
    "case",
    "cable",
    "stand",
    "cover",
    "adapter",
    "bracket",
    "remote",
    "sleeve",
    "strap",
    "charger",
    "protector",
    "antenna",
    "dock",
    "hub",
];

/// Evaluate one candidate name against the intent.
pub fn evaluate(name: &str, intent: &QueryIntent, config: &FilterConfig) -> Verdict {
    let cleaned = clean_name(name);
    let lower = cleaned.to_lowercase();
    let name_tokens = tokenize(&cleaned);

    // ── Phase A: junk and non-product listings ──────────────────────────
    if cleaned.len() < 5 || !cleaned.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Verdict::reject("junk name");
    }
    if JUNK_PHRASES.iter().any(|p| lower.contains(p)) {
        return Verdict::reject("junk name");
    }
    if SERVICE_TOKENS.iter().any(|t| name_tokens.iter().any(|n| n == t))
        || SERVICE_PHRASES.iter().any(|p| lower.contains(p))
    {
        return Verdict::reject("service listing");
    }

    let accessory = ACCESSORY_NOUNS
        .iter()
        .find(|noun| name_tokens.iter().any(|t| t == *noun));
    if let Some(noun) = accessory {
        let requested = intent.tokens.iter().any(|t| t == noun);
        if !requested && !is_bundle(intent, &cleaned, &name_tokens) {
            return Verdict::reject("accessory");
        }
    }

    // ── Phase B: spec mismatch ──────────────────────────────────────────
    if let Some(target) = intent.target_size {
        match extract_size(&cleaned) {
            Some(size) => {
                let band = base_band(target);
                let upward = if target < config.upward_cutoff_inches {
                    band * config.upward_multiplier
                } else {
                    band
                };
                if size < target - band || size > target + upward {
                    return Verdict::reject("size mismatch");
                }
            }
            // For display products, no detectable size on a sized query is
            // itself a mismatch: these listings always state their size.
            None if intent.category.is_size_bearing() => {
                return Verdict::reject("size unknown");
            }
            None => {}
        }
    }

    if intent.category != Category::Unknown {
        let detected = detect_category(&cleaned);
        if detected != Category::Unknown && detected != intent.category {
            return Verdict::reject("category mismatch");
        }
    }

    if let Some(brand) = intent.brand.as_deref() {
        if is_compat_clause_only(&lower, &name_tokens, brand) {
            return Verdict::reject("third-party accessory");
        }
        let direct = name_tokens.iter().any(|t| t == brand);
        let via_prefix = brand_of(&name_tokens) == Some(brand);
        if !direct && !via_prefix {
            return Verdict::reject("brand mismatch");
        }
    }

    // ── Phase C: soft relevance score ───────────────────────────────────
    Verdict::accept(soft_score(intent, &name_tokens))
}

/// Base tolerance band; widens with the target size.
fn base_band(target: f64) -> f64 {
    if target <= 27.0 {
        2.0
    } else if target <= 34.0 {
        3.0
    } else {
        5.0
    }
}

/// A bundle carries the category's core noun together with a size token, so
/// "55\" TV with stand" survives the accessory check.
fn is_bundle(intent: &QueryIntent, name: &str, name_tokens: &[String]) -> bool {
    let Some(noun) = intent.category.core_noun() else {
        return false;
    };
    name_tokens.iter().any(|t| t == noun) && extract_size(name).is_some()
}

/// The brand appears only inside a "for X" / "compatible with X" clause —
/// the tell of a third-party accessory, not a product by that brand.
fn is_compat_clause_only(lower: &str, name_tokens: &[String], brand: &str) -> bool {
    let clause = ["for ", "fits ", "compatible with "]
        .iter()
        .any(|lead| lower.contains(&format!("{lead}{brand}")));
    if !clause {
        return false;
    }
    let mentions = name_tokens.iter().filter(|t| t.as_str() == brand).count();
    let clause_mentions = ["for", "fits", "with"]
        .iter()
        .map(|lead| lower.matches(&format!("{lead} {brand}")).count())
        .sum::<usize>();
    mentions <= clause_mentions
}

/// Fractional token overlap plus a core-noun bonus, minus a penalty for an
/// unrequested accessory noun.
fn soft_score(intent: &QueryIntent, name_tokens: &[String]) -> f64 {
    if intent.tokens.is_empty() {
        return 0.0;
    }
    let overlap = intent
        .tokens
        .iter()
        .filter(|t| name_tokens.contains(t))
        .count() as f64
        / intent.tokens.len() as f64;

    let mut score = overlap;
    if let Some(noun) = intent.category.core_noun() {
        if name_tokens.iter().any(|t| t == noun) {
            score += 0.15;
        }
    }
    let unrequested_accessory = ACCESSORY_NOUNS
        .iter()
        .any(|noun| name_tokens.iter().any(|t| t == noun) && !intent.tokens.iter().any(|t| t == noun));
    if unrequested_accessory {
        score -= 0.15;
    }
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::parse;

    fn config() -> FilterConfig {
        FilterConfig::default()
    }

    #[test]
    fn test_junk_names_rejected() {
        let intent = parse("55 inch tv");
        assert!(evaluate("...", &intent, &config()).rejected);
        assert!(evaluate("Click here for more deals", &intent, &config()).rejected);
        assert!(evaluate("!!!", &intent, &config()).rejected);
    }

    #[test]
    fn test_service_listings_rejected() {
        let intent = parse("55 inch tv");
        let verdict = evaluate("3-Year TV Protection Plan", &intent, &config());
        assert!(verdict.rejected);
        assert_eq!(verdict.reason, Some("service listing"));
        assert!(evaluate("$100 Gift Card", &intent, &config()).rejected);
    }

    #[test]
    fn test_accessory_rejected_unless_requested() {
        let tv_intent = parse("55 inch tv");
        assert!(evaluate("Full-Motion TV Wall Mount", &tv_intent, &config()).rejected);

        // Asking for the accessory makes it relevant
        let mount_intent = parse("tv wall mount");
        assert!(!evaluate("Full-Motion TV Wall Mount", &mount_intent, &config()).rejected);
    }

    #[test]
    fn test_bundle_survives_accessory_check() {
        let intent = parse("55 inch tv");
        let verdict = evaluate("TCL 55\" 4K TV with Stand", &intent, &config());
        assert!(!verdict.rejected);
    }

    #[test]
    fn test_size_band_asymmetric_at_55() {
        // 55 >= the upward cutoff: band stays symmetric at ±5
        let intent = parse("55 inch tv");
        assert!(!evaluate("LG 60\" OLED TV", &intent, &config()).rejected);
        assert!(evaluate("LG 48\" OLED TV", &intent, &config()).rejected);
        assert!(evaluate("LG 70\" OLED TV", &intent, &config()).rejected);
        assert!(!evaluate("LG 50\" OLED TV", &intent, &config()).rejected);
    }

    #[test]
    fn test_size_band_widens_upward_below_cutoff() {
        // Target 27: band 2 down, 2×2 up
        let intent = parse("27 inch monitor");
        assert!(!evaluate("Dell 31\" Monitor", &intent, &config()).rejected);
        assert!(evaluate("Dell 32\" Monitor", &intent, &config()).rejected);
        assert!(evaluate("Dell 24\" Monitor", &intent, &config()).rejected);
        assert!(!evaluate("Dell 25\" Monitor", &intent, &config()).rejected);
    }

    #[test]
    fn test_sizeless_display_rejected_for_sized_query() {
        let intent = parse("55 inch tv");
        let verdict = evaluate("LG OLED evo Smart TV", &intent, &config());
        assert!(verdict.rejected);
        assert_eq!(verdict.reason, Some("size unknown"));
    }

    #[test]
    fn test_sizeless_non_display_survives() {
        // Sized query outside the display categories: absence of a size on
        // the candidate is not evidence of mismatch
        let intent = parse("13 inch laptop sleeve");
        assert!(!evaluate("Neoprene Laptop Sleeve", &intent, &config()).rejected);
    }

    #[test]
    fn test_category_conflict_rejected() {
        let intent = parse("55 inch tv");
        let verdict = evaluate("Dell 55\" Conference Room Monitor", &intent, &config());
        assert!(verdict.rejected);
        assert_eq!(verdict.reason, Some("category mismatch"));
    }

    #[test]
    fn test_brand_mismatch_rejected() {
        let intent = parse("samsung 55 inch tv");
        assert!(evaluate("LG 55\" OLED TV", &intent, &config()).rejected);
        assert!(!evaluate("Samsung 55\" QLED TV", &intent, &config()).rejected);
    }

    #[test]
    fn test_brand_satisfied_via_model_prefix() {
        let intent = parse("samsung 55 inch tv");
        let verdict = evaluate("QN55S90C 55\" OLED Smart TV", &intent, &config());
        assert!(!verdict.rejected, "{:?}", verdict.reason);
    }

    #[test]
    fn test_compat_clause_is_third_party() {
        let intent = parse("samsung 55 inch tv");
        let verdict = evaluate(
            "55\" TV Replacement Legs for Samsung 55 inch TV",
            &intent,
            &config(),
        );
        assert!(verdict.rejected);
        assert_eq!(verdict.reason, Some("third-party accessory"));
    }

    #[test]
    fn test_soft_score_orders_by_overlap() {
        let intent = parse("55 inch 4k tv");
        let close = evaluate("TCL 55 inch 4K TV", &intent, &config());
        let loose = evaluate("TCL 55 inch Television Set", &intent, &config());
        assert!(!close.rejected && !loose.rejected);
        assert!(close.soft_score > loose.soft_score);
    }

    #[test]
    fn test_soft_score_in_unit_range() {
        let intent = parse("55 inch tv");
        let verdict = evaluate("TCL 55 inch 4K TV with huge bonus bundle", &intent, &config());
        assert!((0.0..=1.0).contains(&verdict.soft_score));
    }
}
