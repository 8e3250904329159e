//! Dual quality/value scoring.
//!
//! Every matched product gets two independent 0–100 scores. Quality is
//! price-blind: brand tier, category spec score, review signal, review
//! volume, and store trust, with different weight vectors for
//! appliance-like categories (review signal dominates) and general
//! electronics (brand + specs dominate). Value is price-aware: discount
//! depth, specs-per-dollar, review-per-dollar, trust, and the raw review
//! score. Per-dollar terms scale by the category-median-price ratio capped
//! at 1.5×, so an ultra-cheap listing cannot auto-max them.
//!
//! The brand tier, store trust, and category median tables are plain data,
//! testable on their own.

use crate::config::Config;
use crate::intent::brand_of;
use crate::matcher::is_refurbished;
use crate::models::{
    Category, HdrTier, Panel, ProductSpecs, RawCandidate, Resolution, ScoredProduct,
};
use crate::normalize::tokenize;

/// Multiplicative penalty applied to the final quality of a refurbished or
/// open-box listing. Quality only; value is unaffected.
const REFURB_QUALITY_PENALTY: f64 = 0.85;

/// Review counts below this are blended toward neutral.
const REVIEW_CONFIDENCE_FLOOR: u32 = 20;

/// Review count treated as saturation for the log-scaled volume score.
const REVIEW_VOLUME_CEILING: f64 = 5000.0;

/// Cap on the category-median-price ratio in per-dollar value terms.
const MEDIAN_RATIO_CAP: f64 = 1.5;

struct QualityWeights {
    brand: f64,
    spec: f64,
    review: f64,
    volume: f64,
    trust: f64,
}

/// General electronics: brand and specs carry the signal.
const GENERAL_QUALITY: QualityWeights = QualityWeights {
    brand: 0.25,
    spec: 0.30,
    review: 0.20,
    volume: 0.10,
    trust: 0.15,
};

/// Appliance-like categories: spec sheets say little, owners say a lot.
const APPLIANCE_QUALITY: QualityWeights = QualityWeights {
    brand: 0.15,
    spec: 0.15,
    review: 0.35,
    volume: 0.20,
    trust: 0.15,
};

const TIER_PREMIUM: &[&str] = &[
    "sony", "samsung", "lg", "apple", "bose", "canon", "nikon", "dyson",
];
const TIER_STRONG: &[&str] = &[
    "panasonic",
    "philips",
    "dell",
    "asus",
    "fujifilm",
    "sennheiser",
    "whirlpool",
    "bosch",
    "msi",
    "nvidia",
];
const TIER_MID: &[&str] = &[
    "tcl",
    "hisense",
    "lenovo",
    "hp",
    "acer",
    "jbl",
    "maytag",
    "frigidaire",
    "sigma",
    "tamron",
    "amd",
    "gigabyte",
    "shark",
];
const TIER_VALUE: &[&str] = &[
    "vizio", "sharp", "toshiba", "beats", "anker", "bissell",
];

/// Brand-tier component, 0–100. Unknown brands sit at neutral 50.
pub fn brand_tier_score(brand: Option<&str>) -> f64 {
    match brand {
        Some(b) if TIER_PREMIUM.contains(&b) => 90.0,
        Some(b) if TIER_STRONG.contains(&b) => 75.0,
        Some(b) if TIER_MID.contains(&b) => 60.0,
        Some(b) if TIER_VALUE.contains(&b) => 45.0,
        _ => 50.0,
    }
}

/// Typical street price per category, for the per-dollar value terms.
pub fn category_median_price(category: Category) -> f64 {
    match category {
        Category::Tv => 800.0,
        Category::Monitor => 300.0,
        Category::Laptop => 1000.0,
        Category::Tablet => 500.0,
        Category::Phone => 800.0,
        Category::Camera => 1500.0,
        Category::Lens => 900.0,
        Category::Headphones => 250.0,
        Category::Refrigerator => 1200.0,
        Category::Washer => 900.0,
        Category::Vacuum => 300.0,
        Category::Microwave => 150.0,
        Category::Gpu => 600.0,
        Category::Unknown => 500.0,
    }
}

/// Category-specific spec score, 0–100.
///
/// Display products are rated on all four display axes — an unstated
/// resolution on a TV is itself a signal. Other categories average only
/// the fields that are present, neutral 50 when there are none.
pub fn spec_score(category: Category, specs: Option<&ProductSpecs>) -> f64 {
    let Some(specs) = specs else {
        return 50.0;
    };

    let resolution = specs.resolution.map(|r| match r {
        Resolution::R8k => 100.0,
        Resolution::R4k => 85.0,
        Resolution::R1440p => 70.0,
        Resolution::R1080p => 50.0,
        Resolution::R720p => 30.0,
    });
    let panel = specs.panel.map(|p| match p {
        Panel::Oled => 100.0,
        Panel::MiniLed => 90.0,
        Panel::Qled => 80.0,
        Panel::Ips => 70.0,
        Panel::Va => 60.0,
        Panel::Tn => 40.0,
    });
    let refresh = specs.refresh_hz.map(|hz| match hz {
        240.. => 100.0,
        144..=239 => 90.0,
        120..=143 => 80.0,
        75..=119 => 60.0,
        60..=74 => 50.0,
        _ => 40.0,
    });
    let hdr = specs.hdr.map(|h| match h {
        HdrTier::DolbyVision => 100.0,
        HdrTier::Hdr10Plus => 90.0,
        HdrTier::Hdr10 => 75.0,
        HdrTier::Hdr => 60.0,
    });

    if category.is_size_bearing() {
        let components = [
            resolution.unwrap_or(40.0),
            panel.unwrap_or(50.0),
            refresh.unwrap_or(45.0),
            hdr.unwrap_or(40.0),
        ];
        components.iter().sum::<f64>() / components.len() as f64
    } else {
        let present: Vec<f64> = [resolution, panel, refresh, hdr]
            .into_iter()
            .flatten()
            .collect();
        if present.is_empty() {
            50.0
        } else {
            present.iter().sum::<f64>() / present.len() as f64
        }
    }
}

/// Review score on a 0–100 scale, blended toward neutral 50 when the
/// review count is below the confidence floor.
fn review_component(score: Option<f64>, count: Option<u32>) -> f64 {
    let Some(score) = score else {
        return 50.0;
    };
    let pct = (score / 5.0 * 100.0).clamp(0.0, 100.0);
    let count = count.unwrap_or(0);
    if count >= REVIEW_CONFIDENCE_FLOOR {
        pct
    } else {
        let confidence = f64::from(count) / f64::from(REVIEW_CONFIDENCE_FLOOR);
        50.0 + (pct - 50.0) * confidence
    }
}

/// Log-scaled review volume, saturating at the ceiling.
fn volume_component(count: Option<u32>) -> f64 {
    let Some(count) = count else {
        return 0.0;
    };
    let scaled = (1.0 + f64::from(count)).ln() / (1.0 + REVIEW_VOLUME_CEILING).ln();
    (scaled.min(1.0)) * 100.0
}

/// Price-blind quality, before clamping.
fn quality_score(candidate: &RawCandidate, category: Category, trust: f64) -> f64 {
    let weights = if category.is_appliance_like() {
        &APPLIANCE_QUALITY
    } else {
        &GENERAL_QUALITY
    };

    let brand = brand_of(&tokenize(&candidate.name));
    let raw = weights.brand * brand_tier_score(brand)
        + weights.spec * spec_score(category, candidate.specs.as_ref())
        + weights.review * review_component(candidate.review_score, candidate.review_count)
        + weights.volume * volume_component(candidate.review_count)
        + weights.trust * trust * 10.0;

    if is_refurbished(&candidate.name) {
        raw * REFURB_QUALITY_PENALTY
    } else {
        raw
    }
}

/// Discount depth as a percentage of the original price.
fn discount_component(price: Option<f64>, original: Option<f64>) -> f64 {
    match (price, original) {
        (Some(price), Some(original)) if original > price && original > 0.0 => {
            ((original - price) / original * 100.0).clamp(0.0, 100.0)
        }
        _ => 0.0,
    }
}

/// Price-aware value, before clamping.
fn value_score(candidate: &RawCandidate, category: Category, trust: f64) -> f64 {
    let ratio = candidate
        .price
        .map(|price| (category_median_price(category) / price).min(MEDIAN_RATIO_CAP))
        .unwrap_or(0.0);

    let specs = spec_score(category, candidate.specs.as_ref());
    let review_pct = candidate
        .review_score
        .map(|score| (score / 5.0 * 100.0).clamp(0.0, 100.0))
        .unwrap_or(50.0);

    let discount = discount_component(candidate.price, candidate.original_price);
    let specs_per_dollar = (specs * ratio).min(100.0);
    let review_per_dollar = (review_pct * ratio).min(100.0);

    0.30 * discount
        + 0.25 * specs_per_dollar
        + 0.20 * review_per_dollar
        + 0.10 * trust * 10.0
        + 0.15 * review_pct
}

/// Display tag, evaluated in priority order; first match wins.
fn assign_tag(
    quality: f64,
    value: f64,
    price: Option<f64>,
    confidence: f64,
    refurb: bool,
    premium_price: f64,
) -> Option<String> {
    if confidence < 0.5 {
        return Some(if refurb {
            "Low Data/Refurb".to_string()
        } else {
            "Low Data".to_string()
        });
    }
    if quality >= 75.0 && value >= 65.0 {
        return Some("Sweet Spot".to_string());
    }
    if quality >= 75.0 && price.is_some_and(|p| p >= premium_price) {
        return Some("Premium".to_string());
    }
    if value >= 65.0 {
        return Some("Deal".to_string());
    }
    if quality >= 60.0 && value >= 50.0 {
        return Some("Solid".to_string());
    }
    if refurb {
        return Some("Refurb".to_string());
    }
    None
}

/// Score one candidate into a [`ScoredProduct`].
pub fn score(
    candidate: RawCandidate,
    category: Category,
    relevance: f64,
    config: &Config,
) -> ScoredProduct {
    let trust = config.store_trust(&candidate.store);
    let quality = quality_score(&candidate, category, trust).clamp(0.0, 100.0);
    let value = value_score(&candidate, category, trust).clamp(0.0, 100.0);
    let confidence = candidate.data_confidence();
    let refurb = is_refurbished(&candidate.name);
    let tag = assign_tag(
        quality,
        value,
        candidate.price,
        confidence,
        refurb,
        config.ranking.premium_price,
    );

    ScoredProduct {
        candidate,
        quality,
        value,
        tag,
        confidence,
        relevance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::extract_specs;

    fn config() -> Config {
        Config::minimal("/tmp/scoring.sqlite".into())
    }

    fn tv(name: &str, price: f64) -> RawCandidate {
        RawCandidate {
            store: "acme".to_string(),
            name: name.to_string(),
            price: Some(price),
            original_price: Some(price * 1.25),
            url: String::new(),
            review_score: Some(4.5),
            review_count: Some(850),
            specs: Some(extract_specs(name)),
            image_url: None,
        }
    }

    #[test]
    fn test_refurb_quality_is_exactly_85_percent() {
        let cfg = config();
        let new = score(tv("Samsung QN55S90C 55\" OLED 4K TV", 1299.0), Category::Tv, 0.9, &cfg);
        let refurb = score(
            tv("Samsung QN55S90C 55\" OLED 4K TV Refurbished", 1299.0),
            Category::Tv,
            0.9,
            &cfg,
        );
        assert!((refurb.quality - new.quality * 0.85).abs() < 1e-9);
        // Value is price-aware, not condition-aware
        assert!((refurb.value - new.value).abs() < 1e-9);
    }

    #[test]
    fn test_scores_clamped_to_unit_interval_times_100() {
        let cfg = config();
        let product = score(tv("LG 55\" OLED 4K TV 120Hz Dolby Vision", 1.0), Category::Tv, 1.0, &cfg);
        assert!((0.0..=100.0).contains(&product.quality));
        assert!((0.0..=100.0).contains(&product.value));
    }

    #[test]
    fn test_weight_vectors_differ_by_category() {
        let cfg = config();
        // Identical review signal, no brand, no specs: the appliance vector
        // leans on reviews harder, so great reviews score higher there.
        let listing = RawCandidate {
            store: "acme".to_string(),
            name: "Workhorse Model Home Unit".to_string(),
            price: Some(400.0),
            original_price: None,
            url: String::new(),
            review_score: Some(5.0),
            review_count: Some(4000),
            specs: None,
            image_url: None,
        };
        let as_appliance = score(listing.clone(), Category::Washer, 0.5, &cfg);
        let as_general = score(listing, Category::Laptop, 0.5, &cfg);
        assert!(as_appliance.quality > as_general.quality);
    }

    #[test]
    fn test_low_review_count_blends_toward_neutral() {
        // 5 stars on 4 reviews is barely better than no signal
        let few = review_component(Some(5.0), Some(4));
        let many = review_component(Some(5.0), Some(400));
        assert!(few < many);
        assert!((few - 60.0).abs() < 1e-9); // 50 + 50·(4/20)
        assert!((many - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_volume_is_log_scaled() {
        let small = volume_component(Some(10));
        let medium = volume_component(Some(100));
        let large = volume_component(Some(5000));
        assert!(small < medium && medium < large);
        assert!((large - 100.0).abs() < 1.0);
        // Doubling reviews adds much less at the top than at the bottom
        assert!(volume_component(Some(20)) - small > volume_component(Some(5000)) - volume_component(Some(2500)));
    }

    #[test]
    fn test_median_ratio_cap_limits_cheap_listings() {
        // A $10 TV must not auto-max the per-dollar terms
        let ratio: f64 = (category_median_price(Category::Tv) / 10.0).min(MEDIAN_RATIO_CAP);
        assert!((ratio - MEDIAN_RATIO_CAP).abs() < 1e-9);
    }

    #[test]
    fn test_discount_depth() {
        assert!((discount_component(Some(75.0), Some(100.0)) - 25.0).abs() < 1e-9);
        assert_eq!(discount_component(Some(100.0), Some(100.0)), 0.0);
        assert_eq!(discount_component(Some(100.0), None), 0.0);
        // Original below current: no discount, not a negative one
        assert_eq!(discount_component(Some(100.0), Some(80.0)), 0.0);
    }

    #[test]
    fn test_tag_priority_order() {
        assert_eq!(
            assign_tag(90.0, 90.0, Some(2000.0), 0.3, false, 1500.0).as_deref(),
            Some("Low Data")
        );
        assert_eq!(
            assign_tag(90.0, 90.0, Some(2000.0), 0.3, true, 1500.0).as_deref(),
            Some("Low Data/Refurb")
        );
        assert_eq!(
            assign_tag(80.0, 70.0, Some(2000.0), 0.9, false, 1500.0).as_deref(),
            Some("Sweet Spot")
        );
        assert_eq!(
            assign_tag(80.0, 40.0, Some(2000.0), 0.9, false, 1500.0).as_deref(),
            Some("Premium")
        );
        assert_eq!(
            assign_tag(50.0, 70.0, Some(300.0), 0.9, false, 1500.0).as_deref(),
            Some("Deal")
        );
        assert_eq!(
            assign_tag(65.0, 55.0, Some(300.0), 0.9, false, 1500.0).as_deref(),
            Some("Solid")
        );
        assert_eq!(
            assign_tag(40.0, 30.0, Some(300.0), 0.9, true, 1500.0).as_deref(),
            Some("Refurb")
        );
        assert_eq!(assign_tag(40.0, 30.0, Some(300.0), 0.9, false, 1500.0), None);
    }

    #[test]
    fn test_brand_tier_table() {
        assert_eq!(brand_tier_score(Some("sony")), 90.0);
        assert_eq!(brand_tier_score(Some("dell")), 75.0);
        assert_eq!(brand_tier_score(Some("tcl")), 60.0);
        assert_eq!(brand_tier_score(Some("vizio")), 45.0);
        assert_eq!(brand_tier_score(Some("unheard-of")), 50.0);
        assert_eq!(brand_tier_score(None), 50.0);
    }

    #[test]
    fn test_combined_is_mean_of_quality_and_value() {
        let cfg = config();
        let product = score(tv("LG 55\" OLED 4K TV", 999.0), Category::Tv, 0.9, &cfg);
        assert!(((product.quality + product.value) / 2.0 - product.combined()).abs() < 1e-9);
    }
}
