//! Query intent parsing.
//!
//! Turns a free-text query into a structured [`QueryIntent`]: category,
//! target size, explicit specs, brand, and a specificity flag. Pure and
//! deterministic. All heuristics live in ordered rule tables — first match
//! wins — so the precedence is testable independently of the engine.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{Category, ProductSpecs, QueryIntent};
use crate::normalize::{extract_size, extract_specs, tokenize};

/// Ordered category keyword table. Specific categories come before generic
/// ones: an explicit "tv" keyword must win over the size-only fallback
/// heuristic, and "lens" before "camera" so "camera lens" resolves to Lens.
const CATEGORY_TABLE: &[(Category, &[&str])] = &[
    (Category::Tv, &["tv", "television", "tvs"]),
    (Category::Monitor, &["monitor", "ultrawide"]),
    (
        Category::Laptop,
        &["laptop", "notebook", "macbook", "chromebook", "ultrabook"],
    ),
    (Category::Tablet, &["tablet", "ipad"]),
    (Category::Phone, &["phone", "smartphone", "iphone"]),
    (Category::Lens, &["lens", "lenses"]),
    (Category::Camera, &["camera", "dslr", "mirrorless", "camcorder"]),
    (
        Category::Headphones,
        &["headphones", "headphone", "earbuds", "earphones", "headset"],
    ),
    (Category::Refrigerator, &["refrigerator", "fridge", "freezer"]),
    (Category::Washer, &["washer", "dryer"]),
    (Category::Vacuum, &["vacuum"]),
    (Category::Microwave, &["microwave"]),
    (Category::Gpu, &["gpu", "graphics"]),
];

/// Fixed brand list, matched on whole tokens only — "lg" must not match
/// inside "alger", and single-letter fragments never count.
pub const BRANDS: &[&str] = &[
    "samsung",
    "lg",
    "sony",
    "tcl",
    "hisense",
    "vizio",
    "panasonic",
    "philips",
    "sharp",
    "toshiba",
    "dell",
    "hp",
    "lenovo",
    "asus",
    "acer",
    "msi",
    "apple",
    "canon",
    "nikon",
    "sigma",
    "tamron",
    "fujifilm",
    "bose",
    "sennheiser",
    "jbl",
    "beats",
    "anker",
    "whirlpool",
    "bosch",
    "maytag",
    "frigidaire",
    "dyson",
    "shark",
    "bissell",
    "nvidia",
    "amd",
    "gigabyte",
];

/// Model-number prefixes a brand uses in its SKUs. A candidate carrying one
/// of these counts as carrying the brand even when the brand word itself is
/// absent ("QN55S90C" is a Samsung).
pub const BRAND_MODEL_PREFIXES: &[(&str, &[&str])] = &[
    ("samsung", &["qn", "un", "qe", "ls"]),
    ("lg", &["oled", "qned", "nano"]),
    ("sony", &["xr", "kd", "wh", "wf"]),
    ("canon", &["eos", "rf", "ef"]),
    ("nikon", &["nikkor"]),
    ("dell", &["xps", "alienware"]),
];

fn focal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b\d{1,4}(?:-\d{1,4})?mm\b").expect("focal regex"))
}

fn aperture_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bf/?\d+(?:\.\d+)?\b").expect("aperture regex"))
}

fn model_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Mixed letters and digits, letter-anchored: "qn55s90c", "wh-1000xm5",
    // "r8". Pure numbers and unit-looking tokens don't qualify.
    RE.get_or_init(|| {
        Regex::new(r"^[a-z]{1,4}-?\d{1,5}[a-z0-9-]*$|^[a-z]{2,6}\d{1,4}[a-z0-9]*$")
            .expect("model token regex")
    })
}

/// Spec-ish tokens that look like model numbers but aren't.
const NON_MODEL_TOKENS: &[&str] = &[
    "4k", "8k", "720p", "1080p", "1440p", "2160p", "4320p", "hdr10", "hdr10+", "usb3", "hdmi2",
    "wifi6", "ps5", "mp3", "mp4",
];

/// Parse a query into its structured intent.
pub fn parse(query: &str) -> QueryIntent {
    let tokens = tokenize(query);
    let specs = extract_specs(query);
    let target_size = extract_size(query);

    let category = category_from_tokens(&tokens)
        .unwrap_or_else(|| size_fallback_category(target_size, &specs));

    let brand = tokens
        .iter()
        .find(|t| BRANDS.contains(&t.as_str()))
        .cloned();

    let has_model = tokens.iter().any(|t| looks_like_model(t));
    let has_focal = focal_re().is_match(query);
    let has_aperture = aperture_re().is_match(query);
    let is_specific = (brand.is_some() && has_model) || (has_focal && has_aperture);

    QueryIntent {
        category,
        target_size,
        specs,
        brand,
        tokens,
        is_specific,
    }
}

/// Resolve a category from a candidate listing name. Keyword table only;
/// the size fallback is for queries, not listings.
pub fn detect_category(name: &str) -> Category {
    let tokens = tokenize(name);
    category_from_tokens(&tokens).unwrap_or(Category::Unknown)
}

fn category_from_tokens(tokens: &[String]) -> Option<Category> {
    for (category, keywords) in CATEGORY_TABLE {
        if keywords.iter().any(|kw| tokens.iter().any(|t| t == kw)) {
            return Some(*category);
        }
    }
    None
}

/// Generic fallback when no category keyword is present: a sized query with
/// display specs is a display product, large ones read as TVs.
fn size_fallback_category(target_size: Option<f64>, specs: &ProductSpecs) -> Category {
    let display_hint =
        specs.panel.is_some() || specs.resolution.is_some() || specs.refresh_hz.is_some();
    match target_size {
        Some(size) if display_hint && size >= 40.0 => Category::Tv,
        Some(_) if display_hint => Category::Monitor,
        _ => Category::Unknown,
    }
}

/// Whether a token plausibly names a model number.
pub fn looks_like_model(token: &str) -> bool {
    if token.len() < 2 || NON_MODEL_TOKENS.contains(&token) {
        return false;
    }
    if token.ends_with("hz") || token.ends_with("mm") || token.ends_with("in") {
        return false;
    }
    let has_alpha = token.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = token.chars().any(|c| c.is_ascii_digit());
    has_alpha && has_digit && model_token_re().is_match(token)
}

/// The brand a listing name carries, via the brand word itself or one of
/// the brand's known model prefixes.
pub fn brand_of(name_tokens: &[String]) -> Option<&'static str> {
    for token in name_tokens {
        if let Some(brand) = BRANDS.iter().find(|b| *b == token) {
            return Some(brand);
        }
    }
    for (brand, prefixes) in BRAND_MODEL_PREFIXES {
        for token in name_tokens {
            if looks_like_model(token) && prefixes.iter().any(|p| token.starts_with(p)) {
                return Some(brand);
            }
        }
    }
    None
}
