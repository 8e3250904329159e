//! Normalization utilities: price parsing, name cleaning, and spec
//! extraction from free text.
//!
//! Everything here is a pure function over strings. The heuristic tables
//! (resolution, panel, HDR keywords) are ordered — the first match wins —
//! so precedence is testable on its own, independent of the engine.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{HdrTier, Panel, ProductSpecs, Resolution};

/// Sane price bounds. Values outside are treated as absent, not as errors.
pub const MIN_SANE_PRICE: f64 = 0.50;
pub const MAX_SANE_PRICE: f64 = 100_000.0;

fn size_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // 55", 55”, 55 in, 55in, 55-inch, 55 inches, 27.5"
        Regex::new(r#"(?i)\b(\d{1,3}(?:\.\d{1,2})?)\s*(?:["”]|-?\s?in(?:ch(?:es)?)?\b)"#)
            .expect("size regex")
    })
}

fn sku_size_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Panel SKUs embed the size after the line prefix: QN55S90C, UN65..., XR55...
        Regex::new(r"(?i)\b(?:qn|un|qe|kd|xr|oled)(\d{2})[a-z]").expect("sku size regex")
    })
}

fn price_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,3}(?:,\d{3})*|\d+)(?:\.(\d{1,2}))?").expect("price regex"))
}

fn refresh_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(\d{2,3})\s*hz\b").expect("refresh regex"))
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-z0-9]+(?:[.+-][a-z0-9]+)*\+?").expect("token regex"))
}

/// Case-fold and collapse whitespace so trivially different query strings
/// share one cache entry. Idempotent.
pub fn normalize_query(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse whitespace in a listing name without changing case.
pub fn clean_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a price out of free text like `"$1,299.99"` or `"1299"`.
///
/// Returns `None` for text with no digits or a value outside the sane
/// bounds — a malformed price is dropped, never an error.
pub fn parse_price(text: &str) -> Option<f64> {
    let caps = price_re().captures(text)?;
    let whole = caps.get(1)?.as_str().replace(',', "");
    let mut value: f64 = whole.parse().ok()?;
    if let Some(frac) = caps.get(2) {
        let cents: f64 = frac.as_str().parse().ok()?;
        value += cents / 10f64.powi(frac.as_str().len() as i32);
    }
    sanitize_price(value)
}

/// Drop out-of-range prices to `None`.
pub fn sanitize_price(price: f64) -> Option<f64> {
    if (MIN_SANE_PRICE..=MAX_SANE_PRICE).contains(&price) {
        Some(price)
    } else {
        None
    }
}

/// Extract a screen size in inches from free text.
///
/// An explicit size with a unit suffix wins; a size embedded in a panel SKU
/// (`QN55S90C`) is the fallback. Implausible sizes are ignored.
pub fn extract_size(text: &str) -> Option<f64> {
    if let Some(caps) = size_re().captures(text) {
        if let Ok(size) = caps[1].parse::<f64>() {
            if (5.0..=120.0).contains(&size) {
                return Some(size);
            }
        }
    }
    if let Some(caps) = sku_size_re().captures(text) {
        if let Ok(size) = caps[1].parse::<f64>() {
            if (20.0..=120.0).contains(&size) {
                return Some(size);
            }
        }
    }
    None
}

/// Ordered resolution keyword table; first match wins.
const RESOLUTION_TABLE: &[(&str, Resolution)] = &[
    ("8k", Resolution::R8k),
    ("4320p", Resolution::R8k),
    ("4k", Resolution::R4k),
    ("2160p", Resolution::R4k),
    ("uhd", Resolution::R4k),
    ("1440p", Resolution::R1440p),
    ("qhd", Resolution::R1440p),
    ("wqhd", Resolution::R1440p),
    ("1080p", Resolution::R1080p),
    ("fhd", Resolution::R1080p),
    ("720p", Resolution::R720p),
];

/// Ordered panel keyword table; specific terms before substrings of others.
const PANEL_TABLE: &[(&str, Panel)] = &[
    ("mini-led", Panel::MiniLed),
    ("mini led", Panel::MiniLed),
    ("qled", Panel::Qled),
    ("oled", Panel::Oled),
    ("ips", Panel::Ips),
    ("va", Panel::Va),
    ("tn", Panel::Tn),
];

/// Ordered HDR tier table; the richer tiers shadow the plain "hdr" token.
const HDR_TABLE: &[(&str, HdrTier)] = &[
    ("dolby vision", HdrTier::DolbyVision),
    ("hdr10+", HdrTier::Hdr10Plus),
    ("hdr10", HdrTier::Hdr10),
    ("hdr", HdrTier::Hdr),
];

fn contains_token(tokens: &[String], keyword: &str) -> bool {
    if keyword.contains(' ') {
        // Multi-word keywords are matched on the token sequence.
        let parts: Vec<&str> = keyword.split(' ').collect();
        tokens
            .windows(parts.len())
            .any(|w| w.iter().map(String::as_str).eq(parts.iter().copied()))
    } else {
        tokens.iter().any(|t| t == keyword)
    }
}

/// Extract structured specs from a listing name or query string.
pub fn extract_specs(text: &str) -> ProductSpecs {
    let tokens = tokenize(text);

    let resolution = RESOLUTION_TABLE
        .iter()
        .find(|(kw, _)| contains_token(&tokens, kw))
        .map(|(_, r)| *r);

    let panel = PANEL_TABLE
        .iter()
        .find(|(kw, _)| contains_token(&tokens, kw))
        .map(|(_, p)| *p);

    let hdr = HDR_TABLE
        .iter()
        .find(|(kw, _)| contains_token(&tokens, kw))
        .map(|(_, h)| *h);

    let refresh_hz = refresh_re()
        .captures(text)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .filter(|hz| (24..=480).contains(hz));

    ProductSpecs {
        size_inches: extract_size(text),
        resolution,
        refresh_hz,
        panel,
        hdr,
    }
}

/// Lowercased alphanumeric tokens. Keeps `.`/`+`/`-` joined tokens intact
/// so "hdr10+", "f/1.8"-style fragments, and "wh-1000xm5" survive as units.
pub fn tokenize(text: &str) -> Vec<String> {
    token_re()
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}
