//! Core data models used throughout dealscout.
//!
//! These types represent the raw listings, parsed query intents, and scored
//! products that flow through the aggregation and ranking pipeline. Nothing
//! here is mutated after creation except the durable health and cache rows,
//! which live in SQLite and are owned by [`crate::health`] and
//! [`crate::cache`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One listing as returned by a store adapter, before filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCandidate {
    /// Store key this listing came from (e.g. `"bestbuy"`).
    pub store: String,
    /// Free-text listing name as the source published it.
    pub name: String,
    /// Current price in dollars. `None` when absent or out of sane range.
    pub price: Option<f64>,
    /// Pre-discount price, when the source advertises one.
    pub original_price: Option<f64>,
    /// Listing URL.
    pub url: String,
    /// Average review score on a 0–5 scale.
    pub review_score: Option<f64>,
    /// Number of reviews behind `review_score`.
    pub review_count: Option<u32>,
    /// Structured specs, either source-provided or parsed from the name.
    pub specs: Option<ProductSpecs>,
    pub image_url: Option<String>,
}

impl RawCandidate {
    /// Fraction of expected data fields actually present, in [0, 1].
    ///
    /// Counts price, original price, review score, review count, and a
    /// non-empty spec set — five fields total.
    pub fn data_confidence(&self) -> f64 {
        let mut present = 0u32;
        if self.price.is_some() {
            present += 1;
        }
        if self.original_price.is_some() {
            present += 1;
        }
        if self.review_score.is_some() {
            present += 1;
        }
        if self.review_count.is_some() {
            present += 1;
        }
        if self.specs.as_ref().is_some_and(|s| !s.is_empty()) {
            present += 1;
        }
        f64::from(present) / 5.0
    }
}

/// Structured spec fields shared by candidates and query intents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductSpecs {
    pub size_inches: Option<f64>,
    pub resolution: Option<Resolution>,
    pub refresh_hz: Option<u32>,
    pub panel: Option<Panel>,
    pub hdr: Option<HdrTier>,
}

impl ProductSpecs {
    pub fn is_empty(&self) -> bool {
        self.size_inches.is_none()
            && self.resolution.is_none()
            && self.refresh_hz.is_none()
            && self.panel.is_none()
            && self.hdr.is_none()
    }
}

/// Display resolution classes recognized by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    R720p,
    R1080p,
    R1440p,
    R4k,
    R8k,
}

/// Display panel technologies recognized by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Panel {
    Oled,
    Qled,
    MiniLed,
    Ips,
    Va,
    Tn,
}

/// HDR capability tiers, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HdrTier {
    DolbyVision,
    Hdr10Plus,
    Hdr10,
    Hdr,
}

/// Product category resolved from the query or a candidate name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Tv,
    Monitor,
    Laptop,
    Tablet,
    Phone,
    Camera,
    Lens,
    Headphones,
    Refrigerator,
    Washer,
    Vacuum,
    Microwave,
    Gpu,
    Unknown,
}

impl Category {
    /// Categories where review signal outweighs brand/spec signal.
    pub fn is_appliance_like(self) -> bool {
        matches!(
            self,
            Self::Refrigerator | Self::Washer | Self::Vacuum | Self::Microwave
        )
    }

    /// Categories where screen size is the defining dimension. A sized query
    /// in these categories treats a size-less candidate as a mismatch.
    pub fn is_size_bearing(self) -> bool {
        matches!(self, Self::Tv | Self::Monitor)
    }

    /// The noun a listing in this category is expected to carry.
    pub fn core_noun(self) -> Option<&'static str> {
        match self {
            Self::Tv => Some("tv"),
            Self::Monitor => Some("monitor"),
            Self::Laptop => Some("laptop"),
            Self::Tablet => Some("tablet"),
            Self::Phone => Some("phone"),
            Self::Camera => Some("camera"),
            Self::Lens => Some("lens"),
            Self::Headphones => Some("headphones"),
            Self::Refrigerator => Some("refrigerator"),
            Self::Washer => Some("washer"),
            Self::Vacuum => Some("vacuum"),
            Self::Microwave => Some("microwave"),
            Self::Gpu => Some("gpu"),
            Self::Unknown => None,
        }
    }
}

/// Structured interpretation of the user's query string. Immutable once
/// parsed; lives for the duration of one search.
#[derive(Debug, Clone)]
pub struct QueryIntent {
    pub category: Category,
    pub target_size: Option<f64>,
    pub specs: ProductSpecs,
    pub brand: Option<String>,
    pub tokens: Vec<String>,
    /// Set when the query pins down enough detail (brand + model number, or
    /// focal length + aperture) that results should be held to exact-match
    /// tolerance.
    pub is_specific: bool,
}

/// Durable per-store health row backing the circuit breaker.
#[derive(Debug, Clone)]
pub struct StoreHealthRecord {
    pub store: String,
    pub consecutive_failures: i64,
    pub consecutive_soft_failures: i64,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub disabled_until: Option<DateTime<Utc>>,
}

impl StoreHealthRecord {
    /// A store is disabled iff a cooldown is set and has not yet passed.
    pub fn is_disabled(&self, now: DateTime<Utc>) -> bool {
        self.disabled_until.is_some_and(|until| until > now)
    }
}

/// Latency/weight class of a store, used to pick its cache TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Fast, authoritative API-backed sources.
    Fast,
    /// General scraped sources.
    #[default]
    Scraped,
    /// Slow sources that require heavy rendering to extract.
    Heavy,
}

/// One candidate (or the best of several duplicates sharing a match key)
/// with its final scores attached.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredProduct {
    pub candidate: RawCandidate,
    /// Intrinsic, price-blind merit, 0–100.
    pub quality: f64,
    /// Deal attractiveness at the observed price, 0–100.
    pub value: f64,
    /// Display tag (e.g. "Sweet Spot"), when one applies.
    pub tag: Option<String>,
    /// Fraction of expected data fields present, 0–1.
    pub confidence: f64,
    /// Soft relevance score from the filter, 0–1. Tie-break only.
    pub relevance: f64,
}

impl ScoredProduct {
    /// Unweighted average of quality and value; the ranking sort key.
    pub fn combined(&self) -> f64 {
        (self.quality + self.value) / 2.0
    }
}

/// Per-store failure surfaced by the fan-out without failing the search.
#[derive(Debug, Clone, Serialize)]
pub struct SourceError {
    pub store: String,
    pub message: String,
}

/// Result of one concurrent fan-out across all enabled stores.
#[derive(Debug, Default)]
pub struct FanOutOutcome {
    pub results: Vec<RawCandidate>,
    pub errors: Vec<SourceError>,
}

/// Final output of [`crate::engine::aggregate`].
#[derive(Debug, Default)]
pub struct AggregateOutcome {
    pub products: Vec<ScoredProduct>,
    pub errors: Vec<SourceError>,
    pub warnings: Vec<String>,
}
