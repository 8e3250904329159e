//! # DealScout
//!
//! A multi-store product search aggregator with quality/value ranking.
//!
//! DealScout fans a search query out across configured retail sources,
//! filters the returned listings for actual relevance, merges duplicates of
//! the same product across stores, and ranks what's left on two independent
//! axes: intrinsic quality and deal value. Flaky sources are circuit-broken
//! and results are cached per store, so one slow or broken store never
//! drags the whole search down.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────┐
//! │   Adapters   │──▶│   Fan-out    │──▶│  SQLite   │
//! │ HTTP/custom  │   │ breaker+cache│   │ health+$  │
//! └──────────────┘   └──────┬───────┘   └───────────┘
//!                           ▼
//!        intent ─▶ filter ─▶ match ─▶ score ─▶ rank
//!                           │
//!                           ▼
//!                     ┌──────────┐
//!                     │   CLI    │
//!                     │ (dscout) │
//!                     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! dscout init                          # create database
//! dscout stores                        # list stores and breaker state
//! dscout search "55 inch tv" --max-price 1000
//! dscout cache purge                   # drop expired cache rows
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`adapter`] | Store adapter trait, registry, HTTP adapter |
//! | [`health`] | Per-store circuit breaker |
//! | [`cache`] | TTL result cache |
//! | [`fanout`] | Concurrent multi-store dispatch |
//! | [`intent`] | Query intent parsing |
//! | [`filter`] | Multi-phase relevance filter |
//! | [`matcher`] | Cross-store duplicate matching |
//! | [`scoring`] | Quality and value scoring |
//! | [`ranking`] | Final ranking assembly |
//! | [`engine`] | The pipeline, end to end |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod adapter;
pub mod cache;
pub mod config;
pub mod db;
pub mod engine;
pub mod fanout;
pub mod filter;
pub mod health;
pub mod intent;
pub mod matcher;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod ranking;
pub mod scoring;
pub mod search_cmd;
pub mod stores;
