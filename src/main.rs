//! # DealScout CLI (`dscout`)
//!
//! The `dscout` binary is the primary interface for DealScout. It provides
//! commands for database initialization, multi-store product search, store
//! health inspection, and cache maintenance.
//!
//! ## Usage
//!
//! ```bash
//! dscout --config ./config/dscout.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dscout init` | Create the SQLite database and run schema migrations |
//! | `dscout stores` | List configured stores and their breaker state |
//! | `dscout search "<query>"` | Search all enabled stores and rank the results |
//! | `dscout cache purge` | Delete expired result-cache rows |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! dscout init --config ./config/dscout.toml
//!
//! # Search everything
//! dscout search "55 inch tv"
//!
//! # Constrain the price band and stores
//! dscout search "55 inch tv" --min-price 500 --max-price 1200 --stores bestbuy,acme
//!
//! # Machine-readable output
//! dscout search "sony wh-1000xm5" --json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use dealscout::{config, db, migrate, search_cmd, stores};

/// DealScout CLI — a multi-store product search aggregator with
/// quality/value ranking.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/dscout.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "dscout",
    about = "DealScout — multi-store product search with quality/value ranking",
    version,
    long_about = "DealScout fans a product search out across configured retail sources, \
    filters listings for relevance, merges cross-store duplicates, and ranks the survivors \
    on independent quality and value scores. Flaky sources are circuit-broken and cached \
    per store."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/dscout.toml`. All store, breaker, cache, and
    /// ranking settings are read from this file.
    #[arg(long, global = true, default_value = "./config/dscout.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (store_health, search_cache). This command is idempotent — running
    /// it multiple times is safe.
    Init,

    /// List configured stores and their health status.
    ///
    /// Shows each store's adapter kind, trust, failure counters, and
    /// whether the circuit breaker currently has it disabled.
    Stores,

    /// Search all enabled stores and rank the results.
    ///
    /// Fans the query out across every configured store that isn't
    /// circuit-broken, filters and dedups the listings, and prints the
    /// ranked results with quality/value scores.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of ranked results to return.
        #[arg(long)]
        limit: Option<usize>,

        /// Only include listings priced at or above this, in dollars.
        #[arg(long)]
        min_price: Option<f64>,

        /// Only include listings priced at or below this, in dollars.
        #[arg(long)]
        max_price: Option<f64>,

        /// Restrict the search to these store keys (comma-separated).
        #[arg(long, value_delimiter = ',')]
        stores: Vec<String>,

        /// Emit results as JSON instead of the human-readable listing.
        #[arg(long)]
        json: bool,
    },

    /// Result-cache maintenance.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Cache maintenance subcommands.
#[derive(Subcommand)]
enum CacheAction {
    /// Delete expired cache rows.
    ///
    /// Expired rows are ignored by searches either way; this just reclaims
    /// the space.
    Purge,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Stores => {
            stores::list_stores(&cfg).await?;
        }
        Commands::Search {
            query,
            limit,
            min_price,
            max_price,
            stores,
            json,
        } => {
            search_cmd::run_search(&cfg, &query, limit, min_price, max_price, stores, json).await?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Purge => {
                let pool = db::connect(&cfg).await?;
                let cache = dealscout::cache::ResultCache::new(pool.clone(), cfg.cache.clone());
                let purged = cache.purge_expired().await?;
                pool.close().await;
                println!("Purged {purged} expired cache entries.");
            }
        },
    }

    Ok(())
}
