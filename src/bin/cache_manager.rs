use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use video_catalog::collection::{channel_cache_name, detail_cache_name, summary_cache_name};
use video_catalog::{CacheStore, Config, SystemClock};

#[derive(Parser)]
#[command(name = "cache-manager")]
#[command(about = "Catalog cache management utility")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Cache directory (defaults to the configured one)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Freshness threshold in hours (defaults to the configured one)
    #[arg(long)]
    freshness_hours: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all cache files
    List,
    /// Get cache statistics
    Stats,
    /// Invalidate every cache of a dataset
    Invalidate {
        /// Dataset name
        dataset: String,
    },
    /// Clear all cache files
    Clear,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });
    let cache_dir = cli.cache_dir.unwrap_or(config.cache.cache_dir.clone());
    let freshness = match cli.freshness_hours {
        Some(hours) => std::time::Duration::from_secs(hours.saturating_mul(3600)),
        None => config.cache.freshness(),
    };

    let store = CacheStore::new(cache_dir, Arc::new(SystemClock));

    match cli.command {
        Commands::List => {
            let entries = store.list_entries(freshness)?;

            if entries.is_empty() {
                info!("📭 No cache files found in {}", store.cache_dir().display());
                return Ok(());
            }

            info!("📚 Found {} cache files:", entries.len());

            for entry in entries {
                let status = if entry.is_fresh { "✅ Fresh" } else { "❌ Stale" };
                let records = entry
                    .record_count
                    .map_or_else(|| "unreadable".to_string(), |count| format!("{} records", count));
                info!(
                    "  {} - {}, {} hours old, {}",
                    entry.name,
                    records,
                    entry.age.as_secs() / 3600,
                    status
                );
            }
        }

        Commands::Stats => {
            let stats = store.stats(freshness)?;
            info!("📊 Cache Statistics:");
            info!("  Total files: {}", stats.total_files);
            info!("  Fresh files: {}", stats.fresh_files);
            info!("  Stale files: {}", stats.stale_files);
            info!("  Unreadable files: {}", stats.unreadable_files);
            info!("  Total records: {}", stats.total_records);
        }

        Commands::Invalidate { dataset } => {
            let names = [
                summary_cache_name(&dataset),
                detail_cache_name(&dataset),
                channel_cache_name(&dataset),
            ];

            let mut removed = 0;
            for name in &names {
                if store.remove(name)? {
                    removed += 1;
                }
            }

            if removed > 0 {
                info!("✅ Invalidated {} cache files for: {}", removed, dataset);
            } else {
                warn!("⚠️ No cache found for dataset: {}", dataset);
            }
        }

        Commands::Clear => {
            let count = store.clear_all()?;
            info!("🧹 Cleared {} cache files", count);
        }
    }

    Ok(())
}
