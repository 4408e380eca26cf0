use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use video_catalog::clock::{hours_ago, weeks_ago_monday};
use video_catalog::{
    announcement_lines, assemble, weekly_summary, CacheStore, Clock, CollectionManager, Config, Dataset,
    DatasetConfig, DatasetRequest, PaginatedFetcher, SystemClock, YouTubeClient,
};

#[derive(Parser)]
#[command(name = "video-catalog")]
#[command(version, about = "Incremental YouTube channel catalog and dataset builder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to video-catalog.toml, then environment)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring the cached summaries and details of a dataset up to date
    Refresh {
        #[arg(short, long)]
        dataset: String,
    },
    /// Refresh, assemble and write the dataset as JSON
    Dataset {
        #[arg(short, long)]
        dataset: String,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print per channel weekly totals
    Weekly {
        #[arg(short, long)]
        dataset: String,
        /// Number of weeks back from the current Monday
        #[arg(short, long, default_value_t = 13)]
        weeks: u32,
    },
    /// Print announcement text for recently published videos
    Announce {
        #[arg(short, long)]
        dataset: String,
        /// Look back this many hours
        #[arg(long, default_value_t = 24)]
        hours: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "video_catalog=debug,info"
    } else {
        "video_catalog=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with_writer(io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("Failed to load config, using defaults: {}", e);
            Config::default()
        }),
    };
    config.validate().context("Invalid configuration")?;
    if cli.verbose {
        info!("{}", config.summary());
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let manager = build_manager(&config, clock.clone())?;

    match cli.command {
        Commands::Refresh { dataset } => {
            let dataset_config = config.dataset(&dataset)?;
            let collection = manager.collect(&request_for(dataset_config, clock.as_ref()))?;
            let channels = manager.channels(&dataset_config.name, &dataset_config.channel_ids)?;

            info!("✅ Dataset '{}' is up to date", dataset);
            println!("channels:  {}", channels.len());
            println!("summaries: {}", collection.summaries.len());
            println!("details:   {}", collection.details.len());
        }

        Commands::Dataset { dataset, output } => {
            let dataset = build_dataset(&manager, config.dataset(&dataset)?, clock.as_ref())?;
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    dataset.write_json(BufWriter::new(file))?;
                    info!("💾 Wrote {} rows to {}", dataset.len(), path.display());
                }
                None => {
                    let stdout = io::stdout();
                    let mut handle = stdout.lock();
                    dataset.write_json(&mut handle)?;
                    writeln!(handle)?;
                }
            }
        }

        Commands::Weekly { dataset, weeks } => {
            let dataset = build_dataset(&manager, config.dataset(&dataset)?, clock.as_ref())?;
            let floor = weeks_ago_monday(clock.now(), weeks);

            println!(
                "{:<12} {:<32} {:>6} {:>10} {:>14} {:>7}",
                "week", "channel", "videos", "minutes", "views_hours", "share"
            );
            for bucket in weekly_summary(&dataset.rows, floor) {
                println!(
                    "{:<12} {:<32} {:>6} {:>10.1} {:>14.1} {:>6.1}%",
                    bucket.week.format("%Y-%m-%d"),
                    bucket.channel_name,
                    bucket.video_count,
                    bucket.duration_minutes,
                    bucket.views_hours,
                    bucket.minutes_share_percent
                );
            }
        }

        Commands::Announce { dataset, hours } => {
            let dataset = build_dataset(&manager, config.dataset(&dataset)?, clock.as_ref())?;
            let since = hours_ago(clock.now(), hours);

            let lines = announcement_lines(&dataset.rows, since);
            if lines.is_empty() {
                info!("📭 No videos published in the last {} hours", hours);
            }
            for line in lines {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

fn build_manager(config: &Config, clock: Arc<dyn Clock>) -> Result<CollectionManager<YouTubeClient>> {
    let client = YouTubeClient::new(&config.api).context("Failed to build API client")?;
    let fetcher = PaginatedFetcher::new(client, config.fetch.settings());
    let store = CacheStore::new(config.cache.cache_dir.clone(), clock);
    store.initialize()?;
    Ok(CollectionManager::new(store, fetcher, config.cache.freshness()))
}

fn request_for(dataset: &DatasetConfig, clock: &dyn Clock) -> DatasetRequest {
    DatasetRequest {
        name: dataset.name.clone(),
        channel_ids: dataset.channel_ids.clone(),
        earliest_date: dataset.earliest_date(clock.now()),
    }
}

fn build_dataset(
    manager: &CollectionManager<YouTubeClient>,
    dataset: &DatasetConfig,
    clock: &dyn Clock,
) -> Result<Dataset> {
    let collection = manager.collect(&request_for(dataset, clock))?;
    let assembled = assemble(&collection.summaries, &collection.details, &dataset.denylist())?;
    Ok(assembled.filter(&dataset.filter()))
}
