use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::api::{SearchOrder, MAX_IDS_PER_REQUEST};
use crate::clock;
use crate::dataset::{DatasetFilter, Denylist};
use crate::fetcher::FetchSettings;

/// Configuration for the video catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote API access
    pub api: ApiConfig,

    /// Pagination and pacing of remote queries
    pub fetch: FetchConfig,

    /// Cache location and freshness
    pub cache: CacheConfig,

    /// Named datasets
    pub datasets: Vec<DatasetConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API key for the YouTube Data API
    pub api_key: Option<String>,

    /// Base URL of the API
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Results requested per search page (platform maximum is 50)
    pub page_size: u32,

    /// Safety ceiling on pages followed per query
    pub max_pages: usize,

    /// Pause between continuation requests (milliseconds)
    pub page_delay_ms: u64,

    /// Extra attempts after a retryable failure
    pub max_retries: u32,

    /// First backoff delay, doubled on every further attempt (milliseconds)
    pub backoff_base_ms: u64,

    /// Ordering for channel searches
    pub order: SearchOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding the cache files
    pub cache_dir: PathBuf,

    /// Maximum cache age before a refresh is attempted
    pub freshness_hours: u64,
}

/// A named dataset: which channels to track, from when, and what to exclude
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,

    pub channel_ids: Vec<String>,

    /// Track videos from Monday midnight this many weeks back
    #[serde(default)]
    pub lookback_weeks: Option<u32>,

    /// Fixed floor; wins over `lookback_weeks`
    #[serde(default)]
    pub earliest_date: Option<DateTime<Utc>>,

    /// Video ids dropped from the assembled dataset
    #[serde(default)]
    pub denylist: Vec<String>,

    #[serde(default = "default_true")]
    pub include_streams: bool,

    #[serde(default)]
    pub min_duration_seconds: Option<u64>,

    #[serde(default)]
    pub max_duration_seconds: Option<u64>,

    /// Keep only videos from these channel names
    #[serde(default)]
    pub channels: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

impl DatasetConfig {
    pub fn new(name: &str, channel_ids: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            channel_ids: channel_ids.iter().map(|id| id.to_string()).collect(),
            lookback_weeks: None,
            earliest_date: None,
            denylist: Vec::new(),
            include_streams: true,
            min_duration_seconds: None,
            max_duration_seconds: None,
            channels: None,
        }
    }

    /// Resolve the publish-date floor for a cold fetch relative to `now`
    pub fn earliest_date(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        if let Some(date) = self.earliest_date {
            return date;
        }
        match self.lookback_weeks {
            Some(weeks) => clock::weeks_ago_monday(now, weeks),
            None => clock::platform_epoch(),
        }
    }

    pub fn denylist(&self) -> Denylist {
        Denylist::new(self.denylist.iter().cloned())
    }

    pub fn filter(&self) -> DatasetFilter {
        DatasetFilter {
            include_streams: self.include_streams,
            min_duration_seconds: self.min_duration_seconds,
            max_duration_seconds: self.max_duration_seconds,
            channels: self.channels.clone(),
        }
    }
}

impl FetchConfig {
    pub fn settings(&self) -> FetchSettings {
        FetchSettings {
            page_size: self.page_size,
            max_pages: self.max_pages,
            page_delay: Duration::from_millis(self.page_delay_ms),
            max_retries: self.max_retries,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            order: self.order,
        }
    }
}

impl CacheConfig {
    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_hours.saturating_mul(3600))
    }
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_paths = ["video-catalog.toml", "config/video-catalog.toml"];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config.with_env_overrides());
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config {}: {}", path.display(), e))?;
        let config: Config = toml::from_str(&config_str)
            .map_err(|e| anyhow!("Failed to parse config {}: {}", path.display(), e))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config.with_env_overrides())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::default().with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(api_key) = std::env::var("VIDEO_CATALOG_API_KEY") {
            let api_key = api_key.trim().to_string();
            if !api_key.is_empty() {
                self.api.api_key = Some(api_key);
            }
        }

        if let Ok(cache_dir) = std::env::var("VIDEO_CATALOG_CACHE_DIR") {
            self.cache.cache_dir = PathBuf::from(cache_dir);
        }

        if let Ok(hours) = std::env::var("VIDEO_CATALOG_FRESHNESS_HOURS") {
            self.cache.freshness_hours = hours.parse().unwrap_or(self.cache.freshness_hours);
        }

        self
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.fetch.page_size == 0 || self.fetch.page_size as usize > MAX_IDS_PER_REQUEST {
            return Err(anyhow!(
                "page_size must be between 1 and {}",
                MAX_IDS_PER_REQUEST
            ));
        }

        if self.fetch.max_pages == 0 {
            return Err(anyhow!("max_pages must be greater than 0"));
        }

        if self.cache.freshness_hours == 0 {
            return Err(anyhow!("freshness_hours must be greater than 0"));
        }

        url::Url::parse(&self.api.base_url)
            .map_err(|e| anyhow!("Invalid API base URL {}: {}", self.api.base_url, e))?;

        for dataset in &self.datasets {
            if dataset.name.trim().is_empty() {
                return Err(anyhow!("Dataset names must not be empty"));
            }
            if dataset.channel_ids.is_empty() {
                return Err(anyhow!("Dataset {} has no channels", dataset.name));
            }
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Look up a dataset by name
    pub fn dataset(&self, name: &str) -> Result<&DatasetConfig> {
        self.datasets
            .iter()
            .find(|dataset| dataset.name == name)
            .ok_or_else(|| anyhow!("Unknown dataset: {}", name))
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Video Catalog Configuration:\n\
            - API: {} (key {})\n\
            - Cache Directory: {}\n\
            - Freshness: {}h\n\
            - Page Size: {} (max {} pages)\n\
            - Datasets: {}",
            self.api.base_url,
            if self.api.api_key.is_some() { "set" } else { "missing" },
            self.cache.cache_dir.display(),
            self.cache.freshness_hours,
            self.fetch.page_size,
            self.fetch.max_pages,
            self.datasets
                .iter()
                .map(|d| d.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_IDS_PER_REQUEST as u32,
            max_pages: 300,
            page_delay_ms: 1000,
            max_retries: 3,
            backoff_base_ms: 1000,
            order: SearchOrder::Date,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("."),
            freshness_hours: 24,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            fetch: FetchConfig::default(),
            cache: CacheConfig::default(),
            datasets: Vec::new(),
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.config.api.api_key = Some(api_key);
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.config.api.base_url = base_url;
        self
    }

    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.config.cache.cache_dir = dir;
        self
    }

    pub fn with_freshness_hours(mut self, hours: u64) -> Self {
        self.config.cache.freshness_hours = hours;
        self
    }

    pub fn with_page_delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.fetch.page_delay_ms = delay_ms;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.config.fetch.max_pages = max_pages;
        self
    }

    pub fn with_dataset(mut self, dataset: DatasetConfig) -> Self {
        self.config.datasets.push(dataset);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
