//! Video Catalog
//!
//! Retrieves channel video metadata from the YouTube Data API, keeps it in
//! incrementally refreshed JSON caches and assembles it into tabular datasets
//! for weekly reporting.

pub mod api;
pub mod cache;
pub mod clock;
pub mod collection;
pub mod config;
pub mod dataset;
pub mod duration;
pub mod fetcher;
pub mod models;
pub mod report;

use std::path::PathBuf;

// Re-export main types for easy access
pub use crate::api::youtube::YouTubeClient;
pub use crate::api::{Page, SearchOrder, SearchQuery, VideoApi, MAX_IDS_PER_REQUEST};
pub use crate::cache::{CacheStore, CachedCollection};
pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::collection::{CacheState, Collection, CollectionManager, DatasetRequest};
pub use crate::config::{Config, ConfigBuilder, DatasetConfig};
pub use crate::dataset::{assemble, Dataset, DatasetFilter, DatasetRow, Denylist};
pub use crate::duration::parse_duration;
pub use crate::fetcher::{FetchSettings, PaginatedFetcher};
pub use crate::models::{ChannelInfo, PlaylistItem, Statistics, VideoDetail, VideoSummary};
pub use crate::report::{announcement_lines, weekly_summary, WeeklyBucket};

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Error types for catalog operations
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Cache file {} is unreadable: {source}", path.display())]
    CacheCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Summary/detail mismatch at row {index}: summary {summary_id} paired with detail {detail_id}")]
    Misaligned {
        index: usize,
        summary_id: String,
        detail_id: String,
    },

    #[error("No API key configured")]
    MissingApiKey,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CatalogError {
    /// Whether a failed remote call is worth repeating.
    ///
    /// Transport failures, rate limiting (429) and server errors are; auth,
    /// quota and malformed-request errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            CatalogError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            CatalogError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
