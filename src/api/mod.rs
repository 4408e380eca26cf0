//! Remote API boundary
//!
//! A single client interface with one method per endpoint shape the catalog
//! consumes. Pagination, chunking, pacing and retries are not the client's
//! job; they live in `fetcher`.

pub mod youtube;

use crate::models::{ChannelInfo, PlaylistItem, VideoDetail, VideoSummary};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of ids (or results per page) the platform accepts per request
pub const MAX_IDS_PER_REQUEST: usize = 50;

/// Result ordering for search queries
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchOrder {
    #[default]
    Date,
    Relevance,
    ViewCount,
}

impl SearchOrder {
    pub fn as_param(&self) -> &'static str {
        match self {
            SearchOrder::Date => "date",
            SearchOrder::Relevance => "relevance",
            SearchOrder::ViewCount => "viewCount",
        }
    }
}

/// Parameters of one channel search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub channel_id: String,
    pub published_after: DateTime<Utc>,
    pub order: SearchOrder,
    pub page_size: u32,
}

/// One page of a paginated listing
#[derive(Debug, Clone, Default)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Continuation token; `None` on the last page
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page_token: None,
        }
    }
}

/// Capabilities of the video platform API
pub trait VideoApi {
    /// Search a channel's videos published after the query's floor (one page)
    fn list_videos(&self, query: &SearchQuery, page_token: Option<&str>) -> Result<Page<VideoSummary>>;

    /// Look up full metadata for at most `MAX_IDS_PER_REQUEST` video ids
    fn get_video_batch(&self, video_ids: &[String]) -> Result<Vec<VideoDetail>>;

    /// List the videos of a playlist (one page)
    fn list_playlist_items(&self, playlist_id: &str, page_token: Option<&str>) -> Result<Page<PlaylistItem>>;

    /// Look up titles for at most `MAX_IDS_PER_REQUEST` channel ids
    fn list_channels(&self, channel_ids: &[String]) -> Result<Vec<ChannelInfo>>;
}

impl<T: VideoApi + ?Sized> VideoApi for Box<T> {
    fn list_videos(&self, query: &SearchQuery, page_token: Option<&str>) -> Result<Page<VideoSummary>> {
        (**self).list_videos(query, page_token)
    }

    fn get_video_batch(&self, video_ids: &[String]) -> Result<Vec<VideoDetail>> {
        (**self).get_video_batch(video_ids)
    }

    fn list_playlist_items(&self, playlist_id: &str, page_token: Option<&str>) -> Result<Page<PlaylistItem>> {
        (**self).list_playlist_items(playlist_id, page_token)
    }

    fn list_channels(&self, channel_ids: &[String]) -> Result<Vec<ChannelInfo>> {
        (**self).list_channels(channel_ids)
    }
}
