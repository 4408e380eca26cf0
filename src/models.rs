/// Record types persisted in the cache files and handed to the dataset assembler.
///
/// These mirror what is written to disk, not the raw API payloads; the wire
/// shapes live in `api::youtube` and are converted into these on arrival.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anything stored in a cache collection that has a unique key.
pub trait Keyed {
    fn key(&self) -> &str;
}

/// Minimal per-video data returned by a channel search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoSummary {
    pub video_id: String,
    pub title: String,
    pub channel_name: String,
    pub channel_id: String,
    pub published_at: DateTime<Utc>,
}

/// Engagement counters. Any of them may be hidden by the uploader or
/// no longer reported by the platform, so all are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Statistics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dislike_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<u64>,
}

/// Present only on videos that were (or are scheduled to be) live streams
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LiveStreamingDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrent_viewers: Option<u64>,
}

/// Full per-video metadata returned by a batch lookup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoDetail {
    pub video_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub published_at: DateTime<Utc>,
    /// Raw ISO-8601 duration as reported, e.g. `PT12M3S`
    pub duration: String,
    #[serde(default)]
    pub statistics: Statistics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_streaming_details: Option<LiveStreamingDetails>,
    pub channel_name: String,
    #[serde(default)]
    pub channel_id: String,
}

impl VideoDetail {
    pub fn is_stream(&self) -> bool {
        self.live_streaming_details.is_some()
    }
}

/// Channel id and display title
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelInfo {
    pub channel_id: String,
    pub title: String,
}

/// One entry of a playlist listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaylistItem {
    pub video_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

impl Keyed for VideoSummary {
    fn key(&self) -> &str {
        &self.video_id
    }
}

impl Keyed for VideoDetail {
    fn key(&self) -> &str {
        &self.video_id
    }
}

impl Keyed for ChannelInfo {
    fn key(&self) -> &str {
        &self.channel_id
    }
}

impl Keyed for PlaylistItem {
    fn key(&self) -> &str {
        &self.video_id
    }
}
