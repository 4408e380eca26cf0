/// YouTube Data API v3 client
use super::{Page, SearchQuery, VideoApi};
use crate::config::ApiConfig;
use crate::models::{
    ChannelInfo, LiveStreamingDetails, PlaylistItem, Statistics, VideoDetail, VideoSummary,
};
use crate::{CatalogError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Blocking HTTP implementation of [`VideoApi`]
pub struct YouTubeClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Snippet {
    title: String,
    description: String,
    published_at: Option<DateTime<Utc>>,
    channel_id: String,
    channel_title: String,
    resource_id: Option<ResourceId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchId,
    #[serde(default)]
    snippet: Snippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContentDetails {
    duration: String,
}

/// Counters arrive as decimal strings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WireStatistics {
    view_count: Option<String>,
    like_count: Option<String>,
    dislike_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WireLiveStreamingDetails {
    actual_start_time: Option<DateTime<Utc>>,
    actual_end_time: Option<DateTime<Utc>>,
    scheduled_start_time: Option<DateTime<Utc>>,
    concurrent_viewers: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    content_details: ContentDetails,
    #[serde(default)]
    statistics: WireStatistics,
    live_streaming_details: Option<WireLiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: String,
    #[serde(default)]
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct PlaylistEntry {
    #[serde(default)]
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn parse_count(value: Option<String>) -> Option<u64> {
    value.and_then(|v| v.trim().parse().ok())
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

impl SearchItem {
    fn into_summary(self) -> Option<VideoSummary> {
        let Some(video_id) = self.id.video_id else {
            debug!("Skipping search result without a video id");
            return None;
        };
        let Some(published_at) = self.snippet.published_at else {
            warn!("Skipping search result {} without publishedAt", video_id);
            return None;
        };
        Some(VideoSummary {
            video_id,
            title: self.snippet.title,
            channel_name: self.snippet.channel_title,
            channel_id: self.snippet.channel_id,
            published_at,
        })
    }
}

impl VideoItem {
    fn into_detail(self) -> Option<VideoDetail> {
        let Some(published_at) = self.snippet.published_at else {
            warn!("Skipping video {} without publishedAt", self.id);
            return None;
        };
        let statistics = Statistics {
            view_count: parse_count(self.statistics.view_count),
            like_count: parse_count(self.statistics.like_count),
            dislike_count: parse_count(self.statistics.dislike_count),
            comment_count: parse_count(self.statistics.comment_count),
        };
        let live_streaming_details = self.live_streaming_details.map(|live| LiveStreamingDetails {
            actual_start_time: live.actual_start_time,
            actual_end_time: live.actual_end_time,
            scheduled_start_time: live.scheduled_start_time,
            concurrent_viewers: parse_count(live.concurrent_viewers),
        });
        Some(VideoDetail {
            video_id: self.id,
            title: self.snippet.title,
            description: self.snippet.description,
            published_at,
            duration: self.content_details.duration,
            statistics,
            live_streaming_details,
            channel_name: self.snippet.channel_title,
            channel_id: self.snippet.channel_id,
        })
    }
}

impl PlaylistEntry {
    fn into_item(self) -> Option<PlaylistItem> {
        let video_id = self.snippet.resource_id.and_then(|r| r.video_id)?;
        Some(PlaylistItem {
            video_id,
            title: self.snippet.title,
            published_at: self.snippet.published_at,
        })
    }
}

impl YouTubeClient {
    /// Create a new client. A missing API key is only reported once a request is made,
    /// so fully cached runs work without credentials.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn get<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, String)]) -> Result<T> {
        let api_key = self.api_key.as_deref().ok_or(CatalogError::MissingApiKey)?;
        let url = format!("{}/{}", self.base_url, endpoint);

        debug!("GET {} {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", api_key)])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        Ok(response.json()?)
    }
}

impl VideoApi for YouTubeClient {
    fn list_videos(&self, query: &SearchQuery, page_token: Option<&str>) -> Result<Page<VideoSummary>> {
        let mut params = vec![
            ("part", "snippet".to_string()),
            ("type", "video".to_string()),
            ("channelId", query.channel_id.clone()),
            ("order", query.order.as_param().to_string()),
            ("maxResults", query.page_size.to_string()),
            (
                "publishedAfter",
                query.published_after.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let response: ListResponse<SearchItem> = self.get("search", &params)?;
        Ok(Page {
            items: response.items.into_iter().filter_map(SearchItem::into_summary).collect(),
            next_page_token: response.next_page_token,
        })
    }

    fn get_video_batch(&self, video_ids: &[String]) -> Result<Vec<VideoDetail>> {
        let params = [
            (
                "part",
                "id,snippet,contentDetails,statistics,liveStreamingDetails".to_string(),
            ),
            ("id", video_ids.join(",")),
            ("maxResults", video_ids.len().to_string()),
        ];

        let response: ListResponse<VideoItem> = self.get("videos", &params)?;
        Ok(response.items.into_iter().filter_map(VideoItem::into_detail).collect())
    }

    fn list_playlist_items(&self, playlist_id: &str, page_token: Option<&str>) -> Result<Page<PlaylistItem>> {
        let mut params = vec![
            ("part", "snippet".to_string()),
            ("playlistId", playlist_id.to_string()),
            ("maxResults", super::MAX_IDS_PER_REQUEST.to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let response: ListResponse<PlaylistEntry> = self.get("playlistItems", &params)?;
        Ok(Page {
            items: response.items.into_iter().filter_map(PlaylistEntry::into_item).collect(),
            next_page_token: response.next_page_token,
        })
    }

    fn list_channels(&self, channel_ids: &[String]) -> Result<Vec<ChannelInfo>> {
        let params = [
            ("part", "id,snippet".to_string()),
            ("id", channel_ids.join(",")),
            ("maxResults", channel_ids.len().to_string()),
        ];

        let response: ListResponse<ChannelItem> = self.get("channels", &params)?;
        Ok(response
            .items
            .into_iter()
            .map(|item| ChannelInfo {
                channel_id: item.id,
                title: item.snippet.title,
            })
            .collect())
    }
}
