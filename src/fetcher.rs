/// Paginated and chunked remote queries on top of a [`VideoApi`]
use crate::api::{Page, SearchOrder, SearchQuery, VideoApi, MAX_IDS_PER_REQUEST};
use crate::models::{ChannelInfo, PlaylistItem, VideoDetail, VideoSummary};
use crate::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pagination, pacing and retry settings
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Results per search page
    pub page_size: u32,
    /// Pages requested per query before giving up on the continuation token
    pub max_pages: usize,
    /// Pause before every continuation request
    pub page_delay: Duration,
    /// Extra attempts after a retryable failure
    pub max_retries: u32,
    /// First retry delay, doubled per attempt
    pub backoff_base: Duration,
    pub order: SearchOrder,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            page_size: MAX_IDS_PER_REQUEST as u32,
            max_pages: 300,
            page_delay: Duration::from_secs(1),
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            order: SearchOrder::Date,
        }
    }
}

impl FetchSettings {
    /// No pauses at all; for tests and offline stubs
    pub fn immediate() -> Self {
        Self {
            page_delay: Duration::ZERO,
            backoff_base: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Drives a [`VideoApi`] through continuation tokens and id chunks
pub struct PaginatedFetcher<A: VideoApi> {
    api: A,
    settings: FetchSettings,
}

impl<A: VideoApi> PaginatedFetcher<A> {
    pub fn new(api: A, settings: FetchSettings) -> Self {
        Self { api, settings }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// All videos published after `published_after` on each of the channels,
    /// concatenated in channel order then API order
    pub fn fetch_channel_videos(
        &self,
        channel_ids: &[String],
        published_after: DateTime<Utc>,
    ) -> Result<Vec<VideoSummary>> {
        let mut videos = Vec::new();
        for channel_id in channel_ids {
            let query = SearchQuery {
                channel_id: channel_id.clone(),
                published_after,
                order: self.settings.order,
                page_size: self.settings.page_size,
            };
            let found = self.paginate(&format!("search {}", channel_id), |token| {
                self.api.list_videos(&query, token)
            })?;
            debug!("Channel {} returned {} videos", channel_id, found.len());
            videos.extend(found);
        }

        info!(
            "🔎 Found {} videos on {} channel(s) published after {}",
            videos.len(),
            channel_ids.len(),
            published_after
        );
        Ok(videos)
    }

    /// Full metadata for the given ids, one request per chunk of at most 50 ids
    pub fn fetch_video_details(&self, video_ids: &[String]) -> Result<Vec<VideoDetail>> {
        let details = self.chunked("videos", video_ids, |chunk| self.api.get_video_batch(chunk))?;
        info!("📥 Retrieved details for {}/{} videos", details.len(), video_ids.len());
        Ok(details)
    }

    /// Channel titles, one request per chunk of at most 50 ids
    pub fn fetch_channels(&self, channel_ids: &[String]) -> Result<Vec<ChannelInfo>> {
        self.chunked("channels", channel_ids, |chunk| self.api.list_channels(chunk))
    }

    /// Every entry of a playlist
    pub fn fetch_playlist(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>> {
        self.paginate(&format!("playlist {}", playlist_id), |token| {
            self.api.list_playlist_items(playlist_id, token)
        })
    }

    fn paginate<T>(
        &self,
        label: &str,
        mut request: impl FnMut(Option<&str>) -> Result<Page<T>>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            if pages > 0 && !self.settings.page_delay.is_zero() {
                std::thread::sleep(self.settings.page_delay);
            }

            let page = self.with_retry(label, || request(token.as_deref()))?;
            pages += 1;
            items.extend(page.items);

            match page.next_page_token {
                None => break,
                Some(_) if pages >= self.settings.max_pages => {
                    warn!(
                        "⚠️ {}: stopped after {} pages with more results pending, returning {} partial results",
                        label,
                        pages,
                        items.len()
                    );
                    break;
                }
                Some(next) => token = Some(next),
            }
        }

        debug!("{}: {} results over {} page(s)", label, items.len(), pages);
        Ok(items)
    }

    fn chunked<T>(
        &self,
        label: &str,
        ids: &[String],
        mut request: impl FnMut(&[String]) -> Result<Vec<T>>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        for (index, chunk) in ids.chunks(MAX_IDS_PER_REQUEST).enumerate() {
            debug!("{}: requesting chunk {} ({} ids)", label, index + 1, chunk.len());
            items.extend(self.with_retry(label, || request(chunk))?);
        }
        Ok(items)
    }

    /// Retry with exponential backoff
    fn with_retry<T>(&self, label: &str, mut operation: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt = 0u32;
        loop {
            match operation() {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.settings.max_retries => {
                    let delay = self.settings.backoff_base * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        label,
                        attempt,
                        self.settings.max_retries + 1,
                        delay,
                        e
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CatalogError;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Serves canned search pages and records every request
    #[derive(Default)]
    struct ScriptedApi {
        pages: RefCell<VecDeque<Result<Page<VideoSummary>>>>,
        search_tokens: RefCell<Vec<Option<String>>>,
        batch_sizes: RefCell<Vec<usize>>,
    }

    impl ScriptedApi {
        fn with_pages(pages: Vec<Result<Page<VideoSummary>>>) -> Self {
            Self {
                pages: RefCell::new(pages.into()),
                ..Default::default()
            }
        }
    }

    impl VideoApi for ScriptedApi {
        fn list_videos(&self, _query: &SearchQuery, page_token: Option<&str>) -> Result<Page<VideoSummary>> {
            self.search_tokens.borrow_mut().push(page_token.map(str::to_string));
            self.pages
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(Page::last(Vec::new())))
        }

        fn get_video_batch(&self, video_ids: &[String]) -> Result<Vec<VideoDetail>> {
            self.batch_sizes.borrow_mut().push(video_ids.len());
            Ok(Vec::new())
        }

        fn list_playlist_items(&self, _playlist_id: &str, _page_token: Option<&str>) -> Result<Page<PlaylistItem>> {
            Ok(Page::last(vec![PlaylistItem {
                video_id: "p1".to_string(),
                title: String::new(),
                published_at: None,
            }]))
        }

        fn list_channels(&self, channel_ids: &[String]) -> Result<Vec<ChannelInfo>> {
            self.batch_sizes.borrow_mut().push(channel_ids.len());
            Ok(Vec::new())
        }
    }

    fn summary(id: &str) -> VideoSummary {
        VideoSummary {
            video_id: id.to_string(),
            title: id.to_string(),
            channel_name: "Brain Blaze".to_string(),
            channel_id: "UC1".to_string(),
            published_at: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn page(ids: &[&str], next: Option<&str>) -> Result<Page<VideoSummary>> {
        Ok(Page {
            items: ids.iter().map(|id| summary(id)).collect(),
            next_page_token: next.map(str::to_string),
        })
    }

    fn floor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_follows_continuation_tokens() {
        let api = ScriptedApi::with_pages(vec![
            page(&["a", "b"], Some("t1")),
            page(&["c"], Some("t2")),
            page(&["d"], None),
        ]);
        let fetcher = PaginatedFetcher::new(api, FetchSettings::immediate());

        let videos = fetcher.fetch_channel_videos(&["UC1".to_string()], floor()).unwrap();

        let ids: Vec<_> = videos.iter().map(|v| v.video_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(
            *fetcher.api().search_tokens.borrow(),
            vec![None, Some("t1".to_string()), Some("t2".to_string())]
        );
    }

    #[test]
    fn test_page_ceiling_truncates_without_error() {
        let api = ScriptedApi::with_pages(vec![
            page(&["a"], Some("t1")),
            page(&["b"], Some("t2")),
            page(&["c"], Some("t3")),
        ]);
        let settings = FetchSettings {
            max_pages: 2,
            ..FetchSettings::immediate()
        };
        let fetcher = PaginatedFetcher::new(api, settings);

        let videos = fetcher.fetch_channel_videos(&["UC1".to_string()], floor()).unwrap();

        assert_eq!(videos.len(), 2);
        assert_eq!(fetcher.api().search_tokens.borrow().len(), 2);
    }

    #[test]
    fn test_each_channel_is_searched() {
        let api = ScriptedApi::with_pages(vec![page(&["a"], None), page(&["b"], None)]);
        let fetcher = PaginatedFetcher::new(api, FetchSettings::immediate());

        let channels = vec!["UC1".to_string(), "UC2".to_string()];
        let videos = fetcher.fetch_channel_videos(&channels, floor()).unwrap();

        assert_eq!(videos.len(), 2);
        assert_eq!(fetcher.api().search_tokens.borrow().len(), 2);
    }

    #[test]
    fn test_batch_chunks_of_fifty() {
        let fetcher = PaginatedFetcher::new(ScriptedApi::default(), FetchSettings::immediate());
        let ids: Vec<String> = (0..123).map(|i| format!("id{}", i)).collect();

        fetcher.fetch_video_details(&ids).unwrap();

        assert_eq!(*fetcher.api().batch_sizes.borrow(), vec![50, 50, 23]);
    }

    #[test]
    fn test_empty_batch_makes_no_request() {
        let fetcher = PaginatedFetcher::new(ScriptedApi::default(), FetchSettings::immediate());
        let details = fetcher.fetch_video_details(&[]).unwrap();
        assert!(details.is_empty());
        assert!(fetcher.api().batch_sizes.borrow().is_empty());
    }

    #[test]
    fn test_channel_lookup_is_chunked() {
        let fetcher = PaginatedFetcher::new(ScriptedApi::default(), FetchSettings::immediate());
        let ids: Vec<String> = (0..51).map(|i| format!("UC{}", i)).collect();
        fetcher.fetch_channels(&ids).unwrap();
        assert_eq!(*fetcher.api().batch_sizes.borrow(), vec![50, 1]);
    }

    #[test]
    fn test_retryable_error_is_retried() {
        let api = ScriptedApi::with_pages(vec![
            Err(CatalogError::Api {
                status: 503,
                message: "backend error".to_string(),
            }),
            page(&["a"], None),
        ]);
        let fetcher = PaginatedFetcher::new(api, FetchSettings::immediate());

        let videos = fetcher.fetch_channel_videos(&["UC1".to_string()], floor()).unwrap();

        assert_eq!(videos.len(), 1);
        assert_eq!(fetcher.api().search_tokens.borrow().len(), 2);
    }

    #[test]
    fn test_auth_error_is_fatal() {
        let api = ScriptedApi::with_pages(vec![Err(CatalogError::Api {
            status: 403,
            message: "quotaExceeded".to_string(),
        })]);
        let fetcher = PaginatedFetcher::new(api, FetchSettings::immediate());

        let err = fetcher
            .fetch_channel_videos(&["UC1".to_string()], floor())
            .unwrap_err();

        assert!(matches!(err, CatalogError::Api { status: 403, .. }));
        assert_eq!(fetcher.api().search_tokens.borrow().len(), 1);
    }

    #[test]
    fn test_retries_are_bounded() {
        let failures = (0..10)
            .map(|_| {
                Err(CatalogError::Api {
                    status: 500,
                    message: String::new(),
                })
            })
            .collect();
        let api = ScriptedApi::with_pages(failures);
        let settings = FetchSettings {
            max_retries: 2,
            ..FetchSettings::immediate()
        };
        let fetcher = PaginatedFetcher::new(api, settings);

        assert!(fetcher.fetch_channel_videos(&["UC1".to_string()], floor()).is_err());
        assert_eq!(fetcher.api().search_tokens.borrow().len(), 3);
    }

    #[test]
    fn test_playlist_listing() {
        let fetcher = PaginatedFetcher::new(ScriptedApi::default(), FetchSettings::immediate());
        let items = fetcher.fetch_playlist("PL1").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].video_id, "p1");
    }
}
