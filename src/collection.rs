/// Incremental collection manager
///
/// Decides per named cache whether it is Cold (absent), Warm (fresh enough to
/// reuse without any remote call) or Stale (extend it with what is new), and
/// keeps the summary, detail and channel collections of a dataset up to date.
/// Collections only grow here; exclusion happens at dataset assembly.
use crate::api::VideoApi;
use crate::cache::{CacheStore, CHANNEL_SUFFIX, DETAIL_SUFFIX, SUMMARY_SUFFIX};
use crate::fetcher::PaginatedFetcher;
use crate::models::{ChannelInfo, Keyed, VideoDetail, VideoSummary};
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info};

/// Default maximum cache age before a refresh is attempted
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(24 * 60 * 60);

/// Freshness of a cache file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No cache file
    Cold,
    /// Age within the freshness threshold
    Warm,
    /// Age beyond the freshness threshold
    Stale,
}

impl CacheState {
    pub fn evaluate(age: Option<Duration>, threshold: Duration) -> Self {
        match age {
            None => CacheState::Cold,
            Some(age) if age <= threshold => CacheState::Warm,
            Some(_) => CacheState::Stale,
        }
    }
}

/// What to collect for one dataset
#[derive(Debug, Clone)]
pub struct DatasetRequest {
    pub name: String,
    pub channel_ids: Vec<String>,
    /// Floor for the initial (cold) search
    pub earliest_date: DateTime<Utc>,
}

/// Up-to-date summaries and details of a dataset
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub summaries: Vec<VideoSummary>,
    pub details: Vec<VideoDetail>,
}

/// Cache file names used for a dataset
pub fn summary_cache_name(dataset: &str) -> String {
    format!("{}{}", dataset, SUMMARY_SUFFIX)
}

pub fn detail_cache_name(dataset: &str) -> String {
    format!("{}{}", dataset, DETAIL_SUFFIX)
}

pub fn channel_cache_name(dataset: &str) -> String {
    format!("{}{}", dataset, CHANNEL_SUFFIX)
}

/// Deduplicate by key with last-write-wins contents.
///
/// Each key keeps the position of its first occurrence and the value of its
/// last occurrence.
pub fn merge_by_key<T: Keyed>(records: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut merged: Vec<T> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in records {
        let existing = positions.get(record.key()).copied();
        match existing {
            Some(index) => merged[index] = record,
            None => {
                positions.insert(record.key().to_string(), merged.len());
                merged.push(record);
            }
        }
    }

    merged
}

/// Records of `fetched` whose key is not already in `existing`
pub fn new_records<T: Keyed>(existing: &[T], fetched: Vec<T>) -> Vec<T> {
    let known: HashSet<&str> = existing.iter().map(Keyed::key).collect();
    fetched.into_iter().filter(|record| !known.contains(record.key())).collect()
}

/// Ids of `summaries` that have no entry in `details`, in summary order
pub fn missing_detail_ids(summaries: &[VideoSummary], details: &[VideoDetail]) -> Vec<String> {
    let known: HashSet<&str> = details.iter().map(|detail| detail.video_id.as_str()).collect();
    let mut seen = HashSet::new();
    summaries
        .iter()
        .map(|summary| summary.video_id.as_str())
        .filter(|id| !known.contains(id) && seen.insert(*id))
        .map(str::to_string)
        .collect()
}

/// Orchestrates the cache store and the remote fetcher
pub struct CollectionManager<A: VideoApi> {
    store: CacheStore,
    fetcher: PaginatedFetcher<A>,
    freshness: Duration,
}

impl<A: VideoApi> CollectionManager<A> {
    pub fn new(store: CacheStore, fetcher: PaginatedFetcher<A>, freshness: Duration) -> Self {
        Self {
            store,
            fetcher,
            freshness,
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn fetcher(&self) -> &PaginatedFetcher<A> {
        &self.fetcher
    }

    /// Current state of the named cache
    pub fn state(&self, cache_name: &str) -> Result<CacheState> {
        Ok(CacheState::evaluate(self.store.age(cache_name)?, self.freshness))
    }

    /// Bring summaries and details of a dataset up to date
    pub fn collect(&self, request: &DatasetRequest) -> Result<Collection> {
        let summaries = self.summaries(&request.name, &request.channel_ids, request.earliest_date)?;
        let details = self.details(&request.name, &summaries)?;
        Ok(Collection { summaries, details })
    }

    /// Video summaries for the channels, published on or after `earliest_date`.
    ///
    /// Stale caches are extended with videos published after the newest cached one.
    pub fn summaries(
        &self,
        dataset: &str,
        channel_ids: &[String],
        earliest_date: DateTime<Utc>,
    ) -> Result<Vec<VideoSummary>> {
        let name = summary_cache_name(dataset);
        let cached = self.store.load::<VideoSummary>(&name)?;

        match CacheState::evaluate(cached.age, self.freshness) {
            CacheState::Cold => {
                info!("🆕 {}: no cache, fetching everything since {}", name, earliest_date);
                let fetched = self.fetcher.fetch_channel_videos(channel_ids, earliest_date)?;
                let summaries = merge_by_key(fetched);
                self.store.save(&name, &summaries)?;
                Ok(summaries)
            }
            CacheState::Warm => {
                info!("📚 {}: cache is fresh, {} videos, no update performed", name, cached.records.len());
                Ok(cached.records)
            }
            CacheState::Stale => {
                let floor = cached
                    .records
                    .iter()
                    .map(|summary| summary.published_at)
                    .max()
                    .map_or(earliest_date, |latest| latest.max(earliest_date));
                info!("⏰ {}: cache is stale, fetching videos published after {}", name, floor);

                let fetched = self.fetcher.fetch_channel_videos(channel_ids, floor)?;
                let added = new_records(&cached.records, fetched);
                let previous = cached.records.len();
                let summaries = merge_by_key(cached.records.into_iter().chain(added));

                info!("➕ {}: {} new videos ({} total)", name, summaries.len() - previous, summaries.len());
                self.store.save(&name, &summaries)?;
                Ok(summaries)
            }
        }
    }

    /// Video details for every summary.
    ///
    /// Stale caches are extended by fetching exactly the ids not yet present.
    pub fn details(&self, dataset: &str, summaries: &[VideoSummary]) -> Result<Vec<VideoDetail>> {
        let name = detail_cache_name(dataset);
        let cached = self.store.load::<VideoDetail>(&name)?;

        match CacheState::evaluate(cached.age, self.freshness) {
            CacheState::Cold => {
                let ids = missing_detail_ids(summaries, &[]);
                info!("🆕 {}: no cache, fetching details for {} videos", name, ids.len());
                let details = merge_by_key(self.fetcher.fetch_video_details(&ids)?);
                self.store.save(&name, &details)?;
                Ok(details)
            }
            CacheState::Warm => {
                info!("📚 {}: cache is fresh, {} details, no update performed", name, cached.records.len());
                Ok(cached.records)
            }
            CacheState::Stale => {
                let ids = missing_detail_ids(summaries, &cached.records);
                info!("⏰ {}: cache is stale, {} videos missing details", name, ids.len());

                let fetched = if ids.is_empty() {
                    Vec::new()
                } else {
                    self.fetcher.fetch_video_details(&ids)?
                };
                let details = merge_by_key(cached.records.into_iter().chain(fetched));
                self.store.save(&name, &details)?;
                Ok(details)
            }
        }
    }

    /// Channel titles. Titles can change, so a stale cache is refetched whole.
    pub fn channels(&self, dataset: &str, channel_ids: &[String]) -> Result<Vec<ChannelInfo>> {
        let name = channel_cache_name(dataset);
        let cached = self.store.load::<ChannelInfo>(&name)?;

        match CacheState::evaluate(cached.age, self.freshness) {
            CacheState::Warm => {
                debug!("{}: cache is fresh, no update performed", name);
                Ok(cached.records)
            }
            state => {
                info!("🔄 {}: {:?} cache, fetching {} channels", name, state, channel_ids.len());
                let fetched = self.fetcher.fetch_channels(channel_ids)?;
                let channels = merge_by_key(cached.records.into_iter().chain(fetched));
                self.store.save(&name, &channels)?;
                Ok(channels)
            }
        }
    }
}
