/// Dataset assembly: joins summaries and details into flat rows with derived metrics
use crate::duration::parse_duration;
use crate::models::{VideoDetail, VideoSummary};
use crate::{CatalogError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use tracing::{debug, info, warn};

/// One video of the assembled dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRow {
    pub video_id: String,
    pub title: String,
    pub channel_name: String,
    pub channel_id: String,
    pub published_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub is_stream: bool,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub dislike_count: Option<u64>,
    /// likes / dislikes
    pub like_dislike_ratio: f64,
    /// likes / views
    pub like_view_ratio: f64,
    /// dislikes / views
    pub dislike_view_ratio: f64,
    /// views × duration in seconds
    pub views_seconds: f64,
}

/// Missing counters become NaN so every ratio they take part in is NaN too
fn as_metric(count: Option<u64>) -> f64 {
    count.map_or(f64::NAN, |value| value as f64)
}

impl DatasetRow {
    /// Build a row from an aligned pair; `None` if the duration is unparseable
    fn from_pair(summary: &VideoSummary, detail: &VideoDetail) -> Option<Self> {
        let Some(duration_seconds) = parse_duration(&detail.duration) else {
            warn!(
                "Excluding {} ({}): no usable duration {:?}",
                detail.video_id, detail.title, detail.duration
            );
            return None;
        };

        let stats = &detail.statistics;
        let views = as_metric(stats.view_count);
        let likes = as_metric(stats.like_count);
        let dislikes = as_metric(stats.dislike_count);

        let channel_id = if detail.channel_id.is_empty() {
            summary.channel_id.clone()
        } else {
            detail.channel_id.clone()
        };

        Some(Self {
            video_id: detail.video_id.clone(),
            title: detail.title.clone(),
            channel_name: detail.channel_name.clone(),
            channel_id,
            published_at: detail.published_at,
            duration_seconds,
            is_stream: detail.is_stream(),
            view_count: stats.view_count,
            like_count: stats.like_count,
            dislike_count: stats.dislike_count,
            like_dislike_ratio: likes / dislikes,
            like_view_ratio: likes / views,
            dislike_view_ratio: dislikes / views,
            views_seconds: views * duration_seconds as f64,
        })
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_seconds as f64 / 60.0
    }

    pub fn url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }
}

/// Hand-curated video ids excluded from reporting
#[derive(Debug, Clone, Default)]
pub struct Denylist(HashSet<String>);

impl Denylist {
    pub fn new(ids: impl IntoIterator<Item = String>) -> Self {
        Self(ids.into_iter().collect())
    }

    pub fn contains(&self, video_id: &str) -> bool {
        self.0.contains(video_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Row filters applied after assembly
#[derive(Debug, Clone)]
pub struct DatasetFilter {
    pub include_streams: bool,
    /// Inclusive lower bound
    pub min_duration_seconds: Option<u64>,
    /// Exclusive upper bound
    pub max_duration_seconds: Option<u64>,
    /// Keep only these channel names
    pub channels: Option<Vec<String>>,
}

impl Default for DatasetFilter {
    fn default() -> Self {
        Self {
            include_streams: true,
            min_duration_seconds: None,
            max_duration_seconds: None,
            channels: None,
        }
    }
}

impl DatasetFilter {
    pub fn matches(&self, row: &DatasetRow) -> bool {
        if !self.include_streams && row.is_stream {
            return false;
        }
        if self.min_duration_seconds.is_some_and(|min| row.duration_seconds < min) {
            return false;
        }
        if self.max_duration_seconds.is_some_and(|max| row.duration_seconds >= max) {
            return false;
        }
        if let Some(channels) = &self.channels {
            if !channels.iter().any(|channel| channel == &row.channel_name) {
                return false;
            }
        }
        true
    }
}

/// Assembled tabular dataset
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub rows: Vec<DatasetRow>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, video_id: &str) -> Option<&DatasetRow> {
        self.rows.iter().find(|row| row.video_id == video_id)
    }

    /// Keep only rows matching the filter
    pub fn filter(self, filter: &DatasetFilter) -> Self {
        let before = self.rows.len();
        let rows: Vec<_> = self.rows.into_iter().filter(|row| filter.matches(row)).collect();
        debug!("Filter kept {}/{} rows", rows.len(), before);
        Self { rows }
    }

    /// Write rows as a pretty JSON array; NaN ratios are written as null
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, &self.rows)?;
        Ok(())
    }
}

/// Pair every detail with the summary of the same id.
///
/// Details without a summary are left out: they belong to another dataset's
/// search window or to a summary cache that has not caught up yet.
pub fn align<'a>(
    summaries: &'a [VideoSummary],
    details: &'a [VideoDetail],
) -> Vec<(&'a VideoSummary, &'a VideoDetail)> {
    let by_id: HashMap<&str, &VideoSummary> = summaries
        .iter()
        .map(|summary| (summary.video_id.as_str(), summary))
        .collect();

    details
        .iter()
        .filter_map(|detail| match by_id.get(detail.video_id.as_str()) {
            Some(summary) => Some((*summary, detail)),
            None => {
                debug!("Detail {} has no matching summary", detail.video_id);
                None
            }
        })
        .collect()
}

/// Build rows from already aligned pairs.
///
/// A pair whose ids disagree means the collections were zipped out of step;
/// that is a bug upstream and fails the whole assembly.
pub fn assemble_pairs<'a>(
    pairs: impl IntoIterator<Item = (&'a VideoSummary, &'a VideoDetail)>,
    denylist: &Denylist,
) -> Result<Dataset> {
    let mut rows = Vec::new();
    let mut seen = HashSet::new();
    let mut excluded = 0usize;

    for (index, (summary, detail)) in pairs.into_iter().enumerate() {
        if summary.video_id != detail.video_id {
            return Err(CatalogError::Misaligned {
                index,
                summary_id: summary.video_id.clone(),
                detail_id: detail.video_id.clone(),
            });
        }
        if denylist.contains(&detail.video_id) {
            debug!("Denylisted: {}", detail.video_id);
            excluded += 1;
            continue;
        }
        if !seen.insert(detail.video_id.as_str()) {
            continue;
        }
        match DatasetRow::from_pair(summary, detail) {
            Some(row) => rows.push(row),
            None => excluded += 1,
        }
    }

    info!("📊 Assembled dataset: {} rows, {} excluded", rows.len(), excluded);
    Ok(Dataset { rows })
}

/// Join summaries and details by video id and build the dataset
pub fn assemble(
    summaries: &[VideoSummary],
    details: &[VideoDetail],
    denylist: &Denylist,
) -> Result<Dataset> {
    assemble_pairs(align(summaries, details), denylist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LiveStreamingDetails, Statistics};
    use chrono::TimeZone;

    fn published() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 3, 1, 12, 0, 0).unwrap()
    }

    fn summary(id: &str) -> VideoSummary {
        VideoSummary {
            video_id: id.to_string(),
            title: format!("title {}", id),
            channel_name: "Brain Blaze".to_string(),
            channel_id: "UC1".to_string(),
            published_at: published(),
        }
    }

    fn detail(id: &str, duration: &str, views: Option<u64>, likes: Option<u64>, dislikes: Option<u64>) -> VideoDetail {
        VideoDetail {
            video_id: id.to_string(),
            title: format!("title {}", id),
            description: String::new(),
            published_at: published(),
            duration: duration.to_string(),
            statistics: Statistics {
                view_count: views,
                like_count: likes,
                dislike_count: dislikes,
                comment_count: None,
            },
            live_streaming_details: None,
            channel_name: "Brain Blaze".to_string(),
            channel_id: String::new(),
        }
    }

    #[test]
    fn test_row_metrics_without_dislikes() {
        let summaries = vec![summary("abc")];
        let details = vec![detail("abc", "PT1M40S", Some(100), Some(10), None)];

        let dataset = assemble(&summaries, &details, &Denylist::default()).unwrap();

        assert_eq!(dataset.len(), 1);
        let row = &dataset.rows[0];
        assert_eq!(row.duration_seconds, 100);
        assert_eq!(row.like_view_ratio, 0.1);
        assert!(row.dislike_view_ratio.is_nan());
        assert!(row.like_dislike_ratio.is_nan());
        assert_eq!(row.views_seconds, 10_000.0);
        assert_eq!(row.channel_id, "UC1");
    }

    #[test]
    fn test_row_metrics_with_dislikes() {
        let summaries = vec![summary("abc")];
        let details = vec![detail("abc", "PT10S", Some(200), Some(20), Some(5))];

        let dataset = assemble(&summaries, &details, &Denylist::default()).unwrap();

        let row = &dataset.rows[0];
        assert_eq!(row.like_dislike_ratio, 4.0);
        assert_eq!(row.like_view_ratio, 0.1);
        assert_eq!(row.dislike_view_ratio, 0.025);
    }

    #[test]
    fn test_unparseable_durations_are_dropped() {
        let summaries = vec![summary("a"), summary("b"), summary("c")];
        let details = vec![
            detail("a", "P0D", Some(1), Some(1), None),
            detail("b", "garbage", Some(1), Some(1), None),
            detail("c", "PT5M", Some(1), Some(1), None),
        ];

        let dataset = assemble(&summaries, &details, &Denylist::default()).unwrap();

        assert_eq!(dataset.len(), 1);
        assert!(dataset.get("c").is_some());
    }

    #[test]
    fn test_denylist_is_applied() {
        let summaries = vec![summary("a"), summary("b")];
        let details = vec![
            detail("a", "PT5M", None, None, None),
            detail("b", "PT5M", None, None, None),
        ];
        let denylist = Denylist::new(vec!["a".to_string()]);

        let dataset = assemble(&summaries, &details, &denylist).unwrap();

        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.rows[0].video_id, "b");
    }

    #[test]
    fn test_details_without_summary_are_skipped() {
        let summaries = vec![summary("a")];
        let details = vec![detail("a", "PT5M", None, None, None), detail("z", "PT5M", None, None, None)];

        let dataset = assemble(&summaries, &details, &Denylist::default()).unwrap();
        assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn test_misaligned_pairs_fail() {
        let s = summary("a");
        let d = detail("b", "PT5M", None, None, None);

        let err = assemble_pairs(vec![(&s, &d)], &Denylist::default()).unwrap_err();

        match err {
            CatalogError::Misaligned { index, summary_id, detail_id } => {
                assert_eq!(index, 0);
                assert_eq!(summary_id, "a");
                assert_eq!(detail_id, "b");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_filter_streams_and_duration_bounds() {
        let summaries = vec![summary("short"), summary("normal"), summary("long"), summary("stream")];
        let mut stream = detail("stream", "PT20M", None, None, None);
        stream.live_streaming_details = Some(LiveStreamingDetails::default());
        let details = vec![
            detail("short", "PT2M", None, None, None),
            detail("normal", "PT20M", None, None, None),
            detail("long", "PT2H", None, None, None),
            stream,
        ];

        let dataset = assemble(&summaries, &details, &Denylist::default()).unwrap();
        assert_eq!(dataset.len(), 4);
        assert!(dataset.get("stream").unwrap().is_stream);

        let filter = DatasetFilter {
            include_streams: false,
            min_duration_seconds: Some(180),
            max_duration_seconds: Some(5400),
            channels: None,
        };
        let filtered = dataset.filter(&filter);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.rows[0].video_id, "normal");
    }

    #[test]
    fn test_channel_filter() {
        let summaries = vec![summary("a")];
        let details = vec![detail("a", "PT5M", None, None, None)];
        let dataset = assemble(&summaries, &details, &Denylist::default()).unwrap();

        let filter = DatasetFilter {
            channels: Some(vec!["The Casual Criminalist".to_string()]),
            ..DatasetFilter::default()
        };
        assert!(dataset.filter(&filter).is_empty());
    }

    #[test]
    fn test_json_export_writes_nan_as_null() {
        let summaries = vec![summary("abc")];
        let details = vec![detail("abc", "PT1M40S", Some(100), Some(10), None)];
        let dataset = assemble(&summaries, &details, &Denylist::default()).unwrap();

        let mut buffer = Vec::new();
        dataset.write_json(&mut buffer).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        assert_eq!(value[0]["duration_seconds"], 100);
        assert!(value[0]["dislike_view_ratio"].is_null());
        assert_eq!(value[0]["like_view_ratio"], 0.1);
    }
}
