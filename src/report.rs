/// Weekly aggregates and announcement text built from dataset rows
use crate::clock::week_start;
use crate::dataset::DatasetRow;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per channel totals for one week (Monday 00:00 UTC onwards)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyBucket {
    pub week: DateTime<Utc>,
    pub channel_name: String,
    pub video_count: usize,
    pub duration_minutes: f64,
    /// Sum of views × duration, in hours; rows without a view count add nothing
    pub views_hours: f64,
    /// This channel's share of all minutes published in the week
    pub minutes_share_percent: f64,
}

/// Group rows published on or after `week_floor` by week and channel.
///
/// Buckets come out ordered by week, then channel name.
pub fn weekly_summary<'a>(
    rows: impl IntoIterator<Item = &'a DatasetRow>,
    week_floor: DateTime<Utc>,
) -> Vec<WeeklyBucket> {
    let mut groups: BTreeMap<(DateTime<Utc>, String), WeeklyBucket> = BTreeMap::new();

    for row in rows.into_iter().filter(|row| row.published_at >= week_floor) {
        let week = week_start(row.published_at);
        let bucket = groups
            .entry((week, row.channel_name.clone()))
            .or_insert_with(|| WeeklyBucket {
                week,
                channel_name: row.channel_name.clone(),
                video_count: 0,
                duration_minutes: 0.0,
                views_hours: 0.0,
                minutes_share_percent: 0.0,
            });

        bucket.video_count += 1;
        bucket.duration_minutes += row.duration_minutes();
        if !row.views_seconds.is_nan() {
            bucket.views_hours += row.views_seconds / 3600.0;
        }
    }

    let mut week_totals: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
    for bucket in groups.values() {
        *week_totals.entry(bucket.week).or_default() += bucket.duration_minutes;
    }

    groups
        .into_values()
        .map(|mut bucket| {
            let total = week_totals.get(&bucket.week).copied().unwrap_or_default();
            if total > 0.0 {
                bucket.minutes_share_percent = bucket.duration_minutes / total * 100.0;
            }
            bucket
        })
        .collect()
}

/// Announcement text for every row published at or after `since`
pub fn announcement_lines<'a>(
    rows: impl IntoIterator<Item = &'a DatasetRow>,
    since: DateTime<Utc>,
) -> Vec<String> {
    rows.into_iter()
        .filter(|row| row.published_at >= since)
        .map(|row| format!("New video: {} \n {}", row.title, row.url()))
        .collect()
}
