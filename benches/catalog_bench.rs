use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use video_catalog::collection::{merge_by_key, missing_detail_ids, new_records};
use video_catalog::{assemble, parse_duration, Denylist, Statistics, VideoDetail, VideoSummary};

fn summaries(count: usize) -> Vec<VideoSummary> {
    let start = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
    (0..count)
        .map(|n| VideoSummary {
            video_id: format!("video{:05}", n),
            title: format!("Episode {}", n),
            channel_name: "Brain Blaze".to_string(),
            channel_id: "UC1".to_string(),
            published_at: start + Duration::hours(n as i64),
        })
        .collect()
}

fn details(summaries: &[VideoSummary]) -> Vec<VideoDetail> {
    summaries
        .iter()
        .map(|s| VideoDetail {
            video_id: s.video_id.clone(),
            title: s.title.clone(),
            description: String::new(),
            published_at: s.published_at,
            duration: "PT12M34S".to_string(),
            statistics: Statistics {
                view_count: Some(12_345),
                like_count: Some(678),
                dislike_count: None,
                comment_count: Some(90),
            },
            live_streaming_details: None,
            channel_name: s.channel_name.clone(),
            channel_id: s.channel_id.clone(),
        })
        .collect()
}

fn bench_duration_parser(c: &mut Criterion) {
    c.bench_function("parse_duration", |b| {
        b.iter(|| {
            black_box(parse_duration(black_box("PT2H30M")));
            black_box(parse_duration(black_box("PT1H2M3S")));
            black_box(parse_duration(black_box("P0D")));
        })
    });
}

fn bench_merge(c: &mut Criterion) {
    let cached = summaries(5_000);
    let fetched: Vec<_> = summaries(5_050).into_iter().skip(4_950).collect();

    c.bench_function("stale_summary_merge", |b| {
        b.iter(|| {
            let added = new_records(&cached, fetched.clone());
            black_box(merge_by_key(cached.iter().cloned().chain(added)))
        })
    });

    let partial = details(&cached[..4_900]);
    c.bench_function("missing_detail_ids", |b| {
        b.iter(|| black_box(missing_detail_ids(&cached, &partial)))
    });
}

fn bench_assembly(c: &mut Criterion) {
    let summaries = summaries(5_000);
    let details = details(&summaries);
    let denylist = Denylist::new(vec!["video00042".to_string()]);

    c.bench_function("assemble_dataset", |b| {
        b.iter(|| black_box(assemble(&summaries, &details, &denylist)))
    });
}

criterion_group!(benches, bench_duration_parser, bench_merge, bench_assembly);
criterion_main!(benches);
