use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use travel_planner::services::extractor::{parse_completion, summarize_progress, ProgressTracker};

/// A completion document of realistic size: a week with four activities a day.
fn sample_completion() -> String {
    let days: Vec<String> = (1..=7)
        .map(|day| {
            let activities: Vec<String> = (1..=4)
                .map(|n| {
                    format!(
                        r#"{{"time": "{:02}:00", "title": "景点{}-{}", "description": "游览当地著名景点", "location": "景点{}-{}", "duration": "2小时", "cost": {}}}"#,
                        8 + n * 2,
                        day,
                        n,
                        day,
                        n,
                        n * 40
                    )
                })
                .collect();
            format!(
                r#"{{"day": {}, "date": "2025-05-{:02}", "activities": [{}]}}"#,
                day,
                day,
                activities.join(", ")
            )
        })
        .collect();

    format!(
        r#"```json
{{"estimatedCost": 4200, "itinerary": [{}]}}
```"#,
        days.join(", ")
    )
}

fn benchmark_progress(c: &mut Criterion) {
    let completion = sample_completion();
    // Fragments of the size the streaming endpoint typically sends.
    let fragments: Vec<String> = completion
        .chars()
        .collect::<Vec<_>>()
        .chunks(8)
        .map(|c| c.iter().collect())
        .collect();

    let mut group = c.benchmark_group("progress_extraction");

    group.bench_function("summarize_full_buffer", |b| {
        b.iter(|| summarize_progress(black_box(&completion)))
    });

    group.bench_function("tracker_over_stream", |b| {
        b.iter(|| {
            let mut tracker = ProgressTracker::new();
            for fragment in &fragments {
                black_box(tracker.push(fragment));
            }
            tracker.into_buffer()
        })
    });

    group.bench_function("parse_final_document", |b| {
        b.iter(|| parse_completion(black_box(&completion)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_progress);
criterion_main!(benches);
