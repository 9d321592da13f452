use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use noticeboard::models::{Notice, NoticeStatus, Priority};
use noticeboard::services::{group_notices, paginate_groups};
use sqlx::types::Json;

/// A board with `per_day` notices on each of `days` consecutive days.
fn board(days: i64, per_day: i64) -> Vec<Notice> {
    let start: DateTime<Utc> = DateTime::parse_from_rfc3339("2026-01-01T08:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc);
    let priorities = [Priority::High, Priority::Medium, Priority::Low];

    (0..days * per_day)
        .map(|i| {
            let publish_at = start + Duration::days(i / per_day) + Duration::minutes(i % per_day);
            Notice {
                id: i + 1,
                slug: format!("notice-{}", i + 1),
                title: format!("Notice {}", i + 1),
                description: "Details".repeat(20),
                priority: priorities[(i % 3) as usize],
                status: NoticeStatus::Published,
                attachments: Json(vec![]),
                image_url: None,
                publish_at: Some(publish_at),
                view_count: i,
                created_by: None,
                created_at: publish_at,
                updated_at: publish_at,
            }
        })
        .collect()
}

fn benchmark_grouping(c: &mut Criterion) {
    let utc = FixedOffset::east_opt(0).expect("valid offset");
    let ist = FixedOffset::east_opt(330 * 60).expect("valid offset");
    let today = NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date");

    // Roughly a year of a busy school board
    let notices = board(365, 8);

    let mut group = c.benchmark_group("notice_grouping");

    group.bench_function("group_year_utc", |b| {
        b.iter(|| group_notices(black_box(notices.clone()), today, utc))
    });

    group.bench_function("group_year_offset", |b| {
        b.iter(|| group_notices(black_box(notices.clone()), today, ist))
    });

    let groups = group_notices(notices.clone(), today, utc);
    group.bench_function("paginate_middle_page", |b| {
        b.iter(|| paginate_groups(black_box(groups.clone()), 20, 5))
    });

    group.finish();
}

criterion_group!(benches, benchmark_grouping);
criterion_main!(benches);
