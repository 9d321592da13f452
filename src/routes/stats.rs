// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard analytics.

use super::ApiResponse;
use crate::db::NoticeFilter;
use crate::error::Result;
use crate::models::{AdminStats, DailyVisitors, NoticeStatus, Priority};
use crate::time_utils::{self, local_date};
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use chrono::{Days, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

const TOP_NOTICES: i64 = 5;
const VISIT_HISTORY_DAYS: u64 = 14;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/stats", get(get_stats))
}

/// One entry per day in `[from, to]`, zero where no visits were recorded.
fn fill_days(from: NaiveDate, to: NaiveDate, recorded: Vec<DailyVisitors>) -> Vec<DailyVisitors> {
    let counts: HashMap<String, i64> = recorded
        .into_iter()
        .map(|d| (d.date, d.visitors))
        .collect();

    from.iter_days()
        .take_while(|day| *day <= to)
        .map(|day| {
            let date = day.to_string();
            let visitors = counts.get(&date).copied().unwrap_or(0);
            DailyVisitors { date, visitors }
        })
        .collect()
}

/// Notice counts, views, top notices and recent unique visitors.
async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<AdminStats>>> {
    let db = &state.db;
    let by_status = |status| NoticeFilter {
        status: Some(status),
        ..NoticeFilter::default()
    };

    let mut by_priority: BTreeMap<String, i64> = Priority::ALL
        .iter()
        .map(|p| (p.as_str().to_string(), 0))
        .collect();
    for (priority, count) in db.count_by_priority().await? {
        by_priority.insert(priority.as_str().to_string(), count);
    }

    let today = local_date(time_utils::now(), state.config.site_offset());
    let from = today
        .checked_sub_days(Days::new(VISIT_HISTORY_DAYS - 1))
        .unwrap_or(today);
    let visits = db.visitors_by_day(from, today).await?;

    let stats = AdminStats {
        total_notices: db.count_notices(&NoticeFilter::default()).await?,
        published_notices: db.count_notices(&by_status(NoticeStatus::Published)).await?,
        draft_notices: db.count_notices(&by_status(NoticeStatus::Draft)).await?,
        by_priority,
        total_views: db.total_views(&NoticeFilter::default()).await?,
        top_notices: db.top_notices(TOP_NOTICES).await?,
        visits_by_day: fill_days(from, today, visits),
    };

    Ok(ApiResponse::ok(stats))
}
