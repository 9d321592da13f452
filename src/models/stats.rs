//! Aggregates served to the public info endpoint and the admin dashboard.

use serde::Serialize;
use std::collections::BTreeMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Public site information and headline counters.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SiteInfo {
    pub site_name: String,
    pub site_description: String,
    /// Published notices currently visible to the public
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_notices: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_views: i64,
    /// Distinct visitors, all time
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_visitors: i64,
    /// Distinct visitors on the current site-local date
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub today_visitors: i64,
    pub latest_publish_at: Option<String>,
    pub server_time: String,
}

/// Unique visitors on one calendar date (`YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DailyVisitors {
    pub date: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub visitors: i64,
}

/// Most-viewed notice entry on the dashboard.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TopNotice {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: i64,
    pub slug: String,
    pub title: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub view_count: i64,
}

/// Admin dashboard analytics.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AdminStats {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_notices: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub published_notices: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub draft_notices: i64,
    /// Count per priority: { "high": 3, "medium": 5, "low": 1 }
    pub by_priority: BTreeMap<String, i64>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_views: i64,
    pub top_notices: Vec<TopNotice>,
    /// One entry per day, oldest first, days without visits included
    pub visits_by_day: Vec<DailyVisitors>,
}
