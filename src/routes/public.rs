// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only routes for the public notice board.
//!
//! Only published notices whose publish time has passed are ever returned.

use super::{user_agent, ApiResponse};
use crate::db::{NoticeFilter, NoticeSearch};
use crate::error::{AppError, Result};
use crate::extract::{ValidatedJson, ValidatedQuery};
use crate::middleware::ClientIp;
use crate::models::{NoticeView, Priority, SiteInfo};
use crate::services::{group_notices, paginate_groups, GroupPage};
use crate::time_utils::{self, format_utc_rfc3339, local_date};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidationError};

const DEFAULT_GROUPS_PER_PAGE: u32 = 5;
const MAX_GROUPS_PER_PAGE: u32 = 30;
const DEFAULT_SEARCH_LIMIT: i64 = 20;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/public/notices", get(list_notices))
        .route("/api/public/notices/{slug}", get(get_notice))
        .route("/api/public/search", get(search_notices))
        .route("/api/public/info", get(site_info))
        .route("/api/public/visits", post(record_visit))
}

/// Trimmed search term, or `None` when blank.
pub(super) fn search_term(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ─── Grouped Listing ─────────────────────────────────────────

fn default_page() -> u32 {
    1
}

fn default_groups_per_page() -> u32 {
    DEFAULT_GROUPS_PER_PAGE
}

#[derive(Debug, Deserialize, Validate)]
pub struct ListParams {
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "must be at least 1"))]
    page: u32,
    /// Groups per page; clamped to 1..=30
    #[serde(default = "default_groups_per_page")]
    per_page: u32,
    #[validate(length(max = 100))]
    search: Option<String>,
    priority: Option<Priority>,
}

/// Published notices grouped by publish date, paginated by group.
async fn list_notices(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(params): ValidatedQuery<ListParams>,
) -> Result<Json<ApiResponse<GroupPage>>> {
    let now = time_utils::now();
    let offset = state.config.site_offset();
    let per_page = params.per_page.clamp(1, MAX_GROUPS_PER_PAGE);

    let filter = NoticeFilter {
        priority: params.priority,
        search: search_term(params.search.as_deref()),
        ..NoticeFilter::public(now)
    };
    let notices = state.db.all_notices(&filter).await?;

    let groups = group_notices(notices, local_date(now, offset), offset);
    let page = paginate_groups(groups, params.page, per_page);

    tracing::debug!(
        page = page.pagination.page,
        groups = page.groups.len(),
        total_groups = page.pagination.total_groups,
        "Listed public notices"
    );

    Ok(ApiResponse::ok(page))
}

// ─── Notice Detail ───────────────────────────────────────────

/// One visible notice by slug. Each fetch counts as a view.
async fn get_notice(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<NoticeView>>> {
    let mut notice = state
        .db
        .get_visible_notice_by_slug(&slug, time_utils::now())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Notice '{}' not found", slug)))?;

    state.db.increment_view_count(notice.id).await?;
    notice.view_count += 1;

    Ok(ApiResponse::ok(NoticeView::from(notice)))
}

// ─── Search ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct SearchParams {
    #[validate(length(min = 2, max = 100, message = "must be 2 to 100 characters"))]
    q: String,
    #[validate(range(min = 1, max = 50))]
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SearchResults {
    pub query: String,
    pub count: usize,
    pub results: Vec<NoticeView>,
}

/// Flat, newest-first search over visible notices.
async fn search_notices(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(params): ValidatedQuery<SearchParams>,
) -> Result<Json<ApiResponse<SearchResults>>> {
    let query = params.q.trim().to_string();
    if query.chars().count() < 2 {
        return Err(AppError::BadRequest(
            "Search query must be at least 2 characters".to_string(),
        ));
    }

    let filter = NoticeFilter {
        search: Some(query.clone()),
        ..NoticeFilter::public(time_utils::now())
    };
    let window = NoticeSearch {
        limit: params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
        offset: 0,
    };

    let results: Vec<NoticeView> = state
        .db
        .list_notices(&filter, window)
        .await?
        .into_iter()
        .map(NoticeView::from)
        .collect();

    Ok(ApiResponse::ok(SearchResults {
        query,
        count: results.len(),
        results,
    }))
}

// ─── Site Info ───────────────────────────────────────────────

/// Site name and headline counters for the public header.
async fn site_info(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<SiteInfo>>> {
    let now = time_utils::now();
    let today = local_date(now, state.config.site_offset());
    let visible = NoticeFilter::public(now);

    let info = SiteInfo {
        site_name: state.config.site_name.clone(),
        site_description: state.config.site_description.clone(),
        total_notices: state.db.count_notices(&visible).await?,
        total_views: state.db.total_views(&visible).await?,
        total_visitors: state.db.count_visitors().await?,
        today_visitors: state.db.count_visitors_on(today).await?,
        latest_publish_at: state
            .db
            .latest_publish_at(now)
            .await?
            .map(format_utc_rfc3339),
        server_time: format_utc_rfc3339(now),
    };

    Ok(ApiResponse::ok(info))
}

// ─── Site Visits ─────────────────────────────────────────────

fn validate_visit_path(path: &str) -> std::result::Result<(), ValidationError> {
    if path.starts_with('/') && !path.chars().any(char::is_control) {
        Ok(())
    } else {
        Err(ValidationError::new("path")
            .with_message("must be an absolute path starting with '/'".into()))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct VisitRequest {
    #[validate(
        length(min = 1, max = 200),
        custom(function = "validate_visit_path")
    )]
    path: String,
}

/// Record a page view for unique-visitor analytics.
async fn record_visit(
    State(state): State<Arc<AppState>>,
    Extension(client): Extension<ClientIp>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<VisitRequest>,
) -> Result<StatusCode> {
    let now = time_utils::now();
    let visit_date = local_date(now, state.config.site_offset());
    let agent = user_agent(&headers);
    let visitor = state
        .visitor_hasher
        .visitor_hash(&client.0, agent.as_deref());

    let path = request.path.split(['?', '#']).next().unwrap_or_default();
    let new_visit = state.db.record_visit(&visitor, path, visit_date).await?;
    tracing::debug!(path, new_visit, "Recorded site visit");

    Ok(StatusCode::NO_CONTENT)
}
