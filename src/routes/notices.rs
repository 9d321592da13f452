// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notice authoring routes for the dashboard.
//!
//! The auth middleware is applied in routes/mod.rs for these routes.

use super::public::search_term;
use super::ApiResponse;
use crate::db::{NoticeFilter, NoticeSearch};
use crate::error::{AppError, Result};
use crate::extract::{ValidatedJson, ValidatedQuery};
use crate::middleware::auth::AuthUser;
use crate::models::{Attachment, NewNotice, NoticeChanges, NoticeStatus, NoticeView, Priority};
use crate::services::sanitize;
use crate::time_utils;
use crate::AppState;
use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

const DEFAULT_PER_PAGE: u32 = 20;
const MAX_PER_PAGE: u32 = 100;
const DEFAULT_SEARCH_LIMIT: i64 = 20;
const MAX_ATTACHMENTS: u64 = 20;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/notices", get(list_notices).post(create_notice))
        .route("/api/notices/search", get(search_notices))
        .route(
            "/api/notices/{id}",
            get(get_notice).put(update_notice).delete(delete_notice),
        )
}

/// Notice id from the path, rejected with the API envelope.
fn notice_id(path: std::result::Result<Path<i64>, PathRejection>) -> Result<i64> {
    let Path(id) = path.map_err(|_| AppError::BadRequest("Invalid notice id".to_string()))?;
    if id < 1 {
        return Err(AppError::BadRequest("Invalid notice id".to_string()));
    }
    Ok(id)
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Notice {} not found", id))
}

// ─── Listing ─────────────────────────────────────────────────

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminListParams {
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "must be at least 1"))]
    page: u32,
    /// Rows per page; clamped to 1..=100
    #[serde(default = "default_per_page")]
    per_page: u32,
    status: Option<NoticeStatus>,
    priority: Option<Priority>,
    #[validate(length(max = 100))]
    search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RowPagination {
    pub page: u32,
    pub per_page: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl RowPagination {
    fn new(page: u32, per_page: u32, total: i64) -> Self {
        let total_pages = (total + i64::from(per_page) - 1) / i64::from(per_page);
        Self {
            page,
            per_page,
            total,
            total_pages,
            has_next: i64::from(page) < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NoticeList {
    pub notices: Vec<NoticeView>,
    pub pagination: RowPagination,
}

/// All notices including drafts, newest first, paginated by row.
async fn list_notices(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(params): ValidatedQuery<AdminListParams>,
) -> Result<Json<ApiResponse<NoticeList>>> {
    let per_page = params.per_page.clamp(1, MAX_PER_PAGE);
    let filter = NoticeFilter {
        status: params.status,
        priority: params.priority,
        search: search_term(params.search.as_deref()),
        visible_at: None,
    };

    let total = state.db.count_notices(&filter).await?;
    let window = NoticeSearch {
        limit: i64::from(per_page),
        offset: i64::from(params.page - 1) * i64::from(per_page),
    };
    let notices = state
        .db
        .list_notices(&filter, window)
        .await?
        .into_iter()
        .map(NoticeView::from)
        .collect();

    Ok(ApiResponse::ok(NoticeList {
        notices,
        pagination: RowPagination::new(params.page, per_page, total),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminSearchParams {
    #[validate(length(min = 2, max = 100, message = "must be 2 to 100 characters"))]
    q: String,
    status: Option<NoticeStatus>,
    #[validate(range(min = 1, max = 50))]
    limit: Option<i64>,
}

/// Search over all notices, drafts included.
async fn search_notices(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(params): ValidatedQuery<AdminSearchParams>,
) -> Result<Json<ApiResponse<Vec<NoticeView>>>> {
    let query = search_term(Some(&params.q))
        .filter(|q| q.chars().count() >= 2)
        .ok_or_else(|| {
            AppError::BadRequest("Search query must be at least 2 characters".to_string())
        })?;

    let filter = NoticeFilter {
        status: params.status,
        search: Some(query),
        ..NoticeFilter::default()
    };
    let window = NoticeSearch {
        limit: params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
        offset: 0,
    };

    let results = state
        .db
        .list_notices(&filter, window)
        .await?
        .into_iter()
        .map(NoticeView::from)
        .collect();

    Ok(ApiResponse::ok(results))
}

async fn get_notice(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<NoticeView>>> {
    let id = notice_id(path)?;
    let notice = state.db.get_notice(id).await?.ok_or_else(|| not_found(id))?;
    Ok(ApiResponse::ok(NoticeView::from(notice)))
}

// ─── Create / Update ─────────────────────────────────────────

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNoticeRequest {
    #[validate(length(min = 1, max = 200))]
    title: String,
    #[validate(length(min = 1, max = 20000))]
    description: String,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    status: NoticeStatus,
    #[serde(default)]
    #[validate(length(max = MAX_ATTACHMENTS))]
    attachments: Vec<Attachment>,
    image_url: Option<String>,
    publish_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateNoticeRequest {
    #[validate(length(min = 1, max = 200))]
    title: Option<String>,
    #[validate(length(min = 1, max = 20000))]
    description: Option<String>,
    priority: Option<Priority>,
    status: Option<NoticeStatus>,
    #[validate(length(max = MAX_ATTACHMENTS))]
    attachments: Option<Vec<Attachment>>,
    #[serde(default, deserialize_with = "nullable")]
    image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    publish_at: Option<Option<DateTime<Utc>>>,
}

/// Sanitized title; blank after cleaning is an error.
fn clean_title(raw: &str) -> Result<String> {
    let title = sanitize::clean_line(raw);
    if title.is_empty() {
        return Err(AppError::BadRequest("Title must not be blank".to_string()));
    }
    Ok(title)
}

fn clean_description(raw: &str) -> Result<String> {
    let description = sanitize::clean_text(raw);
    if description.is_empty() {
        return Err(AppError::BadRequest(
            "Description must not be blank".to_string(),
        ));
    }
    Ok(description)
}

fn clean_url(field: &str, raw: &str) -> Result<String> {
    let url = raw.trim();
    if !sanitize::is_acceptable_url(url) {
        return Err(AppError::BadRequest(format!(
            "{} must be an /uploads/ path or an http(s) URL",
            field
        )));
    }
    Ok(url.to_string())
}

/// Optional image URL; blank means none.
fn clean_image_url(raw: Option<&str>) -> Result<Option<String>> {
    match raw.map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => clean_url("image_url", url).map(Some),
        None => Ok(None),
    }
}

fn clean_attachments(attachments: Vec<Attachment>) -> Result<Vec<Attachment>> {
    attachments
        .into_iter()
        .map(|a| {
            let name = sanitize::clean_line(&a.name);
            Ok(Attachment {
                url: clean_url("attachments.url", &a.url)?,
                name: if name.is_empty() {
                    "attachment".to_string()
                } else {
                    name
                },
                mime_type: sanitize::clean_line(&a.mime_type),
                size: a.size,
            })
        })
        .collect()
}

/// Stored publish times share the one-second precision of `time_utils::now`.
fn normalize_publish_at(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(0)
}

async fn create_notice(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(request): ValidatedJson<CreateNoticeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<NoticeView>>)> {
    let title = clean_title(&request.title)?;
    let description = clean_description(&request.description)?;
    let attachments = clean_attachments(request.attachments)?;
    let image_url = clean_image_url(request.image_url.as_deref())?;

    // Publishing without a schedule means publishing now
    let publish_at = match (request.status, request.publish_at) {
        (_, Some(at)) => Some(normalize_publish_at(at)),
        (NoticeStatus::Published, None) => Some(time_utils::now()),
        (NoticeStatus::Draft, None) => None,
    };

    let notice = state
        .db
        .insert_notice_with_unique_slug(
            &request.title,
            NewNotice {
                slug: String::new(),
                title,
                description,
                priority: request.priority,
                status: request.status,
                attachments,
                image_url,
                publish_at,
                created_by: Some(auth.user_id),
            },
        )
        .await?;

    tracing::info!(
        notice_id = notice.id,
        slug = %notice.slug,
        user_id = auth.user_id,
        "Notice created"
    );

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(NoticeView::from(notice), "Notice created"),
    ))
}

async fn update_notice(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    path: std::result::Result<Path<i64>, PathRejection>,
    ValidatedJson(request): ValidatedJson<UpdateNoticeRequest>,
) -> Result<Json<ApiResponse<NoticeView>>> {
    let id = notice_id(path)?;
    let existing = state.db.get_notice(id).await?.ok_or_else(|| not_found(id))?;

    let mut changes = NoticeChanges {
        title: request.title.as_deref().map(clean_title).transpose()?,
        description: request
            .description
            .as_deref()
            .map(clean_description)
            .transpose()?,
        priority: request.priority,
        status: request.status,
        attachments: request.attachments.map(clean_attachments).transpose()?,
        image_url: request
            .image_url
            .map(|url| clean_image_url(url.as_deref()))
            .transpose()?,
        publish_at: request
            .publish_at
            .map(|at| at.map(normalize_publish_at)),
    };

    let status = changes.status.unwrap_or(existing.status);
    let publish_at = changes.publish_at.unwrap_or(existing.publish_at);
    if status == NoticeStatus::Published && publish_at.is_none() {
        changes.publish_at = Some(Some(time_utils::now()));
    }

    let notice = state
        .db
        .update_notice(id, &changes)
        .await?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(notice_id = id, user_id = auth.user_id, "Notice updated");

    Ok(ApiResponse::with_message(
        NoticeView::from(notice),
        "Notice updated",
    ))
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeletedNotice {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: i64,
    pub removed_files: usize,
}

/// Delete a notice and its locally stored files. Admins only.
async fn delete_notice(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<DeletedNotice>>> {
    let id = notice_id(path)?;
    auth.require_admin()?;

    let notice = state
        .db
        .delete_notice(id)
        .await?
        .ok_or_else(|| not_found(id))?;
    let removed_files = state.uploads.remove_all(notice.file_urls()).await;

    tracing::info!(
        notice_id = id,
        user_id = auth.user_id,
        removed_files,
        "Notice deleted"
    );

    Ok(ApiResponse::with_message(
        DeletedNotice { id, removed_files },
        "Notice deleted",
    ))
}
