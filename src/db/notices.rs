// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use super::Database;
use crate::error::AppError;
use crate::models::{NewNotice, Notice, NoticeChanges, NoticeStatus, Priority, TopNotice};
use crate::services::{sanitize, slug};
use crate::time_utils;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite};

/// Upper bound on `-N` suffixes tried before falling back to a random suffix.
const MAX_SLUG_ATTEMPTS: u32 = 100;

/// Inserts retried after losing a slug to a concurrent create.
const MAX_INSERT_ATTEMPTS: u32 = 5;

/// Unicode-lowercased text that search patterns are matched against.
fn search_text(title: &str, description: &str) -> String {
    format!("{}\n{}", title, description).to_lowercase()
}

fn random_slug(base: &str) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", base, &random[..8])
}

/// Predicates shared by the public listing, admin listing and both searches.
#[derive(Debug, Clone, Default)]
pub struct NoticeFilter {
    pub status: Option<NoticeStatus>,
    pub priority: Option<Priority>,
    /// Case-insensitive substring of title or description
    pub search: Option<String>,
    /// Restrict to notices the public can see at this instant
    pub visible_at: Option<DateTime<Utc>>,
}

impl NoticeFilter {
    /// Notices visible to the public right now.
    pub fn public(now: DateTime<Utc>) -> Self {
        Self {
            visible_at: Some(now),
            ..Self::default()
        }
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE 1 = 1");
        if let Some(status) = self.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(priority) = self.priority {
            qb.push(" AND priority = ").push_bind(priority);
        }
        if let Some(now) = self.visible_at {
            qb.push(" AND status = ")
                .push_bind(NoticeStatus::Published)
                .push(" AND publish_at IS NOT NULL AND publish_at <= ")
                .push_bind(now);
        }
        if let Some(term) = self.search.as_deref() {
            qb.push(" AND search_text LIKE ")
                .push_bind(sanitize::like_pattern(term).to_lowercase())
                .push(" ESCAPE '\\'");
        }
    }
}

/// Row window for admin listings and searches.
#[derive(Debug, Clone, Copy)]
pub struct NoticeSearch {
    pub limit: i64,
    pub offset: i64,
}

impl Database {
    // ─── Notice Operations ───────────────────────────────────────

    /// Insert a notice and return the stored row.
    pub async fn insert_notice(&self, notice: &NewNotice) -> Result<Notice, AppError> {
        let now = time_utils::now();
        let stored = sqlx::query_as::<_, Notice>(
            "INSERT INTO notices
                (slug, title, description, search_text, priority, status, attachments,
                 image_url, publish_at, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(&notice.slug)
        .bind(&notice.title)
        .bind(&notice.description)
        .bind(search_text(&notice.title, &notice.description))
        .bind(notice.priority)
        .bind(notice.status)
        .bind(Json(&notice.attachments))
        .bind(&notice.image_url)
        .bind(notice.publish_at)
        .bind(notice.created_by)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(
            notice_id = stored.id,
            slug = %stored.slug,
            status = ?stored.status,
            "Inserted notice"
        );
        Ok(stored)
    }

    /// Get any notice (draft or published) by id.
    pub async fn get_notice(&self, notice_id: i64) -> Result<Option<Notice>, AppError> {
        Ok(
            sqlx::query_as::<_, Notice>("SELECT * FROM notices WHERE id = ?")
                .bind(notice_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// Get a notice by slug only if the public may see it at `now`.
    pub async fn get_visible_notice_by_slug(
        &self,
        slug: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Notice>, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM notices");
        NoticeFilter::public(now).push_where(&mut qb);
        qb.push(" AND slug = ").push_bind(slug.to_string());

        Ok(qb
            .build_query_as::<Notice>()
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Whether a slug is already in use.
    pub async fn slug_taken(&self, slug: &str) -> Result<bool, AppError> {
        let (taken,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM notices WHERE slug = ?)")
                .bind(slug)
                .fetch_one(&self.pool)
                .await?;
        Ok(taken)
    }

    /// Derive a slug from `title` that no stored notice uses yet.
    pub async fn unique_slug(&self, title: &str) -> Result<String, AppError> {
        let base = slug::slugify(title);
        for attempt in 1..=MAX_SLUG_ATTEMPTS {
            let candidate = slug::with_suffix(&base, attempt);
            if !self.slug_taken(&candidate).await? {
                return Ok(candidate);
            }
        }

        Ok(random_slug(&base))
    }

    /// Insert a notice under a fresh slug derived from `title`.
    ///
    /// A concurrent create can claim the chosen slug between the lookup and
    /// the insert; the unique index then rejects ours and another is picked.
    pub async fn insert_notice_with_unique_slug(
        &self,
        title: &str,
        mut notice: NewNotice,
    ) -> Result<Notice, AppError> {
        for _ in 0..MAX_INSERT_ATTEMPTS {
            notice.slug = self.unique_slug(title).await?;
            match self.insert_notice(&notice).await {
                Err(AppError::Conflict(_)) => {
                    tracing::debug!(slug = %notice.slug, "Slug taken concurrently, retrying");
                }
                result => return result,
            }
        }

        notice.slug = random_slug(&slug::slugify(title));
        self.insert_notice(&notice).await
    }

    /// Fill `search_text` for rows stored before the column existed.
    pub(super) async fn backfill_search_text(&self) -> Result<u64, AppError> {
        let rows: Vec<(i64, String, String)> = sqlx::query_as(
            "SELECT id, title, description FROM notices WHERE search_text = ''",
        )
        .fetch_all(&self.pool)
        .await?;

        for (id, title, description) in &rows {
            sqlx::query("UPDATE notices SET search_text = ? WHERE id = ?")
                .bind(search_text(title, description))
                .bind(id)
                .execute(&self.pool)
                .await?;
        }
        Ok(rows.len() as u64)
    }

    /// Apply a partial update. Returns `None` if the notice does not exist.
    pub async fn update_notice(
        &self,
        notice_id: i64,
        changes: &NoticeChanges,
    ) -> Result<Option<Notice>, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE notices SET updated_at = ");
        qb.push_bind(time_utils::now());

        if let Some(title) = &changes.title {
            qb.push(", title = ").push_bind(title.clone());
        }
        if let Some(description) = &changes.description {
            qb.push(", description = ").push_bind(description.clone());
        }
        if let Some(priority) = changes.priority {
            qb.push(", priority = ").push_bind(priority);
        }
        if let Some(status) = changes.status {
            qb.push(", status = ").push_bind(status);
        }
        if let Some(attachments) = &changes.attachments {
            qb.push(", attachments = ").push_bind(Json(attachments.clone()));
        }
        if let Some(image_url) = &changes.image_url {
            qb.push(", image_url = ").push_bind(image_url.clone());
        }
        if let Some(publish_at) = changes.publish_at {
            qb.push(", publish_at = ").push_bind(publish_at);
        }

        qb.push(" WHERE id = ").push_bind(notice_id);
        qb.push(" RETURNING *");

        let mut tx = self.pool.begin().await?;
        let updated = qb.build_query_as::<Notice>().fetch_optional(&mut *tx).await?;
        if let Some(notice) = &updated {
            if changes.title.is_some() || changes.description.is_some() {
                sqlx::query("UPDATE notices SET search_text = ? WHERE id = ?")
                    .bind(search_text(&notice.title, &notice.description))
                    .bind(notice.id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await?;

        Ok(updated)
    }

    /// Delete a notice, returning the removed row so its files can be cleaned up.
    pub async fn delete_notice(&self, notice_id: i64) -> Result<Option<Notice>, AppError> {
        Ok(
            sqlx::query_as::<_, Notice>("DELETE FROM notices WHERE id = ? RETURNING *")
                .bind(notice_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// All notices matching `filter`, newest first.
    pub async fn all_notices(&self, filter: &NoticeFilter) -> Result<Vec<Notice>, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM notices");
        filter.push_where(&mut qb);
        qb.push(" ORDER BY COALESCE(publish_at, created_at) DESC, id DESC");

        Ok(qb.build_query_as::<Notice>().fetch_all(&self.pool).await?)
    }

    /// One window of notices matching `filter`, newest first.
    pub async fn list_notices(
        &self,
        filter: &NoticeFilter,
        window: NoticeSearch,
    ) -> Result<Vec<Notice>, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM notices");
        filter.push_where(&mut qb);
        qb.push(" ORDER BY COALESCE(publish_at, created_at) DESC, id DESC");
        qb.push(" LIMIT ").push_bind(window.limit);
        qb.push(" OFFSET ").push_bind(window.offset);

        Ok(qb.build_query_as::<Notice>().fetch_all(&self.pool).await?)
    }

    /// Number of notices matching `filter`.
    pub async fn count_notices(&self, filter: &NoticeFilter) -> Result<i64, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM notices");
        filter.push_where(&mut qb);

        let (count,): (i64,) = qb.build_query_as().fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Count a public view of a notice.
    pub async fn increment_view_count(&self, notice_id: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE notices SET view_count = view_count + 1 WHERE id = ?")
            .bind(notice_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ─── Aggregates ──────────────────────────────────────────────

    /// Sum of view counts over notices matching `filter`.
    pub async fn total_views(&self, filter: &NoticeFilter) -> Result<i64, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COALESCE(SUM(view_count), 0) FROM notices");
        filter.push_where(&mut qb);

        let (total,): (i64,) = qb.build_query_as().fetch_one(&self.pool).await?;
        Ok(total)
    }

    /// Most recent publish time among publicly visible notices.
    pub async fn latest_publish_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        let latest = self
            .list_notices(
                &NoticeFilter::public(now),
                NoticeSearch {
                    limit: 1,
                    offset: 0,
                },
            )
            .await?;
        Ok(latest.into_iter().next().and_then(|n| n.publish_at))
    }

    /// Notice counts per priority (all statuses).
    pub async fn count_by_priority(&self) -> Result<Vec<(Priority, i64)>, AppError> {
        Ok(sqlx::query_as::<_, (Priority, i64)>(
            "SELECT priority, COUNT(*) FROM notices GROUP BY priority",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    /// Most viewed notices, ties broken by id.
    pub async fn top_notices(&self, limit: i64) -> Result<Vec<TopNotice>, AppError> {
        Ok(sqlx::query_as::<_, TopNotice>(
            "SELECT id, slug, title, view_count FROM notices
             ORDER BY view_count DESC, id DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }
}
