// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notice model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::time_utils::format_utc_rfc3339;

/// Notice priority. Lower rank sorts first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type,
)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Sort rank within a notice group: high < medium < low.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// Publication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum NoticeStatus {
    #[default]
    Draft,
    Published,
}

/// File attached to a notice (usually produced by `POST /api/upload`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Attachment {
    pub url: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub size: u64,
}

/// Notice row stored in the `notices` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Notice {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: NoticeStatus,
    pub attachments: Json<Vec<Attachment>>,
    pub image_url: Option<String>,
    pub publish_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notice {
    /// URLs of files this notice references (attachments and cover image).
    pub fn file_urls(&self) -> Vec<String> {
        self.attachments
            .0
            .iter()
            .map(|a| a.url.clone())
            .chain(self.image_url.clone())
            .collect()
    }
}

/// Notice as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NoticeView {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: NoticeStatus,
    pub attachments: Vec<Attachment>,
    pub image_url: Option<String>,
    pub publish_at: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub view_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Notice> for NoticeView {
    fn from(notice: Notice) -> Self {
        Self {
            id: notice.id,
            slug: notice.slug,
            title: notice.title,
            description: notice.description,
            priority: notice.priority,
            status: notice.status,
            attachments: notice.attachments.0,
            image_url: notice.image_url,
            publish_at: notice.publish_at.map(format_utc_rfc3339),
            view_count: notice.view_count,
            created_at: format_utc_rfc3339(notice.created_at),
            updated_at: format_utc_rfc3339(notice.updated_at),
        }
    }
}

/// Fields written when creating a notice.
#[derive(Debug, Clone)]
pub struct NewNotice {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: NoticeStatus,
    pub attachments: Vec<Attachment>,
    pub image_url: Option<String>,
    pub publish_at: Option<DateTime<Utc>>,
    pub created_by: Option<i64>,
}

/// Partial update; `None` leaves a column untouched.
///
/// `image_url` and `publish_at` are doubly optional so they can be cleared.
#[derive(Debug, Clone, Default)]
pub struct NoticeChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<NoticeStatus>,
    pub attachments: Option<Vec<Attachment>>,
    pub image_url: Option<Option<String>>,
    pub publish_at: Option<Option<DateTime<Utc>>>,
}
