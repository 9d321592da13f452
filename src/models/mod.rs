// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.
//!
//! Row types derive `sqlx::FromRow` and map one-to-one onto tables; the
//! `*View` types are the shapes returned over the API.

pub mod notice;
pub mod session;
pub mod stats;
pub mod user;

pub use notice::{Attachment, NewNotice, Notice, NoticeChanges, NoticeStatus, NoticeView, Priority};
pub use session::{NewSession, UserSession};
pub use stats::{AdminStats, DailyVisitors, SiteInfo, TopNotice};
pub use user::{is_valid_username, Role, User, UserProfile};
