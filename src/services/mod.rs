// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod analytics;
pub mod grouping;
pub mod password;
pub mod sanitize;
pub mod slug;
pub mod upload;

pub use analytics::VisitorHasher;
pub use grouping::{group_notices, paginate_groups, GroupPage, NoticeGroup};
pub use upload::{StoredFile, UploadStore};
