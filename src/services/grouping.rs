// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Date-bucketed notice listing.
//!
//! The public board shows notices in groups, one per calendar publish date.
//! Within a group the most urgent notices come first; today's group is pinned
//! to the top and older groups follow newest first. Pagination counts groups,
//! not notices, so a busy day is never split across pages.

use crate::models::{Notice, NoticeView};
use crate::time_utils::local_date;
use chrono::{FixedOffset, NaiveDate};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Notices sharing one calendar publish date.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NoticeGroup {
    /// `YYYY-MM-DD` in the site timezone
    pub date: String,
    pub is_today: bool,
    pub count: usize,
    pub notices: Vec<NoticeView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GroupPagination {
    pub page: u32,
    /// Groups per page
    pub per_page: u32,
    pub total_groups: usize,
    pub total_notices: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

/// One page of notice groups.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GroupPage {
    pub groups: Vec<NoticeGroup>,
    pub pagination: GroupPagination,
}

/// Order inside a group: priority rank, then most recent, then newest id.
fn compare_within_group(a: &Notice, b: &Notice) -> Ordering {
    a.priority
        .rank()
        .cmp(&b.priority.rank())
        .then_with(|| b.publish_at.cmp(&a.publish_at))
        .then_with(|| b.id.cmp(&a.id))
}

/// Order of groups: today first, then dates descending.
fn compare_dates(a: NaiveDate, b: NaiveDate, today: NaiveDate) -> Ordering {
    (b == today).cmp(&(a == today)).then_with(|| b.cmp(&a))
}

/// Bucket notices by publish date (in `offset`) and order groups and members.
///
/// Notices without a publish time cannot be placed and are skipped.
pub fn group_notices(
    notices: Vec<Notice>,
    today: NaiveDate,
    offset: FixedOffset,
) -> Vec<NoticeGroup> {
    let mut buckets: BTreeMap<NaiveDate, Vec<Notice>> = BTreeMap::new();
    for notice in notices {
        if let Some(published) = notice.publish_at {
            buckets
                .entry(local_date(published, offset))
                .or_default()
                .push(notice);
        }
    }

    let mut dated: Vec<(NaiveDate, Vec<Notice>)> = buckets.into_iter().collect();
    dated.sort_by(|(a, _), (b, _)| compare_dates(*a, *b, today));

    dated
        .into_iter()
        .map(|(date, mut members)| {
            members.sort_by(compare_within_group);
            NoticeGroup {
                date: date.to_string(),
                is_today: date == today,
                count: members.len(),
                notices: members.into_iter().map(NoticeView::from).collect(),
            }
        })
        .collect()
}

/// Slice out page `page` (1-indexed) of `per_page` groups.
///
/// Pages past the end are empty but still report the totals.
pub fn paginate_groups(groups: Vec<NoticeGroup>, page: u32, per_page: u32) -> GroupPage {
    let per_page = per_page.max(1);
    let page = page.max(1);

    let total_groups = groups.len();
    let total_notices = groups.iter().map(|g| g.count).sum();
    let total_pages = total_groups.div_ceil(per_page as usize);

    let start = (page as usize - 1).saturating_mul(per_page as usize);
    let page_groups: Vec<NoticeGroup> = groups
        .into_iter()
        .skip(start)
        .take(per_page as usize)
        .collect();

    GroupPage {
        groups: page_groups,
        pagination: GroupPagination {
            page,
            per_page,
            total_groups,
            total_notices,
            total_pages,
            has_next: (page as usize) < total_pages,
            has_prev: page > 1,
        },
    }
}
