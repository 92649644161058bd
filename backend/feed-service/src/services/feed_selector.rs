//! Feed selection: filter, order, paginate
//!
//! Pure over a candidate snapshot. Eligibility requires a live, unhidden post
//! the audience may see. Ordering is either the engagement score (recomputed
//! at `now`) or recency; ties always fall back to `created_at` desc, then
//! `id` asc, so the same inputs always produce the same page.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use super::audience::FeedAudience;
use super::cursor::{FeedCursor, FeedKeyset};
use super::engagement::score_post;
use crate::config::FeedConfig;
use crate::models::{FeedOrdering, PostSnapshot};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Page size limits applied when clamping client input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for PageBounds {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_SIZE,
            max_limit: MAX_PAGE_SIZE,
        }
    }
}

impl From<&FeedConfig> for PageBounds {
    fn from(config: &FeedConfig) -> Self {
        let max_limit = config.max_page_size.max(1);
        Self {
            default_limit: config.default_page_size.clamp(1, max_limit),
            max_limit,
        }
    }
}

/// Already-clamped page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
    /// Resume strictly after this position (recency feeds only)
    pub after: Option<FeedKeyset>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
            after: None,
        }
    }
}

impl PageRequest {
    /// Clamp raw offset/limit input.
    ///
    /// Missing or non-positive limits use the default, oversized limits use
    /// the cap, negative offsets start at zero.
    pub fn clamped(offset: Option<i64>, limit: Option<i64>, bounds: PageBounds) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => usize::try_from(l)
                .unwrap_or(bounds.max_limit)
                .min(bounds.max_limit),
            _ => bounds.default_limit,
        };
        let offset = offset
            .filter(|o| *o > 0)
            .map(|o| usize::try_from(o).unwrap_or(usize::MAX))
            .unwrap_or(0);

        Self {
            offset,
            limit,
            after: None,
        }
    }

    /// 1-based page number variant; pages below 1 mean the first page
    pub fn from_page(page: Option<i64>, limit: Option<i64>, bounds: PageBounds) -> Self {
        let mut request = Self::clamped(None, limit, bounds);
        let page = page.filter(|p| *p > 1).unwrap_or(1);
        let page_index = usize::try_from(page - 1).unwrap_or(usize::MAX);
        request.offset = page_index.saturating_mul(request.limit);
        request
    }

    /// Apply a client cursor. A cursor of the wrong kind for `ordering` is
    /// ignored and the feed starts from the top.
    pub fn resume(mut self, cursor: Option<FeedCursor>, ordering: FeedOrdering) -> Self {
        match (cursor, ordering) {
            (Some(FeedCursor::Offset(offset)), _) => {
                self.offset = offset;
                self.after = None;
            }
            (Some(FeedCursor::Keyset(keyset)), FeedOrdering::Recency) => {
                self.offset = 0;
                self.after = Some(keyset);
            }
            (Some(FeedCursor::Keyset(_)), FeedOrdering::Engagement) | (None, _) => {}
        }
        self
    }
}

/// Whether the caller wants a total count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountMode {
    Exact,
    #[default]
    Skip,
}

/// A post together with the score it was ranked with
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPost {
    pub post: PostSnapshot,
    pub engagement_score: f64,
}

/// Why candidates were dropped before ranking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub deleted: usize,
    pub hidden: usize,
    pub audience: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    pub posts: Vec<RankedPost>,
    pub has_more: bool,
    /// Eligible posts after the keyset position, ignoring offset
    pub total_count: Option<usize>,
    pub next_cursor: Option<FeedCursor>,
    pub filtered: FilterStats,
}

impl FeedPage {
    pub fn empty(count: CountMode) -> Self {
        Self {
            posts: Vec::new(),
            has_more: false,
            total_count: match count {
                CountMode::Exact => Some(0),
                CountMode::Skip => None,
            },
            next_cursor: None,
            filtered: FilterStats::default(),
        }
    }
}

/// Filter, order and paginate a candidate set
///
/// # Arguments
/// * `candidates` - posts read from the store, in any order
/// * `audience` - who the feed is for
/// * `ordering` - engagement or recency
/// * `page` - clamped page request
/// * `count` - whether to report `total_count`
/// * `now` - evaluation instant for score decay
pub fn select_feed(
    candidates: Vec<PostSnapshot>,
    audience: &FeedAudience,
    ordering: FeedOrdering,
    page: &PageRequest,
    count: CountMode,
    now: DateTime<Utc>,
) -> FeedPage {
    let mut filtered = FilterStats::default();

    let mut ranked: Vec<RankedPost> = candidates
        .into_iter()
        .filter(|post| {
            if post.deleted_at.is_some() {
                filtered.deleted += 1;
                false
            } else if post.is_hidden {
                filtered.hidden += 1;
                false
            } else if !audience.admits(post) {
                filtered.audience += 1;
                false
            } else {
                true
            }
        })
        .filter(|post| page.after.map_or(true, |after| after.precedes(post)))
        .map(|post| {
            let engagement_score = score_post(&post, now);
            RankedPost {
                post,
                engagement_score,
            }
        })
        .collect();

    ranked.sort_by(|a, b| compare_ranked(ordering, a, b));

    let remaining = ranked.len();
    let start = page.offset.min(remaining);
    let end = start.saturating_add(page.limit).min(remaining);
    let has_more = end < remaining;

    let posts: Vec<RankedPost> = ranked.drain(start..end).collect();

    let next_cursor = if has_more {
        Some(FeedCursor::next_for(
            ordering,
            page.offset.saturating_add(posts.len()),
            posts.last().map(|p| &p.post),
        ))
    } else {
        None
    };

    FeedPage {
        posts,
        has_more,
        total_count: match count {
            CountMode::Exact => Some(remaining),
            CountMode::Skip => None,
        },
        next_cursor,
        filtered,
    }
}

fn compare_ranked(ordering: FeedOrdering, a: &RankedPost, b: &RankedPost) -> Ordering {
    let primary = match ordering {
        FeedOrdering::Engagement => b.engagement_score.total_cmp(&a.engagement_score),
        FeedOrdering::Recency => Ordering::Equal,
    };

    primary
        .then_with(|| b.post.created_at.cmp(&a.post.created_at))
        .then_with(|| a.post.id.cmp(&b.post.id))
}
