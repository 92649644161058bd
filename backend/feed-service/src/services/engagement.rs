//! Engagement score for feed ranking
//!
//! Algorithm:
//! - Weighted interactions: likes * 1 + comments * 3 + shares * 5
//! - Time decay: 0.95 ^ (age_hours / 24), i.e. 5% per day, continuous in hours
//! - Score = weighted interactions * decay
//!
//! The score depends on the evaluation instant, so it is recomputed for every
//! ranking request and never cached across requests.

use chrono::{DateTime, Utc};

use crate::models::PostSnapshot;

pub const LIKE_WEIGHT: f64 = 1.0;
pub const COMMENT_WEIGHT: f64 = 3.0;
pub const SHARE_WEIGHT: f64 = 5.0;

/// Multiplier applied once per elapsed decay period
pub const DAILY_DECAY: f64 = 0.95;

pub const DECAY_PERIOD_HOURS: f64 = 24.0;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Compute the decaying engagement score of a post
///
/// # Arguments
/// * `likes_count`, `comments_count`, `shares_count` - interaction counters
/// * `created_at` - post creation instant
/// * `now` - evaluation instant
///
/// # Returns
/// `raw * decay`, where a post created after `now` (clock skew) is scored as
/// if it were created at `now`.
pub fn compute_engagement_score(
    likes_count: u32,
    comments_count: u32,
    shares_count: u32,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    let raw = f64::from(likes_count) * LIKE_WEIGHT
        + f64::from(comments_count) * COMMENT_WEIGHT
        + f64::from(shares_count) * SHARE_WEIGHT;

    raw * decay_factor(age_hours(created_at, now))
}

/// Score a post snapshot at `now`
pub fn score_post(post: &PostSnapshot, now: DateTime<Utc>) -> f64 {
    compute_engagement_score(
        post.likes_count,
        post.comments_count,
        post.shares_count,
        post.created_at,
        now,
    )
}

/// Age in fractional hours, never negative
pub fn age_hours(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - created_at).num_milliseconds().max(0);
    millis as f64 / MILLIS_PER_HOUR
}

pub fn decay_factor(hours_old: f64) -> f64 {
    DAILY_DECAY.powf(hours_old.max(0.0) / DECAY_PERIOD_HOURS)
}
