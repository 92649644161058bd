use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, HistogramVec,
    IntCounterVec, IntGauge,
};
use std::time::Duration;

use crate::services::feed_selector::FilterStats;

lazy_static! {
    /// Duration of feed requests by feed kind and ordering.
    pub static ref FEED_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "feed_request_duration_seconds",
        "Feed request duration segmented by feed kind and ordering",
        &["feed", "ordering"]
    )
    .expect("failed to register feed_request_duration_seconds");

    /// Total feed requests served.
    pub static ref FEED_REQUEST_TOTAL: IntCounterVec = register_int_counter_vec!(
        "feed_request_total",
        "Total feed requests segmented by feed kind and ordering",
        &["feed", "ordering"]
    )
    .expect("failed to register feed_request_total");

    /// Candidates read from the store per request.
    pub static ref FEED_CANDIDATE_COUNT: HistogramVec = register_histogram_vec!(
        "feed_candidate_count",
        "Number of feed candidates evaluated segmented by feed kind",
        &["feed"],
        vec![0.0, 10.0, 50.0, 100.0, 250.0, 500.0, 1000.0]
    )
    .expect("failed to register feed_candidate_count");

    /// Candidates dropped by the selector.
    pub static ref FEED_FILTERED_POSTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "feed_filtered_posts_total",
        "Candidates removed before ranking segmented by reason",
        &["reason"]
    )
    .expect("failed to register feed_filtered_posts_total");

    /// Score snapshot refresh cycles (success/error).
    pub static ref SCORE_REFRESH_TOTAL: IntCounterVec = register_int_counter_vec!(
        "feed_score_refresh_total",
        "Engagement score snapshot refresh cycles segmented by result",
        &["result"]
    )
    .expect("failed to register feed_score_refresh_total");

    /// Posts updated in the last refresh cycle.
    pub static ref SCORE_REFRESH_UPDATED_POSTS: IntGauge = register_int_gauge!(
        "feed_score_refresh_updated_posts",
        "Posts whose engagement score snapshot was rewritten in the last cycle"
    )
    .expect("failed to register feed_score_refresh_updated_posts");
}

pub fn observe_feed_request(feed: &str, ordering: &str, candidates: usize, elapsed: Duration) {
    FEED_REQUEST_DURATION_SECONDS
        .with_label_values(&[feed, ordering])
        .observe(elapsed.as_secs_f64());
    FEED_REQUEST_TOTAL.with_label_values(&[feed, ordering]).inc();
    FEED_CANDIDATE_COUNT
        .with_label_values(&[feed])
        .observe(candidates as f64);
}

pub fn record_filtered(stats: &FilterStats) {
    for (reason, count) in [
        ("deleted", stats.deleted),
        ("hidden", stats.hidden),
        ("audience", stats.audience),
    ] {
        if count > 0 {
            FEED_FILTERED_POSTS_TOTAL
                .with_label_values(&[reason])
                .inc_by(count as u64);
        }
    }
}

pub fn record_score_refresh(result: &str, updated: usize) {
    SCORE_REFRESH_TOTAL.with_label_values(&[result]).inc();
    if result == "success" {
        SCORE_REFRESH_UPDATED_POSTS.set(updated as i64);
    }
}
