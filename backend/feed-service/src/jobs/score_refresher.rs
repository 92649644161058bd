//! Score Refresher Background Job
//!
//! Engagement scores decay with time, so the `posts.engagement_score`
//! column goes stale as soon as it is written. Feed requests always re-rank
//! with fresh scores; the stored value only decides which posts enter the
//! candidate window. This job keeps that hint close to reality for posts
//! inside the refresh window. Older posts keep their last snapshot, which
//! by then is negligible.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::PgPool;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use uuid::Uuid;

use crate::config::ScoreRefreshConfig;
use crate::db::post_repo::{fetch_score_inputs, write_score_snapshots, ScoreInputRow};
use crate::metrics::feed::record_score_refresh;
use crate::services::compute_engagement_score;

/// Delay before the first cycle so startup traffic gets the pool first
const INITIAL_DELAY: Duration = Duration::from_secs(10);

/// Start the score refresher background job
pub async fn start_score_refresher(db: PgPool, config: ScoreRefreshConfig) {
    if !config.enabled {
        tracing::info!("Score refresher disabled by configuration");
        return;
    }

    let interval = Duration::from_secs(config.interval_secs.max(1));

    tracing::info!(
        interval_secs = interval.as_secs(),
        window_hours = config.window_hours,
        batch_size = config.batch_size,
        "Starting score refresher background job"
    );

    sleep(INITIAL_DELAY).await;

    loop {
        let cycle_start = Instant::now();

        match run_refresh_cycle(&db, &config, Utc::now()).await {
            Ok(updated) => {
                record_score_refresh("success", updated);
                tracing::info!(
                    posts_updated = updated,
                    duration_ms = cycle_start.elapsed().as_millis(),
                    "Score refresh cycle completed"
                );
            }
            Err(e) => {
                record_score_refresh("error", 0);
                tracing::warn!(
                    error = %e,
                    duration_ms = cycle_start.elapsed().as_millis(),
                    "Score refresh cycle failed"
                );
            }
        }

        sleep(interval).await;
    }
}

/// Rescore every live post created inside the window, one id-ordered batch
/// at a time. All posts in a cycle are scored against the same `now`.
pub async fn run_refresh_cycle(
    db: &PgPool,
    config: &ScoreRefreshConfig,
    now: DateTime<Utc>,
) -> Result<usize, sqlx::Error> {
    let since = window_start(now, config.window_hours);
    let batch_size = i64::try_from(config.batch_size.max(1)).unwrap_or(i64::MAX);

    let mut after_id: Option<Uuid> = None;
    let mut updated = 0usize;

    loop {
        let rows = fetch_score_inputs(db, since, after_id, batch_size).await?;
        if rows.is_empty() {
            break;
        }

        after_id = rows.last().map(|r| r.id);
        let fetched = rows.len();

        let (ids, scores) = score_batch(&rows, now);
        let written = write_score_snapshots(db, &ids, &scores).await?;
        updated += usize::try_from(written).unwrap_or(usize::MAX);

        tracing::debug!(batch = fetched, written, "Score batch written");

        if (fetched as i64) < batch_size {
            break;
        }
    }

    Ok(updated)
}

fn window_start(now: DateTime<Utc>, window_hours: i64) -> DateTime<Utc> {
    now - ChronoDuration::hours(window_hours.max(1))
}

/// Score a batch at `now`, returning parallel id and score columns
fn score_batch(rows: &[ScoreInputRow], now: DateTime<Utc>) -> (Vec<Uuid>, Vec<f64>) {
    rows.iter()
        .map(|row| {
            let (likes, comments, shares) = row.counters();
            (
                row.id,
                compute_engagement_score(likes, comments, shares, row.created_at, now),
            )
        })
        .unzip()
}
