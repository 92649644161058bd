/// Feed Service Library
///
/// Ranks and pages the pet social feed: explore (engagement ranked), home
/// (posts from owned and followed pets) and per-pet timelines.
///
/// # Modules
///
/// - `services`: engagement scoring, feed selection and orchestration
/// - `db`: PostgreSQL read path for posts and the viewer's follow graph
/// - `handlers`: HTTP endpoints
/// - `middleware`: viewer identity extraction
/// - `jobs`: background score snapshot refresher
/// - `metrics`: Prometheus collectors
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

pub use services::{
    compute_engagement_score, select_feed, CountMode, FeedAudience, FeedOrdering, FeedPage,
    FeedService, PageRequest,
};
