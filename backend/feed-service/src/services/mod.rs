//! Service layer for feed-service
//!
//! - engagement: time-decayed engagement score
//! - audience: post visibility against the viewer's pets
//! - cursor: opaque pagination cursors
//! - feed_selector: filter, order and page a candidate set
//! - feed: candidate loading and feed assembly

pub mod audience;
pub mod cursor;
pub mod engagement;
pub mod feed;
pub mod feed_selector;

pub use crate::models::FeedOrdering;
pub use audience::{FeedAudience, ViewerScope};
pub use cursor::{FeedCursor, FeedKeyset};
pub use engagement::compute_engagement_score;
pub use feed::{FeedKind, FeedRequest, FeedService};
pub use feed_selector::{select_feed, CountMode, FeedPage, PageBounds, PageRequest, RankedPost};
