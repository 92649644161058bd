//! Background jobs
//!
//! - score_refresher: rewrites the stored engagement score snapshot that
//!   the candidate query uses to pick the engagement window

pub mod score_refresher;
