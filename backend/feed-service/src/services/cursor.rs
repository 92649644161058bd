use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{FeedOrdering, PostSnapshot};

/// Position of a post in (created_at desc, id asc) order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedKeyset {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

impl FeedKeyset {
    pub fn of(post: &PostSnapshot) -> Self {
        Self {
            created_at: post.created_at,
            id: post.id,
        }
    }

    /// True when `post` comes strictly after this position
    pub fn precedes(&self, post: &PostSnapshot) -> bool {
        post.created_at < self.created_at
            || (post.created_at == self.created_at && post.id > self.id)
    }
}

/// Opaque pagination cursor handed to clients.
///
/// Wire format is base64 of either `"<offset>"` or
/// `"<created_at_micros>:<post_id>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedCursor {
    Offset(usize),
    Keyset(FeedKeyset),
}

impl FeedCursor {
    pub fn encode(&self) -> String {
        let raw = match self {
            FeedCursor::Offset(offset) => offset.to_string(),
            FeedCursor::Keyset(keyset) => {
                format!("{}:{}", keyset.created_at.timestamp_micros(), keyset.id)
            }
        };
        general_purpose::STANDARD.encode(raw)
    }

    /// Returns `None` for anything that is not a cursor this service issued.
    pub fn decode(cursor: &str) -> Option<Self> {
        let decoded = general_purpose::STANDARD.decode(cursor.trim()).ok()?;
        let raw = String::from_utf8(decoded).ok()?;

        match raw.split_once(':') {
            Some((micros, post_id)) => {
                let micros = micros.parse::<i64>().ok()?;
                let created_at = DateTime::from_timestamp(
                    micros.div_euclid(1_000_000),
                    (micros.rem_euclid(1_000_000) * 1_000) as u32,
                )?;
                let id = Uuid::parse_str(post_id).ok()?;
                Some(FeedCursor::Keyset(FeedKeyset { created_at, id }))
            }
            None => raw.parse::<usize>().ok().map(FeedCursor::Offset),
        }
    }

    /// Cursor kind a given ordering resumes from.
    ///
    /// Engagement scores drift with time, so only recency feeds get keysets.
    pub fn next_for(ordering: FeedOrdering, offset: usize, last: Option<&PostSnapshot>) -> Self {
        match (ordering, last) {
            (FeedOrdering::Recency, Some(post)) => FeedCursor::Keyset(FeedKeyset::of(post)),
            _ => FeedCursor::Offset(offset),
        }
    }
}
