use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Who may see a post, as stored on the post row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostVisibility {
    Public,
    Followers,
    Private,
}

impl PostVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Followers => "followers",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for PostVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostVisibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "followers" => Ok(Self::Followers),
            "private" => Ok(Self::Private),
            other => Err(format!("unknown post visibility: {}", other)),
        }
    }
}

/// Feed ordering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedOrdering {
    /// Decaying engagement score, highest first
    Engagement,
    /// Newest first
    Recency,
}

impl FeedOrdering {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Engagement => "engagement",
            Self::Recency => "recency",
        }
    }
}

impl fmt::Display for FeedOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only snapshot of the post fields the feed needs.
///
/// Counters are owned by the post store and may move between two reads;
/// a snapshot is only valid for the request that loaded it.
#[derive(Debug, Clone, PartialEq)]
pub struct PostSnapshot {
    pub id: Uuid,
    /// Author pet
    pub pet_id: Uuid,
    pub likes_count: u32,
    pub comments_count: u32,
    pub shares_count: u32,
    pub created_at: DateTime<Utc>,
    pub visibility: PostVisibility,
    pub is_hidden: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Post as returned to feed clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPostView {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub likes_count: u32,
    pub comments_count: u32,
    pub shares_count: u32,
    pub created_at: DateTime<Utc>,
    pub visibility: PostVisibility,
    pub engagement_score: f64,
}

/// Feed response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub posts: Vec<FeedPostView>,
    pub cursor: Option<String>,
    pub has_more: bool,
    /// Only present when the client asked for a total
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
}
