//! Shared fixtures: in-memory post store and follow graph

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use feed_service::config::FeedConfig;
use feed_service::db::{AudienceResolver, CandidateQuery, CandidateSource, PostStore};
use feed_service::models::{FeedOrdering, PostSnapshot, PostVisibility};
use feed_service::services::ViewerScope;
use feed_service::{FeedService, Result};

/// Fixed reference instant so recency ordering is deterministic
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub struct PostFixture {
    post: PostSnapshot,
}

impl PostFixture {
    pub fn by(pet_id: Uuid) -> Self {
        Self {
            post: PostSnapshot {
                id: Uuid::new_v4(),
                pet_id,
                likes_count: 0,
                comments_count: 0,
                shares_count: 0,
                created_at: epoch(),
                visibility: PostVisibility::Public,
                is_hidden: false,
                deleted_at: None,
            },
        }
    }

    pub fn minutes_ago(mut self, minutes: i64) -> Self {
        self.post.created_at = epoch() - Duration::minutes(minutes);
        self
    }

    pub fn likes(mut self, likes: u32) -> Self {
        self.post.likes_count = likes;
        self
    }

    pub fn visibility(mut self, visibility: PostVisibility) -> Self {
        self.post.visibility = visibility;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.post.is_hidden = true;
        self
    }

    pub fn deleted(mut self) -> Self {
        self.post.deleted_at = Some(epoch());
        self
    }

    pub fn build(self) -> PostSnapshot {
        self.post
    }
}

/// Applies the same filters as the SQL candidate and count queries
#[derive(Default)]
pub struct InMemoryPostStore {
    posts: Mutex<Vec<(PostSnapshot, String)>>,
}

impl InMemoryPostStore {
    pub fn new(posts: Vec<PostSnapshot>) -> Self {
        Self::with_captions(posts.into_iter().map(|p| (p, String::new())).collect())
    }

    pub fn with_captions(posts: Vec<(PostSnapshot, String)>) -> Self {
        Self {
            posts: Mutex::new(posts),
        }
    }

    fn matching(&self, query: &CandidateQuery) -> Vec<PostSnapshot> {
        let posts = self.posts.lock().unwrap();
        let mut candidates: Vec<PostSnapshot> = posts
            .iter()
            .filter(|(p, _)| p.deleted_at.is_none() && !p.is_hidden)
            .filter(|(p, caption)| match &query.source {
                CandidateSource::Global => true,
                CandidateSource::Authors(ids) => ids.contains(&p.pet_id),
                CandidateSource::Tag(tag) => caption
                    .to_lowercase()
                    .contains(&format!("#{}", tag.to_lowercase())),
            })
            .filter(|(p, _)| query.audience.admits(p))
            .filter(|(p, _)| match (query.ordering, query.after) {
                (FeedOrdering::Recency, Some(after)) => after.precedes(p),
                _ => true,
            })
            .map(|(p, _)| p.clone())
            .collect();

        candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        candidates
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn load_candidates(&self, query: &CandidateQuery) -> Result<Vec<PostSnapshot>> {
        let mut candidates = self.matching(query);
        candidates.truncate(query.limit);
        Ok(candidates)
    }

    async fn count_candidates(&self, query: &CandidateQuery) -> Result<usize> {
        Ok(self.matching(query).len())
    }
}

/// Viewer -> owned pets, pet -> followed pets
#[derive(Default)]
pub struct InMemoryFollowGraph {
    owners: HashMap<Uuid, Vec<Uuid>>,
    follows: HashMap<Uuid, Vec<Uuid>>,
}

impl InMemoryFollowGraph {
    pub fn owns(mut self, viewer: Uuid, pet: Uuid) -> Self {
        self.owners.entry(viewer).or_default().push(pet);
        self
    }

    pub fn follows(mut self, follower_pet: Uuid, followed_pet: Uuid) -> Self {
        self.follows.entry(follower_pet).or_default().push(followed_pet);
        self
    }
}

#[async_trait]
impl AudienceResolver for InMemoryFollowGraph {
    async fn resolve(&self, viewer_id: Uuid) -> Result<ViewerScope> {
        let owned = self.owners.get(&viewer_id).cloned().unwrap_or_default();
        let followed: Vec<Uuid> = owned
            .iter()
            .filter_map(|pet| self.follows.get(pet))
            .flatten()
            .copied()
            .collect();

        Ok(ViewerScope::new(viewer_id)
            .with_owned(owned)
            .with_followed(followed))
    }
}

pub fn build_feed(posts: Vec<PostSnapshot>, graph: InMemoryFollowGraph) -> Arc<FeedService> {
    Arc::new(FeedService::new(
        Arc::new(InMemoryPostStore::new(posts)),
        Arc::new(graph),
        FeedConfig::default(),
    ))
}

pub fn build_captioned_feed(posts: Vec<(PostSnapshot, &str)>) -> Arc<FeedService> {
    let posts = posts
        .into_iter()
        .map(|(post, caption)| (post, caption.to_string()))
        .collect();
    Arc::new(FeedService::new(
        Arc::new(InMemoryPostStore::with_captions(posts)),
        Arc::new(InMemoryFollowGraph::default()),
        FeedConfig::default(),
    ))
}
