use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use super::audience::FeedAudience;
use super::cursor::FeedCursor;
use super::feed_selector::{select_feed, CountMode, FeedPage, PageRequest};
use crate::config::FeedConfig;
use crate::db::{AudienceResolver, CandidateQuery, CandidateSource, PostStore};
use crate::error::{AppError, Result};
use crate::metrics::feed::{observe_feed_request, record_filtered};
use crate::models::FeedOrdering;

/// Which feed is being requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedKind {
    /// Public posts from everyone
    Explore,
    /// Posts from the viewer's own and followed pets
    Home,
    /// Posts of a single pet
    Pet(Uuid),
    /// Public posts mentioning a hashtag, without the leading `#`
    Tag(String),
}

impl FeedKind {
    pub fn default_ordering(&self) -> FeedOrdering {
        match self {
            FeedKind::Explore => FeedOrdering::Engagement,
            FeedKind::Home | FeedKind::Pet(_) | FeedKind::Tag(_) => FeedOrdering::Recency,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeedKind::Explore => "explore",
            FeedKind::Home => "home",
            FeedKind::Pet(_) => "pet",
            FeedKind::Tag(_) => "tag",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub kind: FeedKind,
    pub viewer_id: Option<Uuid>,
    pub ordering: FeedOrdering,
    pub page: PageRequest,
    pub count: CountMode,
}

/// Assembles feeds from the post store.
///
/// Holds no per-request state; every call reads a fresh candidate snapshot
/// and scores it at the request's `now`.
pub struct FeedService {
    posts: Arc<dyn PostStore>,
    audience: Arc<dyn AudienceResolver>,
    config: FeedConfig,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostStore>,
        audience: Arc<dyn AudienceResolver>,
        config: FeedConfig,
    ) -> Self {
        Self {
            posts,
            audience,
            config: config.sanitized(),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub async fn get_feed(&self, request: FeedRequest, now: DateTime<Utc>) -> Result<FeedPage> {
        let start = Instant::now();
        let (audience, source) = self.plan(&request).await?;

        let query = CandidateQuery {
            source,
            audience: audience.clone(),
            ordering: request.ordering,
            after: match request.ordering {
                FeedOrdering::Recency => request.page.after,
                FeedOrdering::Engagement => None,
            },
            limit: self.candidate_window(&request.page),
        };

        let candidates = self.posts.load_candidates(&query).await?;
        let candidate_count = candidates.len();
        let window_full = candidate_count >= query.limit;

        let mut page = select_feed(
            candidates,
            &audience,
            request.ordering,
            &request.page,
            request.count,
            now,
        );

        if window_full {
            self.extend_past_window(&query, &request, &mut page).await?;
        }

        record_filtered(&page.filtered);
        observe_feed_request(
            request.kind.label(),
            request.ordering.as_str(),
            candidate_count,
            start.elapsed(),
        );

        debug!(
            feed = request.kind.label(),
            ordering = %request.ordering,
            candidates = candidate_count,
            window_full,
            returned = page.posts.len(),
            has_more = page.has_more,
            "Feed assembled"
        );

        Ok(page)
    }

    /// Decide who the feed is for and which posts to read.
    async fn plan(&self, request: &FeedRequest) -> Result<(FeedAudience, CandidateSource)> {
        match &request.kind {
            FeedKind::Explore => Ok((FeedAudience::Public, CandidateSource::Global)),
            FeedKind::Home => {
                let viewer_id = request
                    .viewer_id
                    .ok_or_else(|| AppError::Unauthorized("Missing viewer identity".into()))?;
                let scope = self.audience.resolve(viewer_id).await?;
                let authors = scope.home_authors();

                if authors.is_empty() {
                    // No pets and no follows yet
                    info!(
                        viewer_id = %viewer_id,
                        "Viewer follows no pets, falling back to global feed"
                    );
                    return Ok((FeedAudience::Viewer(scope), CandidateSource::Global));
                }

                Ok((
                    FeedAudience::Viewer(scope),
                    CandidateSource::Authors(authors),
                ))
            }
            FeedKind::Pet(pet_id) => {
                let audience = match request.viewer_id {
                    Some(viewer_id) => FeedAudience::Viewer(self.audience.resolve(viewer_id).await?),
                    None => FeedAudience::Public,
                };
                Ok((audience, CandidateSource::Authors(vec![*pet_id])))
            }
            FeedKind::Tag(tag) => Ok((FeedAudience::Public, CandidateSource::Tag(tag.clone()))),
        }
    }

    /// Rows to read: at least the configured window, and always one past the
    /// end of the requested page so `has_more` is known.
    fn candidate_window(&self, page: &PageRequest) -> usize {
        page.offset
            .saturating_add(page.limit)
            .saturating_add(1)
            .max(self.config.candidate_window)
    }

    /// The store had more rows than were read. Keep paging open and count
    /// the whole feed instead of just the window.
    async fn extend_past_window(
        &self,
        query: &CandidateQuery,
        request: &FeedRequest,
        page: &mut FeedPage,
    ) -> Result<()> {
        if !page.has_more {
            if let Some(last) = page.posts.last() {
                page.has_more = true;
                page.next_cursor = Some(FeedCursor::next_for(
                    request.ordering,
                    request.page.offset.saturating_add(page.posts.len()),
                    Some(&last.post),
                ));
            }
        }

        if let Some(in_window) = page.total_count {
            let total = self.posts.count_candidates(query).await?;
            page.total_count = Some(total.max(in_window));
        }

        Ok(())
    }
}
