use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::middleware::ViewerId;
use crate::models::{FeedOrdering, FeedPostView, FeedResponse};
use crate::services::{
    CountMode, FeedCursor, FeedKind, FeedPage, FeedRequest, FeedService, PageBounds, PageRequest,
    RankedPost,
};

/// Raw query string parameters.
///
/// Numeric values are parsed leniently: anything that is not an integer is
/// treated as absent and falls back to the default.
#[derive(Debug, Default, Deserialize)]
pub struct FeedQueryParams {
    pub ordering: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub page: Option<String>,
    pub cursor: Option<String>,
    pub include_total: Option<String>,
}

impl FeedQueryParams {
    fn ordering(&self, kind: &FeedKind) -> Result<FeedOrdering> {
        match self.ordering.as_deref().map(str::trim) {
            None | Some("") => Ok(kind.default_ordering()),
            Some(value) if value.eq_ignore_ascii_case("engagement") => {
                Ok(FeedOrdering::Engagement)
            }
            Some(value) if value.eq_ignore_ascii_case("recency") => Ok(FeedOrdering::Recency),
            Some(value) => Err(AppError::BadRequest(format!(
                "Invalid ordering '{}'. Must be 'engagement' or 'recency'",
                value
            ))),
        }
    }

    fn count_mode(&self) -> CountMode {
        match self.include_total.as_deref().map(str::trim) {
            Some(v) if v == "1" || v.eq_ignore_ascii_case("true") => CountMode::Exact,
            _ => CountMode::Skip,
        }
    }

    /// Page position: a cursor wins over `page`, which wins over `offset`
    fn page_request(&self, ordering: FeedOrdering, bounds: PageBounds) -> PageRequest {
        let limit = lenient_int(&self.limit);
        let base = match lenient_int(&self.page) {
            Some(page) => PageRequest::from_page(Some(page), limit, bounds),
            None => PageRequest::clamped(lenient_int(&self.offset), limit, bounds),
        };

        let cursor = self
            .cursor
            .as_deref()
            .filter(|c| !c.is_empty())
            .and_then(|c| {
                let decoded = FeedCursor::decode(c);
                if decoded.is_none() {
                    warn!(cursor = c, "Ignoring undecodable cursor");
                }
                decoded
            });

        base.resume(cursor, ordering)
    }
}

fn lenient_int(value: &Option<String>) -> Option<i64> {
    value.as_deref().and_then(|v| v.trim().parse::<i64>().ok())
}

pub struct FeedHandlerState {
    pub feed: Arc<FeedService>,
    pub bounds: PageBounds,
}

impl FeedHandlerState {
    pub fn new(feed: Arc<FeedService>) -> Self {
        let bounds = PageBounds::from(feed.config());
        Self { feed, bounds }
    }
}

/// GET /api/v1/feed/explore
#[get("/explore")]
pub async fn get_explore_feed(
    query: web::Query<FeedQueryParams>,
    viewer: Option<ViewerId>,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    serve(FeedKind::Explore, &query, viewer, &state).await
}

/// GET /api/v1/feed
#[get("")]
pub async fn get_home_feed(
    query: web::Query<FeedQueryParams>,
    viewer: Option<ViewerId>,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    serve(FeedKind::Home, &query, viewer, &state).await
}

/// GET /api/v1/feed/pets/{pet_id}
#[get("/pets/{pet_id}")]
pub async fn get_pet_feed(
    path: web::Path<String>,
    query: web::Query<FeedQueryParams>,
    viewer: Option<ViewerId>,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    let pet_id = Uuid::parse_str(path.as_str())
        .map_err(|_| AppError::BadRequest(format!("Invalid pet id '{}'", path.as_str())))?;
    serve(FeedKind::Pet(pet_id), &query, viewer, &state).await
}

/// GET /api/v1/feed/tags/{tag}
#[get("/tags/{tag}")]
pub async fn get_tag_feed(
    path: web::Path<String>,
    query: web::Query<FeedQueryParams>,
    viewer: Option<ViewerId>,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    let tag = normalize_tag(path.as_str())
        .ok_or_else(|| AppError::BadRequest("Hashtag must not be empty".into()))?;
    serve(FeedKind::Tag(tag), &query, viewer, &state).await
}

/// Strip surrounding whitespace and one leading `#`
fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim();
    let tag = tag.strip_prefix('#').unwrap_or(tag).trim();
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_string())
    }
}

async fn serve(
    kind: FeedKind,
    query: &FeedQueryParams,
    viewer: Option<ViewerId>,
    state: &FeedHandlerState,
) -> Result<HttpResponse> {
    let ordering = query.ordering(&kind)?;
    let label = kind.label();
    let request = FeedRequest {
        kind,
        viewer_id: viewer.map(|v| v.0),
        ordering,
        page: query.page_request(ordering, state.bounds),
        count: query.count_mode(),
    };

    debug!(
        feed = label,
        ordering = %ordering,
        offset = request.page.offset,
        limit = request.page.limit,
        keyset = request.page.after.is_some(),
        "Serving feed"
    );

    let page = state.feed.get_feed(request, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(to_response(page)))
}

fn to_view(ranked: RankedPost) -> FeedPostView {
    let RankedPost {
        post,
        engagement_score,
    } = ranked;
    FeedPostView {
        id: post.id,
        pet_id: post.pet_id,
        likes_count: post.likes_count,
        comments_count: post.comments_count,
        shares_count: post.shares_count,
        created_at: post.created_at,
        visibility: post.visibility,
        engagement_score,
    }
}

pub fn to_response(page: FeedPage) -> FeedResponse {
    FeedResponse {
        cursor: page.next_cursor.map(|c| c.encode()),
        has_more: page.has_more,
        total_count: page.total_count,
        posts: page.posts.into_iter().map(to_view).collect(),
    }
}
