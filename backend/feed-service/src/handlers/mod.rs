/// HTTP handlers for feed endpoints
///
/// - `GET /api/v1/feed/explore`: public posts, engagement ranked by default
/// - `GET /api/v1/feed`: the viewer's home feed, newest first by default
/// - `GET /api/v1/feed/pets/{pet_id}`: one pet's posts
/// - `GET /api/v1/feed/tags/{tag}`: public posts mentioning `#tag`
pub mod feed;

use actix_web::web;

pub use feed::{get_explore_feed, get_home_feed, get_pet_feed, get_tag_feed, FeedHandlerState};

use crate::middleware::ViewerIdentity;

/// Mount the feed routes under `/api/v1/feed`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/feed")
            .wrap(ViewerIdentity)
            .service(get_explore_feed)
            .service(get_pet_feed)
            .service(get_tag_feed)
            .service(get_home_feed),
    );
}
