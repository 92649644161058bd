mod common;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use common::{build_captioned_feed, build_feed, InMemoryFollowGraph, PostFixture};
use feed_service::handlers::{self, FeedHandlerState};
use feed_service::middleware::VIEWER_HEADER;
use feed_service::models::{PostSnapshot, PostVisibility};
use feed_service::FeedService;

macro_rules! app {
    ($service:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(FeedHandlerState::new($service)))
                .configure(handlers::configure),
        )
        .await
    };
}

fn ids(body: &Value) -> Vec<String> {
    body["posts"]
        .as_array()
        .expect("posts array")
        .iter()
        .map(|p| p["id"].as_str().expect("post id").to_string())
        .collect()
}

fn id_of(post: &PostSnapshot) -> String {
    post.id.to_string()
}

#[actix_web::test]
async fn explore_ranks_public_posts_by_engagement() {
    let pet = Uuid::new_v4();
    let quiet = PostFixture::by(pet).likes(1).build();
    let popular = PostFixture::by(pet).likes(40).build();
    let private = PostFixture::by(pet)
        .likes(500)
        .visibility(PostVisibility::Private)
        .build();
    let hidden = PostFixture::by(pet).likes(300).hidden().build();
    let deleted = PostFixture::by(pet).likes(200).deleted().build();

    let service = build_feed(
        vec![quiet.clone(), popular.clone(), private, hidden, deleted],
        InMemoryFollowGraph::default(),
    );
    let app = app!(service);

    let req = test::TestRequest::get()
        .uri("/api/v1/feed/explore")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(ids(&body), vec![id_of(&popular), id_of(&quiet)]);
    assert_eq!(body["hasMore"], false);
    assert!(body["cursor"].is_null());
    assert!(body.get("totalCount").is_none());
    assert_eq!(body["posts"][0]["likesCount"], 40);
    assert_eq!(body["posts"][0]["petId"], pet.to_string());
}

#[actix_web::test]
async fn explore_pages_with_cursor_without_gaps() {
    let pet = Uuid::new_v4();
    let posts: Vec<PostSnapshot> = (0..5)
        .map(|i| PostFixture::by(pet).likes(10 * (i + 1)).build())
        .collect();
    let app = app!(build_feed(posts.clone(), InMemoryFollowGraph::default()));

    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let uri = match &cursor {
            Some(c) => format!("/api/v1/feed/explore?limit=2&cursor={}", urlencode(c)),
            None => "/api/v1/feed/explore?limit=2".to_string(),
        };
        let req = test::TestRequest::get().uri(&uri).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        seen.extend(ids(&body));

        if body["hasMore"] == true {
            cursor = body["cursor"].as_str().map(str::to_string);
            assert!(cursor.is_some());
        } else {
            assert!(body["cursor"].is_null());
            break;
        }
    }

    let mut expected = posts.clone();
    expected.sort_by(|a, b| b.likes_count.cmp(&a.likes_count));
    assert_eq!(seen, expected.iter().map(id_of).collect::<Vec<_>>());
}

#[actix_web::test]
async fn include_total_reports_eligible_posts() {
    let pet = Uuid::new_v4();
    let posts = vec![
        PostFixture::by(pet).build(),
        PostFixture::by(pet).build(),
        PostFixture::by(pet).build(),
    ];
    let app = app!(build_feed(posts, InMemoryFollowGraph::default()));

    let req = test::TestRequest::get()
        .uri("/api/v1/feed/explore?limit=1&include_total=true")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["totalCount"], 3);
    assert_eq!(body["posts"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["hasMore"], true);
}

#[actix_web::test]
async fn lenient_numeric_params_fall_back_to_defaults() {
    let pet = Uuid::new_v4();
    let posts: Vec<PostSnapshot> = (0..25).map(|_| PostFixture::by(pet).build()).collect();
    let app = app!(build_feed(posts, InMemoryFollowGraph::default()));

    let req = test::TestRequest::get()
        .uri("/api/v1/feed/explore?limit=abc&offset=-10")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["posts"].as_array().map(Vec::len), Some(20));
    assert_eq!(body["hasMore"], true);
}

#[actix_web::test]
async fn unknown_ordering_is_rejected() {
    let app = app!(build_feed(Vec::new(), InMemoryFollowGraph::default()));

    let req = test::TestRequest::get()
        .uri("/api/v1/feed/explore?ordering=trending")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 400);
}

#[actix_web::test]
async fn home_feed_requires_viewer() {
    let app = app!(build_feed(Vec::new(), InMemoryFollowGraph::default()));

    let req = test::TestRequest::get().uri("/api/v1/feed").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn malformed_viewer_header_is_rejected() {
    let app = app!(build_feed(Vec::new(), InMemoryFollowGraph::default()));

    let req = test::TestRequest::get()
        .uri("/api/v1/feed/explore")
        .insert_header((VIEWER_HEADER, "12345"))
        .to_request();
    let err = test::try_call_service(&app, req)
        .await
        .expect_err("malformed viewer header");
    assert_eq!(
        err.as_response_error().status_code(),
        StatusCode::UNAUTHORIZED
    );

    let body = actix_web::body::to_bytes(err.error_response().into_body())
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["code"], 401);
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn deep_explore_page_reports_more_beyond_candidate_window() {
    let pet = Uuid::new_v4();
    let posts: Vec<PostSnapshot> = (0..600)
        .map(|i| PostFixture::by(pet).minutes_ago(i).build())
        .collect();
    let app = app!(build_feed(posts, InMemoryFollowGraph::default()));

    let req = test::TestRequest::get()
        .uri("/api/v1/feed/explore?offset=480&limit=20&include_total=true")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["posts"].as_array().map(Vec::len), Some(20));
    assert_eq!(body["hasMore"], true);
    assert_eq!(body["totalCount"], 600);
    assert!(body["cursor"].is_string());

    // The cursor resumes right after the page
    let next = format!(
        "/api/v1/feed/explore?limit=20&cursor={}",
        urlencode(body["cursor"].as_str().unwrap())
    );
    let req = test::TestRequest::get().uri(&next).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["posts"].as_array().map(Vec::len), Some(20));
    assert_eq!(body["hasMore"], true);
}

struct Household {
    viewer: Uuid,
    own_pet: Uuid,
    friend: Uuid,
    stranger: Uuid,
}

impl Household {
    fn new() -> Self {
        Self {
            viewer: Uuid::new_v4(),
            own_pet: Uuid::new_v4(),
            friend: Uuid::new_v4(),
            stranger: Uuid::new_v4(),
        }
    }

    fn graph(&self) -> InMemoryFollowGraph {
        InMemoryFollowGraph::default()
            .owns(self.viewer, self.own_pet)
            .follows(self.own_pet, self.friend)
    }

    fn service(&self, posts: Vec<PostSnapshot>) -> Arc<FeedService> {
        build_feed(posts, self.graph())
    }
}

#[actix_web::test]
async fn home_feed_shows_own_and_followed_pets_newest_first() {
    let h = Household::new();
    let own_private = PostFixture::by(h.own_pet)
        .minutes_ago(5)
        .visibility(PostVisibility::Private)
        .build();
    let friend_followers = PostFixture::by(h.friend)
        .minutes_ago(1)
        .visibility(PostVisibility::Followers)
        .build();
    let friend_private = PostFixture::by(h.friend)
        .minutes_ago(2)
        .visibility(PostVisibility::Private)
        .build();
    let friend_public = PostFixture::by(h.friend).minutes_ago(10).likes(99).build();
    let stranger_public = PostFixture::by(h.stranger).minutes_ago(0).build();

    let app = app!(h.service(vec![
        own_private.clone(),
        friend_followers.clone(),
        friend_private,
        friend_public.clone(),
        stranger_public,
    ]));

    let req = test::TestRequest::get()
        .uri("/api/v1/feed")
        .insert_header((VIEWER_HEADER, h.viewer.to_string()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(
        ids(&body),
        vec![
            id_of(&friend_followers),
            id_of(&own_private),
            id_of(&friend_public)
        ]
    );
}

#[actix_web::test]
async fn home_feed_keyset_pagination_walks_every_post_once() {
    let h = Household::new();
    let mut posts: Vec<PostSnapshot> = (0..7)
        .map(|i| PostFixture::by(h.friend).minutes_ago(i).build())
        .collect();
    // Same instant as an existing post to exercise the id tie-break
    posts.push(PostFixture::by(h.own_pet).minutes_ago(3).build());

    let app = app!(h.service(posts.clone()));

    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    for _ in 0..10 {
        let uri = match &cursor {
            Some(c) => format!("/api/v1/feed?limit=3&cursor={}", urlencode(c)),
            None => "/api/v1/feed?limit=3".to_string(),
        };
        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header((VIEWER_HEADER, h.viewer.to_string()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        seen.extend(ids(&body));

        match body["cursor"].as_str() {
            Some(c) => cursor = Some(c.to_string()),
            None => break,
        }
    }

    let mut expected = posts;
    expected.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
    assert_eq!(seen, expected.iter().map(id_of).collect::<Vec<_>>());
}

#[actix_web::test]
async fn home_feed_reaches_past_many_hidden_private_posts() {
    let h = Household::new();
    let mut posts: Vec<PostSnapshot> = (0..500)
        .map(|i| {
            PostFixture::by(h.friend)
                .minutes_ago(i)
                .visibility(PostVisibility::Private)
                .build()
        })
        .collect();
    let older_public: Vec<PostSnapshot> = (0..5)
        .map(|i| PostFixture::by(h.friend).minutes_ago(1_000 + i).build())
        .collect();
    posts.extend(older_public.iter().cloned());

    let app = app!(h.service(posts));

    let req = test::TestRequest::get()
        .uri("/api/v1/feed")
        .insert_header((VIEWER_HEADER, h.viewer.to_string()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(ids(&body), older_public.iter().map(id_of).collect::<Vec<_>>());
    assert_eq!(body["hasMore"], false);
}

#[actix_web::test]
async fn home_feed_for_new_viewer_falls_back_to_public_posts() {
    let pet = Uuid::new_v4();
    let public = PostFixture::by(pet).build();
    let followers_only = PostFixture::by(pet)
        .visibility(PostVisibility::Followers)
        .build();
    let app = app!(build_feed(
        vec![public.clone(), followers_only],
        InMemoryFollowGraph::default()
    ));

    let req = test::TestRequest::get()
        .uri("/api/v1/feed")
        .insert_header((VIEWER_HEADER, Uuid::new_v4().to_string()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(ids(&body), vec![id_of(&public)]);
}

#[actix_web::test]
async fn pet_feed_respects_viewer_relationship() {
    let h = Household::new();
    let public = PostFixture::by(h.friend).minutes_ago(3).build();
    let followers = PostFixture::by(h.friend)
        .minutes_ago(2)
        .visibility(PostVisibility::Followers)
        .build();
    let private = PostFixture::by(h.friend)
        .minutes_ago(1)
        .visibility(PostVisibility::Private)
        .build();
    let app = app!(h.service(vec![public.clone(), followers.clone(), private]));

    let uri = format!("/api/v1/feed/pets/{}", h.friend);

    let anonymous = test::TestRequest::get().uri(&uri).to_request();
    let body: Value = test::call_and_read_body_json(&app, anonymous).await;
    assert_eq!(ids(&body), vec![id_of(&public)]);

    let follower = test::TestRequest::get()
        .uri(&uri)
        .insert_header((VIEWER_HEADER, h.viewer.to_string()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, follower).await;
    assert_eq!(ids(&body), vec![id_of(&followers), id_of(&public)]);
}

#[actix_web::test]
async fn pet_feed_rejects_invalid_pet_id() {
    let app = app!(build_feed(Vec::new(), InMemoryFollowGraph::default()));

    let req = test::TestRequest::get()
        .uri("/api/v1/feed/pets/not-a-pet")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn tag_feed_lists_public_tagged_posts_newest_first() {
    let pet = Uuid::new_v4();
    let older = PostFixture::by(pet).minutes_ago(30).likes(50).build();
    let newer = PostFixture::by(pet).minutes_ago(5).build();
    let private = PostFixture::by(pet)
        .minutes_ago(1)
        .visibility(PostVisibility::Private)
        .build();
    let hidden = PostFixture::by(pet).minutes_ago(2).hidden().build();
    let untagged = PostFixture::by(pet).minutes_ago(3).build();
    let lookalike = PostFixture::by(pet).minutes_ago(4).build();

    let app = app!(build_captioned_feed(vec![
        (older.clone(), "Beach day #corgi"),
        (newer.clone(), "#CORGI zoomies"),
        (private, "#corgi secrets"),
        (hidden, "#corgi"),
        (untagged, "corgi without a hashtag"),
        (lookalike, "#goodXboy"),
    ]));

    let req = test::TestRequest::get()
        .uri("/api/v1/feed/tags/corgi")
        .insert_header((VIEWER_HEADER, Uuid::new_v4().to_string()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(ids(&body), vec![id_of(&newer), id_of(&older)]);

    // `_` is matched literally
    let req = test::TestRequest::get()
        .uri("/api/v1/feed/tags/good_boy")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(ids(&body).is_empty());
}

/// Base64 cursors may contain `+`, `/` and `=`
fn urlencode(value: &str) -> String {
    value
        .replace('+', "%2B")
        .replace('/', "%2F")
        .replace('=', "%3D")
}
