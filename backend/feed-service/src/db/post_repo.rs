/// Post Repository
///
/// Read path over the `posts` table (owned by the content API) plus the
/// score snapshot writes used by the refresher job.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{FeedOrdering, PostSnapshot, PostVisibility};
use crate::services::audience::FeedAudience;
use crate::services::cursor::FeedKeyset;

/// Where feed candidates come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSource {
    /// Every post
    Global,
    /// Posts authored by these pets
    Authors(Vec<Uuid>),
    /// Posts whose caption mentions `#tag`, case-insensitively
    Tag(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateQuery {
    pub source: CandidateSource,
    /// Only posts this audience may see are read
    pub audience: FeedAudience,
    pub ordering: FeedOrdering,
    /// Recency feeds only: read strictly after this position
    pub after: Option<FeedKeyset>,
    pub limit: usize,
}

/// Post read interface
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn load_candidates(&self, query: &CandidateQuery) -> Result<Vec<PostSnapshot>>;

    /// Number of posts `load_candidates` would return without a limit
    async fn count_candidates(&self, query: &CandidateQuery) -> Result<usize>;
}

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    pet_id: Uuid,
    likes_count: i32,
    comments_count: i32,
    shares_count: i32,
    created_at: DateTime<Utc>,
    visibility: String,
    is_hidden: bool,
    deleted_at: Option<DateTime<Utc>>,
}

impl PostRow {
    fn into_snapshot(self) -> Option<PostSnapshot> {
        let visibility = match self.visibility.parse::<PostVisibility>() {
            Ok(v) => v,
            Err(e) => {
                warn!(post_id = %self.id, error = %e, "Skipping post with unknown visibility");
                return None;
            }
        };

        Some(PostSnapshot {
            id: self.id,
            pet_id: self.pet_id,
            likes_count: counter(self.id, "likes_count", self.likes_count),
            comments_count: counter(self.id, "comments_count", self.comments_count),
            shares_count: counter(self.id, "shares_count", self.shares_count),
            created_at: self.created_at,
            visibility,
            is_hidden: self.is_hidden,
            deleted_at: self.deleted_at,
        })
    }
}

/// Counters are maintained elsewhere; a negative one is an upstream bug.
fn counter(post_id: Uuid, field: &str, value: i32) -> u32 {
    u32::try_from(value).unwrap_or_else(|_| {
        warn!(post_id = %post_id, field, value, "Negative interaction counter, using 0");
        0
    })
}

pub struct PgPostStore {
    pool: PgPool,
}

impl PgPostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn load_candidates(&self, query: &CandidateQuery) -> Result<Vec<PostSnapshot>> {
        let mut builder = candidate_sql(query);
        let rows = builder
            .build_query_as::<PostRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().filter_map(PostRow::into_snapshot).collect())
    }

    async fn count_candidates(&self, query: &CandidateQuery) -> Result<usize> {
        let mut builder = count_sql(query);
        let total: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(usize::try_from(total).unwrap_or(0))
    }
}

fn candidate_sql(query: &CandidateQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new(
        r#"
        SELECT id, pet_id, likes_count, comments_count, shares_count, created_at,
               visibility::text AS visibility, is_hidden, deleted_at
        FROM posts
        "#,
    );
    push_filters(&mut builder, query);

    match query.ordering {
        FeedOrdering::Recency => {
            builder.push(" ORDER BY created_at DESC, id ASC");
        }
        // The stored score is a stale hint used to pick the window; the
        // selector re-ranks with fresh scores.
        FeedOrdering::Engagement => {
            builder.push(" ORDER BY engagement_score DESC, created_at DESC, id ASC");
        }
    }

    builder.push(" LIMIT ");
    builder.push_bind(i64::try_from(query.limit).unwrap_or(i64::MAX));
    builder
}

fn count_sql(query: &CandidateQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts");
    push_filters(&mut builder, query);
    builder
}

/// WHERE clause shared by the candidate and count queries. Mirrors the
/// selector's eligibility rules so the row limit only ever cuts eligible
/// posts.
fn push_filters(builder: &mut QueryBuilder<'static, Postgres>, query: &CandidateQuery) {
    builder.push(" WHERE deleted_at IS NULL AND is_hidden = FALSE");

    match &query.source {
        CandidateSource::Global => {}
        CandidateSource::Authors(pet_ids) => {
            builder.push(" AND pet_id = ANY(");
            builder.push_bind(pet_ids.clone());
            builder.push(")");
        }
        CandidateSource::Tag(tag) => {
            builder.push(" AND caption ILIKE ");
            builder.push_bind(tag_pattern(tag));
            builder.push(" ESCAPE '\\'");
        }
    }

    match &query.audience {
        FeedAudience::Public => {
            builder.push(" AND visibility = 'public'");
        }
        FeedAudience::Viewer(scope) => {
            let owned: Vec<Uuid> = scope.owned_pets.iter().copied().collect();
            let followed: Vec<Uuid> = scope.followed_pets.iter().copied().collect();
            builder.push(" AND (visibility = 'public' OR pet_id = ANY(");
            builder.push_bind(owned);
            builder.push(") OR (visibility = 'followers' AND pet_id = ANY(");
            builder.push_bind(followed);
            builder.push(")))");
        }
    }

    if let (FeedOrdering::Recency, Some(after)) = (query.ordering, query.after) {
        builder.push(" AND (created_at < ");
        builder.push_bind(after.created_at);
        builder.push(" OR (created_at = ");
        builder.push_bind(after.created_at);
        builder.push(" AND id > ");
        builder.push_bind(after.id);
        builder.push("))");
    }
}

/// ILIKE pattern matching `#tag` anywhere in a caption, with the tag's own
/// wildcard characters escaped
pub fn tag_pattern(tag: &str) -> String {
    let mut escaped = String::with_capacity(tag.len() + 4);
    for c in tag.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("%#{}%", escaped)
}

/// Counters of a post being considered by the score refresher
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScoreInputRow {
    pub id: Uuid,
    pub likes_count: i32,
    pub comments_count: i32,
    pub shares_count: i32,
    pub created_at: DateTime<Utc>,
}

impl ScoreInputRow {
    pub fn counters(&self) -> (u32, u32, u32) {
        (
            counter(self.id, "likes_count", self.likes_count),
            counter(self.id, "comments_count", self.comments_count),
            counter(self.id, "shares_count", self.shares_count),
        )
    }
}

/// Live posts created after `since`, in id order, starting after `after_id`
pub async fn fetch_score_inputs(
    pool: &PgPool,
    since: DateTime<Utc>,
    after_id: Option<Uuid>,
    limit: i64,
) -> std::result::Result<Vec<ScoreInputRow>, sqlx::Error> {
    sqlx::query_as::<_, ScoreInputRow>(
        r#"
        SELECT id, likes_count, comments_count, shares_count, created_at
        FROM posts
        WHERE deleted_at IS NULL
          AND created_at >= $1
          AND ($2::uuid IS NULL OR id > $2)
        ORDER BY id ASC
        LIMIT $3
        "#,
    )
    .bind(since)
    .bind(after_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Overwrite the stored score snapshot for a batch of posts
pub async fn write_score_snapshots(
    pool: &PgPool,
    post_ids: &[Uuid],
    scores: &[f64],
) -> std::result::Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE posts
        SET engagement_score = s.score
        FROM UNNEST($1::uuid[], $2::float8[]) AS s(id, score)
        WHERE posts.id = s.id
        "#,
    )
    .bind(post_ids)
    .bind(scores)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
