use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::services::audience::ViewerScope;

/// Viewer permission lookup: which pets the viewer owns and follows
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudienceResolver: Send + Sync {
    async fn resolve(&self, viewer_id: Uuid) -> Result<ViewerScope>;
}

/// Resolves viewer scope from the `pets` and `follows` tables
pub struct PgAudienceResolver {
    pool: PgPool,
}

impl PgAudienceResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AudienceResolver for PgAudienceResolver {
    async fn resolve(&self, viewer_id: Uuid) -> Result<ViewerScope> {
        let owned: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM pets
            WHERE owner_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;

        if owned.is_empty() {
            return Ok(ViewerScope::new(viewer_id));
        }

        let followed: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT following_id
            FROM follows
            WHERE follower_id = ANY($1)
            "#,
        )
        .bind(&owned)
        .fetch_all(&self.pool)
        .await?;

        debug!(
            viewer_id = %viewer_id,
            owned = owned.len(),
            followed = followed.len(),
            "Resolved viewer scope"
        );

        Ok(ViewerScope::new(viewer_id)
            .with_owned(owned)
            .with_followed(followed))
    }
}
