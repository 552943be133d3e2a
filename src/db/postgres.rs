use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    db::store::{ContentOrder, ContentStore, InteractionStore, SessionStore},
    error::AppResult,
    models::{ContentItem, ContentKind, LikeEvent, Owner},
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the migrations embedded from `./migrations`
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// Row shape shared by the video and photo queries
#[derive(Debug, sqlx::FromRow)]
struct ContentRow {
    id: Uuid,
    title: String,
    media_url: String,
    thumbnail_url: Option<String>,
    tags: Vec<String>,
    views: Option<i64>,
    created_at: DateTime<Utc>,
    owner_id: Uuid,
    owner_username: String,
    owner_profile_image: Option<String>,
}

impl ContentRow {
    fn into_item(self, kind: ContentKind) -> ContentItem {
        ContentItem {
            id: self.id,
            kind,
            owner: Owner {
                id: self.owner_id,
                username: self.owner_username,
                profile_image: self.owner_profile_image,
            },
            title: self.title,
            media_url: self.media_url,
            thumbnail_url: self.thumbnail_url,
            tags: self.tags,
            views: self.views,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LikeRow {
    viewer_id: Uuid,
    content_id: Uuid,
    content_type: String,
    created_at: DateTime<Utc>,
}

/// `SELECT ... FROM ... JOIN users` for one content kind, aliased as `c`
fn select_content(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Video => {
            r#"
            SELECT c.id, c.title, c.video_url AS media_url, c.thumbnail_url, c.tags,
                   c.views AS views, c.created_at,
                   u.id AS owner_id, u.username AS owner_username,
                   u.profile_image AS owner_profile_image
            FROM videos c
            JOIN users u ON u.id = c.owner_id
            "#
        }
        ContentKind::Photo => {
            r#"
            SELECT c.id, c.title, c.photo_url AS media_url, NULL::text AS thumbnail_url, c.tags,
                   NULL::bigint AS views, c.created_at,
                   u.id AS owner_id, u.username AS owner_username,
                   u.profile_image AS owner_profile_image
            FROM photos c
            JOIN users u ON u.id = c.owner_id
            "#
        }
    }
}

/// ORDER BY clause with a stable tie-break on id
fn order_clause(kind: ContentKind, order: ContentOrder) -> &'static str {
    match (kind, order) {
        (ContentKind::Video, ContentOrder::Popularity) => {
            "ORDER BY c.views DESC, c.created_at DESC, c.id"
        }
        // Photos carry no view count, so popularity falls back to recency
        (ContentKind::Photo, ContentOrder::Popularity) | (_, ContentOrder::Recency) => {
            "ORDER BY c.created_at DESC, c.id"
        }
    }
}

/// PostgreSQL-backed implementation of every store the engine reads from
///
/// Queries are built at runtime from [`select_content`] and [`order_clause`]
/// so the video and photo tables share one row mapping. Every read is a
/// single round trip on the shared pool; nothing here writes.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ContentStore for PgStore {
    #[instrument(skip(self, ids), fields(id_count = ids.len()))]
    async fn get_by_ids(&self, ids: &[Uuid], kind: ContentKind) -> AppResult<Vec<ContentItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("{} WHERE c.id = ANY($1)", select_content(kind));
        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| r.into_item(kind)).collect())
    }

    /// Tag-matched items of one kind
    ///
    /// Uses array overlap (`&&`), so an item matches when it shares at least
    /// one tag with `tags`; the GIN index on `tags` serves it. An empty
    /// exclusion list binds as `'{}'` and `NOT (id = ANY('{}'))` is true for
    /// every row.
    #[instrument(skip(self, tags, exclude_ids), fields(tag_count = tags.len()))]
    async fn get_by_tags(
        &self,
        tags: &BTreeSet<String>,
        kind: ContentKind,
        exclude_ids: &[Uuid],
        order: ContentOrder,
        limit: usize,
    ) -> AppResult<Vec<ContentItem>> {
        if tags.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            "{} WHERE c.tags && $1 AND NOT (c.id = ANY($2)) {} LIMIT $3",
            select_content(kind),
            order_clause(kind, order)
        );
        let tags: Vec<String> = tags.iter().cloned().collect();

        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(tags)
            .bind(exclude_ids)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| r.into_item(kind)).collect())
    }

    /// Most viewed items of one kind, skipping `exclude_ids`
    ///
    /// Photos have no view count and come back newest first instead.
    #[instrument(skip(self, exclude_ids), fields(excluded = exclude_ids.len()))]
    async fn top_by_popularity(
        &self,
        kind: ContentKind,
        exclude_ids: &[Uuid],
        limit: usize,
    ) -> AppResult<Vec<ContentItem>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            "{} WHERE NOT (c.id = ANY($1)) {} LIMIT $2",
            select_content(kind),
            order_clause(kind, ContentOrder::Popularity)
        );

        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(exclude_ids)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| r.into_item(kind)).collect())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

#[async_trait::async_trait]
impl InteractionStore for PgStore {
    #[instrument(skip(self))]
    async fn likes_for_viewer(&self, viewer_id: Uuid, limit: usize) -> AppResult<Vec<LikeEvent>> {
        let rows = sqlx::query_as::<_, LikeRow>(
            r#"
            SELECT user_id AS viewer_id, content_id, content_type, created_at
            FROM likes
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(viewer_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        // The CHECK constraint keeps content_type valid; skip rather than fail if not
        let likes = rows
            .into_iter()
            .filter_map(|row| match row.content_type.parse::<ContentKind>() {
                Ok(content_kind) => Some(LikeEvent {
                    viewer_id: row.viewer_id,
                    content_id: row.content_id,
                    content_kind,
                    created_at: row.created_at,
                }),
                Err(e) => {
                    tracing::warn!(error = %e, content_id = %row.content_id, "Skipping like");
                    None
                }
            })
            .collect();

        Ok(likes)
    }
}

#[async_trait::async_trait]
impl SessionStore for PgStore {
    /// Owner of an unexpired session; expired and unknown tokens both give `None`
    async fn viewer_for_token(&self, token: &str) -> AppResult<Option<Uuid>> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM sessions WHERE token = $1 AND expires_at > now()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user_id)
    }
}
