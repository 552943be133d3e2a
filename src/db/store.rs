//! Read-only collaborator interfaces consumed by the recommendation engine
//!
//! Each store is shared across requests behind an `Arc<dyn ...>`, so
//! implementations must be `Send + Sync` and hold no per-request state.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{ContentItem, ContentKind, LikeEvent},
};

/// Sort order for tag queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentOrder {
    /// Views descending
    Popularity,
    /// Creation time descending
    Recency,
}

/// Query access to videos and photos
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch items of `kind` whose id is in `ids`. Unknown ids are skipped.
    async fn get_by_ids(&self, ids: &[Uuid], kind: ContentKind) -> AppResult<Vec<ContentItem>>;

    /// Fetch up to `limit` items of `kind` carrying at least one of `tags`,
    /// skipping `exclude_ids`, sorted by `order`
    async fn get_by_tags(
        &self,
        tags: &BTreeSet<String>,
        kind: ContentKind,
        exclude_ids: &[Uuid],
        order: ContentOrder,
        limit: usize,
    ) -> AppResult<Vec<ContentItem>>;

    /// Fetch the `limit` most viewed items of `kind`, skipping `exclude_ids`
    async fn top_by_popularity(
        &self,
        kind: ContentKind,
        exclude_ids: &[Uuid],
        limit: usize,
    ) -> AppResult<Vec<ContentItem>>;

    /// Store name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Query access to recorded viewer interactions
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait InteractionStore: Send + Sync {
    /// The viewer's `limit` most recent likes, newest first
    async fn likes_for_viewer(&self, viewer_id: Uuid, limit: usize) -> AppResult<Vec<LikeEvent>>;
}

/// Lookup of session tokens issued by the authentication service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// The user owning an unexpired session for `token`, if any
    async fn viewer_for_token(&self, token: &str) -> AppResult<Option<Uuid>>;
}
