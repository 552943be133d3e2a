use std::collections::BTreeSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    cached,
    db::redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle},
    db::store::{ContentOrder, ContentStore},
    error::AppResult,
    models::{ContentItem, ContentKind},
};

/// Smallest popularity list ever cached
const MIN_CACHED_DEPTH: usize = 16;

/// [`ContentStore`] decorator caching popularity lists in Redis
///
/// The popularity ranking is the same for every viewer, so the unfiltered
/// top list is cached and the caller's exclusions are applied afterwards.
/// Depths are rounded up to a power of two to keep the key space small.
pub struct CachedContentStore {
    inner: Arc<dyn ContentStore>,
    cache: Cache,
    ttl: u64,
}

impl CachedContentStore {
    pub fn new(inner: Arc<dyn ContentStore>, cache: Cache, ttl: u64) -> Self {
        Self { inner, cache, ttl }
    }
}

/// Wraps `inner` in a [`CachedContentStore`] backed by `redis_url`
///
/// The cache is an optimisation only. When Redis cannot be reached at
/// startup the error is logged and `inner` is returned unchanged, with no
/// writer handle to shut down.
pub async fn with_popularity_cache(
    inner: Arc<dyn ContentStore>,
    redis_url: &str,
    ttl: u64,
) -> (Arc<dyn ContentStore>, Option<CacheWriterHandle>) {
    let connected = match create_redis_client(redis_url) {
        Ok(client) => Cache::connect(client).await.map_err(anyhow::Error::from),
        Err(e) => Err(e),
    };

    match connected {
        Ok((cache, handle)) => {
            tracing::info!(ttl, "Popularity cache enabled");
            let cached: Arc<dyn ContentStore> = Arc::new(CachedContentStore::new(inner, cache, ttl));
            (cached, Some(handle))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable, serving without the popularity cache");
            (inner, None)
        }
    }
}

/// Cached list depth able to serve `limit` items after `excluded` removals
fn bucket_depth(limit: usize, excluded: usize) -> usize {
    (limit + excluded).next_power_of_two().max(MIN_CACHED_DEPTH)
}

/// First `limit` items of `ranked` not in `exclude_ids`, order preserved
fn take_unexcluded(ranked: Vec<ContentItem>, exclude_ids: &[Uuid], limit: usize) -> Vec<ContentItem> {
    ranked
        .into_iter()
        .filter(|item| !exclude_ids.contains(&item.id))
        .take(limit)
        .collect()
}

#[async_trait::async_trait]
impl ContentStore for CachedContentStore {
    async fn get_by_ids(&self, ids: &[Uuid], kind: ContentKind) -> AppResult<Vec<ContentItem>> {
        self.inner.get_by_ids(ids, kind).await
    }

    async fn get_by_tags(
        &self,
        tags: &BTreeSet<String>,
        kind: ContentKind,
        exclude_ids: &[Uuid],
        order: ContentOrder,
        limit: usize,
    ) -> AppResult<Vec<ContentItem>> {
        self.inner
            .get_by_tags(tags, kind, exclude_ids, order, limit)
            .await
    }

    async fn top_by_popularity(
        &self,
        kind: ContentKind,
        exclude_ids: &[Uuid],
        limit: usize,
    ) -> AppResult<Vec<ContentItem>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let depth = bucket_depth(limit, exclude_ids.len());
        let key = CacheKey::PopularContent { kind, depth };

        let ranked: Vec<ContentItem> = cached!(self.cache, key, self.ttl, async {
            self.inner.top_by_popularity(kind, &[], depth).await
        })?;

        Ok(take_unexcluded(ranked, exclude_ids, limit))
    }

    fn name(&self) -> &'static str {
        "redis-cached"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::Owner;

    fn video(views: i64) -> ContentItem {
        let owner = Owner {
            id: Uuid::new_v4(),
            username: "dave".to_string(),
            profile_image: None,
        };
        ContentItem::video(owner, "clip", &[], views)
    }

    #[tokio::test]
    async fn test_unreachable_redis_falls_back_to_inner_store() {
        let inner: Arc<dyn ContentStore> = Arc::new(MemoryStore::new().with_content([video(5)]));

        // Nothing listens on port 1
        let (store, handle) = with_popularity_cache(inner, "redis://127.0.0.1:1/", 60).await;

        assert!(handle.is_none());
        assert_eq!(store.name(), "memory");
        let items = store.top_by_popularity(ContentKind::Video, &[], 10).await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_redis_url_falls_back_to_inner_store() {
        let inner: Arc<dyn ContentStore> = Arc::new(MemoryStore::new());

        let (store, handle) = with_popularity_cache(inner, "not a url", 60).await;

        assert!(handle.is_none());
        assert_eq!(store.name(), "memory");
    }

    #[test]
    fn test_bucket_depth_covers_exclusions() {
        assert_eq!(bucket_depth(1, 0), 16);
        assert_eq!(bucket_depth(10, 10), 32);
        assert_eq!(bucket_depth(100, 0), 128);
        assert!(bucket_depth(7, 30) >= 37);
    }

    #[test]
    fn test_take_unexcluded_skips_and_keeps_order() {
        let ranked = vec![video(30), video(20), video(10)];
        let excluded = [ranked[0].id];
        let expected = vec![ranked[1].id, ranked[2].id];

        let items = take_unexcluded(ranked, &excluded, 5);

        let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_take_unexcluded_truncates() {
        let ranked = vec![video(3), video(2), video(1)];
        assert_eq!(take_unexcluded(ranked, &[], 2).len(), 2);
    }
}
