/// Read-through caching over a [`Cache`](crate::db::Cache).
///
/// Returns the cached value for `$key` when present. Otherwise awaits
/// `$block`, queues its value for a background write with `$ttl` seconds
/// and returns it. A failed cache read is logged and treated as a miss, so
/// the cache can be down without taking the source with it.
///
/// Evaluates to `AppResult<T>`; errors from `$block` propagate.
///
/// # Example
/// ```rust,ignore
/// let items: Vec<ContentItem> = cached!(cache, key, 60, async {
///     store.top_by_popularity(kind, &[], depth).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let hit = match $cache.get_from_cache(&$key).await {
            Ok(hit) => hit,
            Err(e) => {
                ::tracing::warn!(error = %e, key = %$key, "Cache read failed, using source");
                None
            }
        };

        match hit {
            Some(cached) => Ok::<_, $crate::error::AppError>(cached),
            None => {
                let value = $block.await?;
                $cache.set_in_background(&$key, &value, $ttl);
                Ok(value)
            }
        }
    }};
}
