use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::fmt::Display;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::error::{AppError, AppResult};
use crate::models::ContentKind;

/// Writes allowed to wait for the writer task before new ones are dropped
const WRITE_QUEUE_CAPACITY: usize = 256;

/// Upper bound on the initial Redis handshake, retries included
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Unfiltered top-`depth` list of `kind` by popularity
    PopularContent { kind: ContentKind, depth: usize },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::PopularContent { kind, depth } => write!(f, "popular:{}:{}", kind, depth),
        }
    }
}

/// Creates a Redis client for the popularity cache
///
/// Only parses the URL. No connection is made until [`Cache::connect`],
/// so a bad host surfaces there rather than here.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

#[derive(Debug)]
struct PendingWrite {
    key: String,
    json: String,
    ttl_secs: u64,
}

/// JSON-over-Redis cache with fire-and-forget writes
///
/// Reads share one auto-reconnecting connection. Writes go through a bounded
/// queue drained by a background task; when the queue is full the write is
/// dropped, since a missing popularity entry only costs one extra store query.
#[derive(Clone)]
pub struct Cache {
    conn: ConnectionManager,
    writes: mpsc::Sender<PendingWrite>,
}

/// Owner of the background writer; see [`CacheWriterHandle::shutdown`]
pub struct CacheWriterHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    /// Applies writes already queued, then waits for the writer to exit
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task panicked");
        }
    }
}

impl Cache {
    /// Connects to Redis and spawns the writer task
    ///
    /// The connection manager reconnects on its own once established, but the
    /// first handshake must succeed within `CONNECT_TIMEOUT`. Callers treat an
    /// error here as "run without a cache".
    pub async fn connect(client: Client) -> AppResult<(Self, CacheWriterHandle)> {
        let conn = tokio::time::timeout(CONNECT_TIMEOUT, ConnectionManager::new(client))
            .await
            .map_err(|_| AppError::Internal("timed out connecting to Redis".to_string()))??;
        let (writes, queue) = mpsc::channel(WRITE_QUEUE_CAPACITY);
        let (stop, stopped) = oneshot::channel();

        let task = tokio::spawn(run_writer(conn.clone(), queue, stopped));

        Ok((Self { conn, writes }, CacheWriterHandle { stop, task }))
    }

    /// Reads and deserializes `key`; `None` on a miss
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.conn.clone();
        let cached: Option<String> = conn.get(key.to_string()).await?;

        cached
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Corrupt cache entry {}: {}", key, e))
                })
            })
            .transpose()
    }

    /// Queues `value` under `key` for `ttl_secs`. Never waits.
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl_secs: u64) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Cache serialization error");
                return;
            }
        };

        let write = PendingWrite {
            key: key.to_string(),
            json,
            ttl_secs,
        };

        match self.writes.try_send(write) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(write)) => {
                tracing::debug!(key = %write.key, "Cache write queue full, dropping write");
            }
            Err(mpsc::error::TrySendError::Closed(write)) => {
                tracing::warn!(key = %write.key, "Cache writer stopped, dropping write");
            }
        }
    }
}

async fn apply(conn: &mut ConnectionManager, write: PendingWrite) {
    let result: redis::RedisResult<()> = conn.set_ex(&write.key, write.json, write.ttl_secs).await;
    if let Err(e) = result {
        tracing::error!(error = %e, key = %write.key, "Failed to write to Redis cache");
    }
}

/// Background task applying queued cache writes
///
/// Runs until the handle's stop signal fires. Writes are applied one at a
/// time on a clone of the shared connection; a failed write is logged and
/// skipped, never retried. On stop, whatever is already queued is flushed
/// before the task exits.
async fn run_writer(
    mut conn: ConnectionManager,
    mut queue: mpsc::Receiver<PendingWrite>,
    mut stopped: oneshot::Receiver<()>,
) {
    tracing::info!("Cache writer task started");

    loop {
        tokio::select! {
            // Normal operation: apply writes as they arrive
            Some(write) = queue.recv() => apply(&mut conn, write).await,
            // Stop requested (or the handle was dropped)
            _ = &mut stopped => break,
        }
    }

    // `Cache` clones may outlive the writer, so drain without waiting on them
    let mut flushed = 0usize;
    while let Ok(write) = queue.try_recv() {
        apply(&mut conn, write).await;
        flushed += 1;
    }

    tracing::info!(flushed, "Cache writer task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    async fn connect() -> (Cache, CacheWriterHandle, Client) {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, handle) = Cache::connect(client.clone()).await.unwrap();
        (cache, handle, client)
    }

    async fn delete(client: &Client, key: &CacheKey) {
        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(key.to_string()).await.unwrap();
    }

    #[test]
    fn test_popular_key_format() {
        let key = CacheKey::PopularContent {
            kind: ContentKind::Video,
            depth: 16,
        };
        assert_eq!(key.to_string(), "popular:video:16");

        let photos = CacheKey::PopularContent {
            kind: ContentKind::Photo,
            depth: 16,
        };
        assert_ne!(key.to_string(), photos.to_string());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_missing_key_is_none() {
        let (cache, _handle, _client) = connect().await;
        let key = CacheKey::PopularContent {
            kind: ContentKind::Photo,
            depth: 987_654,
        };

        let hit: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(hit, None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_background_write_is_readable() {
        let (cache, _handle, client) = connect().await;
        let key = CacheKey::PopularContent {
            kind: ContentKind::Video,
            depth: 123_456,
        };
        let value = vec!["a".to_string(), "b".to_string()];

        cache.set_in_background(&key, &value, 60);
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let hit: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(hit, Some(value));

        delete(&client, &key).await;
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_shutdown_flushes_queued_writes() {
        let (cache, handle, client) = connect().await;
        let key = CacheKey::PopularContent {
            kind: ContentKind::Video,
            depth: 654_321,
        };
        let value = vec!["queued".to_string()];

        cache.set_in_background(&key, &value, 60);
        handle.shutdown().await;

        let hit: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(hit, Some(value));

        delete(&client, &key).await;
    }
}
