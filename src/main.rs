use std::sync::Arc;
use std::time::Duration;

use reelmix_api::{
    config::{Config, StoreBackend},
    db::{
        create_pool, run_migrations, with_popularity_cache, ContentStore, InteractionStore,
        MemoryStore, PgStore, SessionStore,
    },
    routes::{create_router, AppState},
    services::{RecommendationPolicy, Recommender, ViewerResolver},
};
use tracing_subscriber::EnvFilter;

/// The three collaborator stores, all backed by the same adapter
struct Stores {
    content: Arc<dyn ContentStore>,
    interactions: Arc<dyn InteractionStore>,
    sessions: Arc<dyn SessionStore>,
}

async fn build_stores(config: &Config) -> anyhow::Result<Stores> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let pool = create_pool(&config.database_url).await?;
            if config.run_migrations {
                run_migrations(&pool).await?;
            }
            let store = Arc::new(PgStore::new(pool));
            Ok(Stores {
                content: store.clone(),
                interactions: store.clone(),
                sessions: store,
            })
        }
        StoreBackend::Memory => {
            let store = match &config.seed_file {
                Some(path) => MemoryStore::from_seed_file(path)?,
                None => MemoryStore::new(),
            };
            let store = Arc::new(store);
            Ok(Stores {
                content: store.clone(),
                interactions: store.clone(),
                sessions: store,
            })
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the filter reads RUST_LOG
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reelmix_api=debug,tower_http=debug")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(backend = ?config.store_backend, "Starting reelmix-api");

    let stores = build_stores(&config).await?;

    let (content, cache_handle) = match &config.redis_url {
        Some(redis_url) => {
            with_popularity_cache(stores.content, redis_url, config.popular_cache_ttl).await
        }
        None => (stores.content, None),
    };

    let recommender = Recommender::new(
        content,
        stores.interactions,
        RecommendationPolicy::from_config(&config),
    )
    .with_shuffle_seed(config.shuffle_seed);

    let state = Arc::new(AppState {
        recommender: Arc::new(recommender),
        viewer_resolver: Arc::new(ViewerResolver::new(stores.sessions)),
        request_timeout: Duration::from_millis(config.recommendation_timeout_ms),
    });

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(address = %listener.local_addr()?, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_handle {
        handle.shutdown().await;
    }

    Ok(())
}
