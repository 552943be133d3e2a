pub mod memory;
pub mod postgres;
pub mod redis;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::{create_pool, run_migrations, PgStore};
pub use self::redis::{with_popularity_cache, Cache, CacheKey, CachedContentStore};
pub use store::{ContentOrder, ContentStore, InteractionStore, SessionStore};
