use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::store::{ContentOrder, ContentStore, InteractionStore, SessionStore},
    error::AppResult,
    models::{ContentItem, ContentKind, LikeEvent},
};

/// JSON seed file layout for [`MemoryStore`]
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub content: Vec<ContentItem>,
    #[serde(default)]
    pub likes: Vec<LikeEvent>,
    /// Session token to user id
    #[serde(default)]
    pub sessions: HashMap<String, Uuid>,
}

/// In-process store for local runs and tests
///
/// Orders results the same way the PostgreSQL queries do, including the
/// id tie-break, so both backends return identical candidate lists.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    content: Vec<ContentItem>,
    likes: Vec<LikeEvent>,
    sessions: HashMap<String, Uuid>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a store from a JSON [`Seed`] file
    pub fn from_seed_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read seed file {}: {}", path.display(), e))?;
        let seed: Seed = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Failed to parse seed file {}: {}", path.display(), e))?;

        tracing::info!(
            content = seed.content.len(),
            likes = seed.likes.len(),
            sessions = seed.sessions.len(),
            "Loaded in-memory seed"
        );

        Ok(Self::from(seed))
    }

    pub fn with_content(mut self, items: impl IntoIterator<Item = ContentItem>) -> Self {
        self.content.extend(items);
        self
    }

    pub fn with_like(mut self, like: LikeEvent) -> Self {
        self.likes.push(like);
        self
    }

    pub fn with_session(mut self, token: &str, user_id: Uuid) -> Self {
        self.sessions.insert(token.to_string(), user_id);
        self
    }

    fn sorted(mut items: Vec<ContentItem>, kind: ContentKind, order: ContentOrder) -> Vec<ContentItem> {
        match (kind, order) {
            (ContentKind::Video, ContentOrder::Popularity) => items.sort_by(|a, b| {
                b.popularity()
                    .cmp(&a.popularity())
                    .then(b.created_at.cmp(&a.created_at))
                    .then(a.id.cmp(&b.id))
            }),
            (ContentKind::Photo, ContentOrder::Popularity) | (_, ContentOrder::Recency) => items
                .sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id))),
        }
        items
    }
}

impl From<Seed> for MemoryStore {
    fn from(seed: Seed) -> Self {
        Self {
            content: seed.content,
            likes: seed.likes,
            sessions: seed.sessions,
        }
    }
}

#[async_trait::async_trait]
impl ContentStore for MemoryStore {
    async fn get_by_ids(&self, ids: &[Uuid], kind: ContentKind) -> AppResult<Vec<ContentItem>> {
        let wanted: HashSet<&Uuid> = ids.iter().collect();
        Ok(self
            .content
            .iter()
            .filter(|c| c.kind == kind && wanted.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn get_by_tags(
        &self,
        tags: &BTreeSet<String>,
        kind: ContentKind,
        exclude_ids: &[Uuid],
        order: ContentOrder,
        limit: usize,
    ) -> AppResult<Vec<ContentItem>> {
        let matching = self
            .content
            .iter()
            .filter(|c| c.kind == kind && c.has_any_tag(tags) && !exclude_ids.contains(&c.id))
            .cloned()
            .collect();

        let mut items = Self::sorted(matching, kind, order);
        items.truncate(limit);
        Ok(items)
    }

    async fn top_by_popularity(
        &self,
        kind: ContentKind,
        exclude_ids: &[Uuid],
        limit: usize,
    ) -> AppResult<Vec<ContentItem>> {
        let candidates = self
            .content
            .iter()
            .filter(|c| c.kind == kind && !exclude_ids.contains(&c.id))
            .cloned()
            .collect();

        let mut items = Self::sorted(candidates, kind, ContentOrder::Popularity);
        items.truncate(limit);
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait::async_trait]
impl InteractionStore for MemoryStore {
    async fn likes_for_viewer(&self, viewer_id: Uuid, limit: usize) -> AppResult<Vec<LikeEvent>> {
        let mut likes: Vec<LikeEvent> = self
            .likes
            .iter()
            .filter(|l| l.viewer_id == viewer_id)
            .cloned()
            .collect();

        likes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        likes.truncate(limit);
        Ok(likes)
    }
}

#[async_trait::async_trait]
impl SessionStore for MemoryStore {
    async fn viewer_for_token(&self, token: &str) -> AppResult<Option<Uuid>> {
        Ok(self.sessions.get(token).copied())
    }
}
