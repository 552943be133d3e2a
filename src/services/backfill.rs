use std::collections::HashSet;
use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::{
    db::ContentStore,
    error::AppResult,
    models::{ContentItem, ContentKind},
};

/// Tops up short candidate pools with the most viewed content
pub struct PopularityBackfill {
    content: Arc<dyn ContentStore>,
    kind: ContentKind,
}

impl PopularityBackfill {
    pub fn new(content: Arc<dyn ContentStore>, kind: ContentKind) -> Self {
        Self { content, kind }
    }

    /// Up to `remaining` popular items not in `already_selected`
    ///
    /// A short store answer is returned as is; nothing is padded.
    #[instrument(skip(self, already_selected), fields(selected = already_selected.len(), kind = %self.kind))]
    pub async fn backfill(
        &self,
        already_selected: &HashSet<Uuid>,
        remaining: usize,
    ) -> AppResult<Vec<ContentItem>> {
        if remaining == 0 {
            return Ok(Vec::new());
        }

        let mut exclude_ids: Vec<Uuid> = already_selected.iter().copied().collect();
        exclude_ids.sort();

        let items = self
            .content
            .top_by_popularity(self.kind, &exclude_ids, remaining)
            .await?;

        let mut seen = already_selected.clone();
        let items: Vec<ContentItem> = items
            .into_iter()
            .filter(|item| seen.insert(item.id))
            .take(remaining)
            .collect();

        if items.len() < remaining {
            tracing::debug!(
                wanted = remaining,
                got = items.len(),
                "Popularity backfill came up short"
            );
        }

        Ok(items)
    }
}
