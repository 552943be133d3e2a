use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::{
    db::{ContentOrder, ContentStore},
    error::AppResult,
    models::{ContentItem, ContentKind},
    services::affinity::TagAffinity,
};

/// Tag-matched candidates, one pool per content kind
#[derive(Debug, Clone, Default)]
pub struct CandidatePools {
    pub videos: Vec<ContentItem>,
    pub photos: Vec<ContentItem>,
}

impl CandidatePools {
    /// Distinct ids across both pools
    pub fn ids(&self) -> HashSet<Uuid> {
        self.videos
            .iter()
            .chain(self.photos.iter())
            .map(|item| item.id)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty() && self.photos.is_empty()
    }
}

/// Builds the tag-matched candidate pools for a viewer's affinity
///
/// Videos skip what the viewer already liked and rank by views; photos rank
/// by recency and are not filtered by likes.
pub struct CandidateGenerator {
    content: Arc<dyn ContentStore>,
}

impl CandidateGenerator {
    pub fn new(content: Arc<dyn ContentStore>) -> Self {
        Self { content }
    }

    /// Both pools are empty, with no query issued, when the affinity has no tags
    #[instrument(skip(self, affinity), fields(tags = affinity.tags.len()))]
    pub async fn generate(
        &self,
        affinity: &TagAffinity,
        limit_videos: usize,
        limit_photos: usize,
    ) -> AppResult<CandidatePools> {
        if affinity.is_empty() {
            return Ok(CandidatePools::default());
        }

        let (videos, photos) = tokio::try_join!(
            self.pool(
                &affinity.tags,
                ContentKind::Video,
                &affinity.liked_video_ids,
                ContentOrder::Popularity,
                limit_videos,
            ),
            self.pool(
                &affinity.tags,
                ContentKind::Photo,
                &[],
                ContentOrder::Recency,
                limit_photos,
            ),
        )?;

        tracing::debug!(
            videos = videos.len(),
            photos = photos.len(),
            "Candidate pools generated"
        );

        Ok(CandidatePools { videos, photos })
    }

    async fn pool(
        &self,
        tags: &BTreeSet<String>,
        kind: ContentKind,
        exclude_ids: &[Uuid],
        order: ContentOrder,
        limit: usize,
    ) -> AppResult<Vec<ContentItem>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let items = self
            .content
            .get_by_tags(tags, kind, exclude_ids, order, limit)
            .await?;

        // Every pooled item must match a tag and must not be excluded
        Ok(items
            .into_iter()
            .filter(|item| {
                item.kind == kind && item.has_any_tag(tags) && !exclude_ids.contains(&item.id)
            })
            .take(limit)
            .collect())
    }
}
