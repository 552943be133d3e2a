use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::{
    db::{ContentStore, InteractionStore},
    error::AppResult,
    models::{ContentKind, Viewer},
};

/// What a viewer's like history says about their taste
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagAffinity {
    /// Union of the tags of the liked videos
    pub tags: BTreeSet<String>,
    /// Distinct liked video ids, most recent like first
    pub liked_video_ids: Vec<Uuid>,
}

impl TagAffinity {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Derives [`TagAffinity`] from the viewer's recent video likes
pub struct TagAffinityExtractor {
    interactions: Arc<dyn InteractionStore>,
    content: Arc<dyn ContentStore>,
    likes_window: usize,
}

impl TagAffinityExtractor {
    pub fn new(
        interactions: Arc<dyn InteractionStore>,
        content: Arc<dyn ContentStore>,
        likes_window: usize,
    ) -> Self {
        Self {
            interactions,
            content,
            likes_window,
        }
    }

    /// Best effort: anonymous viewers and store failures both yield an empty
    /// affinity, which drops the request into pure popularity mode.
    #[instrument(skip_all, fields(viewer = %viewer))]
    pub async fn extract(&self, viewer: &Viewer) -> TagAffinity {
        let Some(viewer_id) = viewer.id() else {
            return TagAffinity::default();
        };

        match self.lookup(viewer_id).await {
            Ok(affinity) => {
                tracing::debug!(
                    tags = affinity.tags.len(),
                    liked_videos = affinity.liked_video_ids.len(),
                    "Tag affinity extracted"
                );
                affinity
            }
            Err(e) => {
                tracing::warn!(error = %e, "Like history unavailable, continuing without affinity");
                TagAffinity::default()
            }
        }
    }

    async fn lookup(&self, viewer_id: Uuid) -> AppResult<TagAffinity> {
        let likes = self
            .interactions
            .likes_for_viewer(viewer_id, self.likes_window)
            .await?;

        // Likes are unique per content upstream, but don't rely on it
        let mut seen = HashSet::new();
        let liked_video_ids: Vec<Uuid> = likes
            .iter()
            .filter(|like| like.content_kind == ContentKind::Video)
            .map(|like| like.content_id)
            .filter(|id| seen.insert(*id))
            .collect();

        if liked_video_ids.is_empty() {
            return Ok(TagAffinity::default());
        }

        let liked_videos = self
            .content
            .get_by_ids(&liked_video_ids, ContentKind::Video)
            .await?;

        let tags = liked_videos.into_iter().flat_map(|v| v.tags).collect();

        Ok(TagAffinity {
            tags,
            liked_video_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::{MockContentStore, MockInteractionStore};
    use crate::error::AppError;
    use crate::models::{ContentItem, LikeEvent, Owner};

    fn owner() -> Owner {
        Owner {
            id: Uuid::new_v4(),
            username: "erin".to_string(),
            profile_image: None,
        }
    }

    fn extractor(interactions: MockInteractionStore, content: MockContentStore) -> TagAffinityExtractor {
        TagAffinityExtractor::new(Arc::new(interactions), Arc::new(content), 20)
    }

    #[tokio::test]
    async fn test_anonymous_viewer_makes_no_store_calls() {
        let mut interactions = MockInteractionStore::new();
        interactions.expect_likes_for_viewer().never();
        let mut content = MockContentStore::new();
        content.expect_get_by_ids().never();

        let affinity = extractor(interactions, content).extract(&Viewer::Anonymous).await;

        assert!(affinity.is_empty());
        assert!(affinity.liked_video_ids.is_empty());
    }

    #[tokio::test]
    async fn test_unions_tags_of_liked_videos_only() {
        let viewer = Uuid::new_v4();
        let jazz = ContentItem::video(owner(), "jazz", &["music", "jazz"], 10);
        let rock = ContentItem::video(owner(), "rock", &["music", "rock"], 10);
        let liked_photo = Uuid::new_v4();

        let likes = vec![
            LikeEvent::new(viewer, jazz.id, ContentKind::Video),
            LikeEvent::new(viewer, liked_photo, ContentKind::Photo),
            LikeEvent::new(viewer, rock.id, ContentKind::Video),
            // duplicate like must not duplicate the id
            LikeEvent::new(viewer, jazz.id, ContentKind::Video),
        ];
        let expected_ids = vec![jazz.id, rock.id];

        let mut interactions = MockInteractionStore::new();
        interactions
            .expect_likes_for_viewer()
            .withf(move |id, limit| *id == viewer && *limit == 20)
            .times(1)
            .returning(move |_, _| Ok(likes.clone()));

        let mut content = MockContentStore::new();
        let ids_for_check = expected_ids.clone();
        let videos = vec![jazz.clone(), rock.clone()];
        content
            .expect_get_by_ids()
            .withf(move |ids, kind| ids.to_vec() == ids_for_check && *kind == ContentKind::Video)
            .times(1)
            .returning(move |_, _| Ok(videos.clone()));

        let affinity = extractor(interactions, content)
            .extract(&Viewer::Identified(viewer))
            .await;

        let expected_tags: BTreeSet<String> = ["music", "jazz", "rock"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(affinity.tags, expected_tags);
        assert_eq!(affinity.liked_video_ids, expected_ids);
    }

    #[tokio::test]
    async fn test_only_photo_likes_skip_content_lookup() {
        let viewer = Uuid::new_v4();
        let likes = vec![LikeEvent::new(viewer, Uuid::new_v4(), ContentKind::Photo)];

        let mut interactions = MockInteractionStore::new();
        interactions
            .expect_likes_for_viewer()
            .returning(move |_, _| Ok(likes.clone()));
        let mut content = MockContentStore::new();
        content.expect_get_by_ids().never();

        let affinity = extractor(interactions, content)
            .extract(&Viewer::Identified(viewer))
            .await;

        assert!(affinity.is_empty());
    }

    #[tokio::test]
    async fn test_interaction_store_failure_degrades_to_empty() {
        let mut interactions = MockInteractionStore::new();
        interactions
            .expect_likes_for_viewer()
            .returning(|_, _| Err(AppError::Internal("connection refused".to_string())));
        let content = MockContentStore::new();

        let affinity = extractor(interactions, content)
            .extract(&Viewer::Identified(Uuid::new_v4()))
            .await;

        assert_eq!(affinity, TagAffinity::default());
    }

    #[tokio::test]
    async fn test_content_store_failure_degrades_to_empty() {
        let viewer = Uuid::new_v4();
        let likes = vec![LikeEvent::new(viewer, Uuid::new_v4(), ContentKind::Video)];

        let mut interactions = MockInteractionStore::new();
        interactions
            .expect_likes_for_viewer()
            .returning(move |_, _| Ok(likes.clone()));
        let mut content = MockContentStore::new();
        content
            .expect_get_by_ids()
            .returning(|_, _| Err(AppError::Internal("timeout".to_string())));

        let affinity = extractor(interactions, content)
            .extract(&Viewer::Identified(viewer))
            .await;

        assert!(affinity.is_empty());
        assert!(affinity.liked_video_ids.is_empty());
    }
}
