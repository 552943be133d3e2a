use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ContentItem, Viewer};

/// Which pool an item was drawn from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    /// Tag-matched against the viewer's likes
    Affinity,
    /// Popularity backfill
    Popular,
}

/// A single entry of a recommendation result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendedItem {
    #[serde(flatten)]
    pub item: ContentItem,
    pub source: RecommendationSource,
}

impl RecommendedItem {
    pub fn id(&self) -> Uuid {
        self.item.id
    }
}

/// Input to the recommendation engine
///
/// `limit` is already bounded by the caller.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationRequest {
    pub viewer: Viewer,
    pub limit: usize,
}

impl RecommendationRequest {
    pub fn new(viewer: Viewer, limit: usize) -> Self {
        Self { viewer, limit }
    }
}

/// Shuffled, deduplicated recommendations, at most `limit` long
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecommendationResult {
    pub recommendations: Vec<RecommendedItem>,
}

impl RecommendationResult {
    pub fn len(&self) -> usize {
        self.recommendations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty()
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.recommendations.iter().map(RecommendedItem::id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Owner;

    #[test]
    fn test_recommended_item_serializes_flat_with_type_and_source() {
        let owner = Owner {
            id: Uuid::new_v4(),
            username: "bob".to_string(),
            profile_image: Some("https://img/bob.png".to_string()),
        };
        let item = ContentItem::video(owner, "Drum solo", &["music"], 500);
        let entry = RecommendedItem {
            item: item.clone(),
            source: RecommendationSource::Affinity,
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["id"], item.id.to_string());
        assert_eq!(json["type"], "video");
        assert_eq!(json["source"], "affinity");
        assert_eq!(json["views"], 500);
        assert_eq!(json["owner"]["username"], "bob");
    }
}
