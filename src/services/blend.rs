use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::{ContentItem, RecommendationResult, RecommendationSource, RecommendedItem};

/// Merges the pools into the final result
///
/// Sources are concatenated videos, photos, backfill; the first occurrence of
/// an id wins, so tag-matched items outrank backfill duplicates. The whole
/// deduplicated list is then uniformly shuffled (Fisher-Yates) before being
/// cut to `limit`. The result carries no rank order.
pub fn blend<R: Rng + ?Sized>(
    videos: Vec<ContentItem>,
    photos: Vec<ContentItem>,
    backfill: Vec<ContentItem>,
    limit: usize,
    rng: &mut R,
) -> RecommendationResult {
    let tagged = videos
        .into_iter()
        .chain(photos)
        .map(|item| (item, RecommendationSource::Affinity));
    let popular = backfill
        .into_iter()
        .map(|item| (item, RecommendationSource::Popular));

    let mut seen = HashSet::new();
    let mut recommendations: Vec<RecommendedItem> = tagged
        .chain(popular)
        .filter(|(item, _)| seen.insert(item.id))
        .map(|(item, source)| RecommendedItem { item, source })
        .collect();

    recommendations.shuffle(rng);
    recommendations.truncate(limit);

    RecommendationResult { recommendations }
}
