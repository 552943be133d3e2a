use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::instrument;

use crate::{
    db::{ContentStore, InteractionStore},
    error::{AppError, AppResult},
    models::{RecommendationRequest, RecommendationResult},
    services::{
        affinity::TagAffinityExtractor, backfill::PopularityBackfill, blend::blend,
        candidates::CandidateGenerator, policy::RecommendationPolicy,
    },
};

/// Generates content recommendations for a viewer
///
/// A request runs in two stages. Stage one derives tag affinity from the
/// viewer's likes and never fails. Stage two fetches the tag-matched video and
/// photo pools concurrently, tops them up from the popularity backfill when
/// they fall short, then blends everything into a shuffled result.
///
/// Only stage two can fail: without any item source there is nothing to
/// blend, so those errors surface as [`AppError::RecommendationUnavailable`].
pub struct Recommender {
    affinity: TagAffinityExtractor,
    candidates: CandidateGenerator,
    backfill: PopularityBackfill,
    policy: RecommendationPolicy,
    shuffle_seed: Option<u64>,
}

impl Recommender {
    pub fn new(
        content: Arc<dyn ContentStore>,
        interactions: Arc<dyn InteractionStore>,
        policy: RecommendationPolicy,
    ) -> Self {
        tracing::info!(
            store = content.name(),
            likes_window = policy.likes_window,
            backfill_kind = %policy.backfill_kind,
            "Recommender ready"
        );

        Self {
            affinity: TagAffinityExtractor::new(interactions, content.clone(), policy.likes_window),
            candidates: CandidateGenerator::new(content.clone()),
            backfill: PopularityBackfill::new(content, policy.backfill_kind),
            policy,
            shuffle_seed: None,
        }
    }

    /// Fixes the shuffle so identical inputs give identical orderings
    pub fn with_shuffle_seed(mut self, seed: Option<u64>) -> Self {
        self.shuffle_seed = seed;
        self
    }

    pub fn policy(&self) -> &RecommendationPolicy {
        &self.policy
    }

    /// Builds up to `request.limit` recommendations for `request.viewer`
    ///
    /// Each tag-matched pool gets `floor(limit / 2)` slots. When the two pools
    /// together hold fewer than `limit` distinct items, the gap is filled from
    /// the most viewed videos that were not already picked. The combined list
    /// is then deduplicated, shuffled and cut to `limit`.
    ///
    /// Returns fewer than `limit` items when the store simply has no more.
    /// Fails with [`AppError::RecommendationUnavailable`] when the candidate or
    /// backfill query fails.
    #[instrument(skip_all, fields(viewer = %request.viewer, limit = request.limit))]
    pub async fn recommend(&self, request: &RecommendationRequest) -> AppResult<RecommendationResult> {
        let limit = request.limit;
        if limit == 0 {
            return Ok(RecommendationResult::default());
        }

        // Stage one: never fails, empty for anonymous viewers
        let affinity = self.affinity.extract(&request.viewer).await;

        // Stage two: tag-matched pools, queried concurrently
        let per_kind = self.policy.per_kind_limit(limit);
        let pools = self
            .candidates
            .generate(&affinity, per_kind, per_kind)
            .await
            .map_err(|e| unavailable("candidate", e))?;

        // Top up from popularity only if the pools came up short
        let selected = pools.ids();
        let backfill = if selected.len() < limit {
            self.backfill
                .backfill(&selected, limit - selected.len())
                .await
                .map_err(|e| unavailable("backfill", e))?
        } else {
            Vec::new()
        };

        tracing::debug!(
            affinity_tags = affinity.tags.len(),
            videos = pools.videos.len(),
            photos = pools.photos.len(),
            backfill = backfill.len(),
            "Blending recommendation sources"
        );

        let mut rng = self.rng();
        let result = blend(pools.videos, pools.photos, backfill, limit, &mut rng);

        tracing::info!(returned = result.len(), "Recommendations generated");

        Ok(result)
    }

    fn rng(&self) -> StdRng {
        match self.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

fn unavailable(stage: &str, error: AppError) -> AppError {
    tracing::error!(stage, error = %error, "Recommendation source failed");
    AppError::RecommendationUnavailable(format!("{} query failed: {}", stage, error))
}
