use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::ContentKind,
};

/// Number of most recent likes that feed tag affinity. Tunable.
pub const DEFAULT_LIKES_WINDOW: usize = 20;

/// Each tag-matched pool gets `N / KIND_SPLIT_DIVISOR` slots, i.e. an even
/// video/photo split that does not adapt to pool availability. Tunable.
pub const KIND_SPLIT_DIVISOR: usize = 2;

/// Only videos have a popularity metric, so only videos backfill. Tunable.
pub const BACKFILL_KIND: ContentKind = ContentKind::Video;

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;

/// Knobs of the recommendation engine
#[derive(Debug, Clone)]
pub struct RecommendationPolicy {
    pub default_limit: usize,
    pub max_limit: usize,
    pub likes_window: usize,
    pub kind_split_divisor: usize,
    pub backfill_kind: ContentKind,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
            likes_window: DEFAULT_LIKES_WINDOW,
            kind_split_divisor: KIND_SPLIT_DIVISOR,
            backfill_kind: BACKFILL_KIND,
        }
    }
}

impl RecommendationPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_limit: config.recommendation_default_limit,
            max_limit: config.recommendation_max_limit,
            likes_window: config.recommendation_likes_window,
            ..Self::default()
        }
    }

    /// Slots given to each tag-matched pool for a request of `limit` items
    pub fn per_kind_limit(&self, limit: usize) -> usize {
        limit / self.kind_split_divisor.max(1)
    }

    /// Turns the raw `limit` query parameter into a bounded count
    ///
    /// A missing or blank value means the default. Values above the maximum
    /// are clamped. Anything else that is not a positive integer is rejected.
    pub fn resolve_limit(&self, raw: Option<&str>) -> AppResult<usize> {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return Ok(self.default_limit.min(self.max_limit));
        };

        let requested: i64 = raw.parse().map_err(|_| {
            AppError::InvalidInput(format!("limit must be a positive integer, got '{}'", raw))
        })?;

        if requested <= 0 {
            return Err(AppError::InvalidInput(format!(
                "limit must be a positive integer, got {}",
                requested
            )));
        }

        Ok((requested as u64).min(self.max_limit as u64) as usize)
    }
}
