use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{RecommendationRequest, RecommendationResult},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    /// Kept raw so malformed values get the JSON error body
    pub limit: Option<String>,
}

/// Handler for `GET /api/v1/recommendations?limit=N`
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Query(params): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResult>> {
    let limit = state
        .recommender
        .policy()
        .resolve_limit(params.limit.as_deref())?;
    let viewer = state.viewer_resolver.resolve(&headers).await;

    tracing::info!(
        request_id = %request_id,
        viewer = %viewer,
        limit,
        "Processing recommendation request"
    );

    let request = RecommendationRequest::new(viewer, limit);

    // Dropping the engine future on timeout abandons its in-flight store reads
    let result = tokio::time::timeout(state.request_timeout, state.recommender.recommend(&request))
        .await
        .map_err(|_| {
            tracing::warn!(
                request_id = %request_id,
                timeout_ms = state.request_timeout.as_millis() as u64,
                "Recommendation request timed out"
            );
            AppError::RecommendationUnavailable("request timed out".to_string())
        })??;

    tracing::info!(
        request_id = %request_id,
        returned = result.len(),
        "Recommendation request completed"
    );

    Ok(Json(result))
}
