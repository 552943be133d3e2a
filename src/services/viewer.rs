use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::{db::SessionStore, models::Viewer};

/// Extracts the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Maps request credentials to a [`Viewer`]
///
/// Missing, malformed, unknown or expired tokens all resolve to
/// `Viewer::Anonymous`, as does a session lookup failure.
pub struct ViewerResolver {
    sessions: Arc<dyn SessionStore>,
}

impl ViewerResolver {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    pub async fn resolve(&self, headers: &HeaderMap) -> Viewer {
        let Some(token) = bearer_token(headers) else {
            return Viewer::Anonymous;
        };

        match self.sessions.viewer_for_token(token).await {
            Ok(Some(user_id)) => Viewer::Identified(user_id),
            Ok(None) => {
                tracing::debug!("Unknown or expired session token");
                Viewer::Anonymous
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session lookup failed, treating viewer as anonymous");
                Viewer::Anonymous
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MockSessionStore;
    use crate::error::AppError;
    use axum::http::HeaderValue;
    use uuid::Uuid;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers_with("Bearer abc123")), Some("abc123"));
        assert_eq!(bearer_token(&headers_with("bearer  abc123 ")), Some("abc123"));
        assert_eq!(bearer_token(&headers_with("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(bearer_token(&headers_with("abc123")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_known_token_resolves_to_identified() {
        let user = Uuid::new_v4();
        let mut sessions = MockSessionStore::new();
        sessions
            .expect_viewer_for_token()
            .withf(|token| token.to_string() == "good")
            .returning(move |_| Ok(Some(user)));

        let viewer = ViewerResolver::new(Arc::new(sessions))
            .resolve(&headers_with("Bearer good"))
            .await;

        assert_eq!(viewer, Viewer::Identified(user));
    }

    #[tokio::test]
    async fn test_missing_header_skips_lookup() {
        let mut sessions = MockSessionStore::new();
        sessions.expect_viewer_for_token().never();

        let viewer = ViewerResolver::new(Arc::new(sessions))
            .resolve(&HeaderMap::new())
            .await;

        assert_eq!(viewer, Viewer::Anonymous);
    }

    #[tokio::test]
    async fn test_unknown_token_and_lookup_failure_are_anonymous() {
        let mut sessions = MockSessionStore::new();
        sessions
            .expect_viewer_for_token()
            .withf(|token| token.to_string() == "stale")
            .returning(|_| Ok(None));
        sessions
            .expect_viewer_for_token()
            .withf(|token| token.to_string() == "boom")
            .returning(|_| Err(AppError::Internal("db down".to_string())));
        let resolver = ViewerResolver::new(Arc::new(sessions));

        assert_eq!(resolver.resolve(&headers_with("Bearer stale")).await, Viewer::Anonymous);
        assert_eq!(resolver.resolve(&headers_with("Bearer boom")).await, Viewer::Anonymous);
    }
}
