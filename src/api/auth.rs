//! Session identity extraction.
//!
//! Authentication itself is delegated to the platform's credentials-based
//! session provider, which fronts this service and forwards the resolved
//! user ID in the `x-session-user` header. This module only turns that
//! header into a typed identity; it performs no credential checks.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the session user ID, set by the fronting provider.
pub const SESSION_USER_HEADER: &str = "x-session-user";

/// The authenticated user on in-app routes.
///
/// Rejects with [`ApiError::Unauthenticated`] (401) when the header is
/// absent or not a UUID, so the UI can redirect to login rather than
/// show a permissions message.
#[derive(Debug, Clone, Copy)]
pub struct SessionUser(pub Uuid);

impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(SESSION_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok())
            .map(SessionUser)
            .ok_or(ApiError::Unauthenticated)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<SessionUser, ApiError> {
        let (mut parts, ()) = request.into_parts();
        SessionUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn extracts_valid_user_header() {
        let user_id = Uuid::new_v4();
        let request = Request::builder()
            .header(SESSION_USER_HEADER, user_id.to_string())
            .body(())
            .ok();
        let Some(request) = request else {
            panic!("request build failed");
        };
        let extracted = extract(request).await;
        assert_eq!(extracted.ok().map(|u| u.0), Some(user_id));
    }

    #[tokio::test]
    async fn missing_header_is_unauthenticated() {
        let request = Request::builder().body(()).ok();
        let Some(request) = request else {
            panic!("request build failed");
        };
        assert!(matches!(
            extract(request).await,
            Err(ApiError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn malformed_header_is_unauthenticated() {
        let request = Request::builder()
            .header(SESSION_USER_HEADER, "not-a-uuid")
            .body(())
            .ok();
        let Some(request) = request else {
            panic!("request build failed");
        };
        assert!(matches!(
            extract(request).await,
            Err(ApiError::Unauthenticated)
        ));
    }
}
