// Caller identity
// Decision: Identity is asserted by an upstream gateway in the `x-user-id` header.
// Verifying credentials is the gateway's job; we only require the header to be present.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::api::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller extracted from the request; 401 if absent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Missing caller identity"))?;

        Ok(Self {
            user_id: user_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<CallerIdentity, ApiError> {
        let (mut parts, _) = request.into_parts();
        CallerIdentity::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_header_present() {
        let request = Request::builder()
            .header(USER_ID_HEADER, "alice")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap().user_id, "alice");
    }

    #[tokio::test]
    async fn test_header_missing_or_blank() {
        let missing = Request::builder().body(()).unwrap();
        assert!(matches!(extract(missing).await, Err(ApiError::Unauthorized(_))));

        let blank = Request::builder()
            .header(USER_ID_HEADER, "  ")
            .body(())
            .unwrap();
        assert!(matches!(extract(blank).await, Err(ApiError::Unauthorized(_))));
    }
}
