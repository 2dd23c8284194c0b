use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::auth::claims::Principal;
use crate::error::ApiError;

/// Principal for handlers that require authentication. Reads the identity
/// the middleware attached; rejects with 401 when none is present.
pub struct AuthUser(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| ApiError::Unauthorized("Missing or invalid bearer token".into()))
    }
}
