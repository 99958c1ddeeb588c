//! Caller identity extraction.
//!
//! Authentication is handled in front of this service; the proxy injects
//! the verified identity as `x-user-id` (UUID) and `x-user-role` headers.
//! A missing or malformed identity is a 401; a non-admin caller on an
//! admin route is a 403.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;

use crate::error::ApiError;

const USER_HEADER: &str = "x-user-id";
const ROLE_HEADER: &str = "x-user-role";

/// The authenticated storefront user.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .ok_or(ApiError::Unauthorized)?;
        Ok(AuthUser(user_id))
    }
}

/// An authenticated user carrying the `admin` role.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;
        let role = parts
            .headers
            .get(ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if role != "admin" {
            return Err(ApiError::Forbidden);
        }
        Ok(AdminUser(user_id))
    }
}
