//! HTTP route handlers.

pub mod cart;
pub mod health;
pub mod metrics;
pub mod orders;

use std::str::FromStr;

use crate::error::ApiError;

/// Parses a path identifier, rejecting malformed values as a 400.
pub(crate) fn parse_id<T: FromStr>(id: &str) -> Result<T, ApiError> {
    id.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid ID format: {id}")))
}
