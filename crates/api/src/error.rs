//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::DomainError;

/// API-level error type that maps to enveloped HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Caller identity missing or malformed.
    Unauthorized,
    /// Caller lacks the required role.
    Forbidden,
    /// Resource not found.
    NotFound(String),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Not authorized".to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Admin access required".to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "internal server error");
                // Detail stays in the logs; debug builds include it in the
                // body to help local troubleshooting.
                let message = if cfg!(debug_assertions) {
                    format!("Server error: {detail}")
                } else {
                    "Server error".to_string()
                };
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        let body = serde_json::json!({ "success": false, "message": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match &err {
            CheckoutError::Validation(_)
            | CheckoutError::EmptyCart
            | CheckoutError::ProductUnavailable { .. }
            | CheckoutError::InsufficientStock { .. }
            | CheckoutError::InvalidTransition { .. } => ApiError::BadRequest(err.to_string()),
            CheckoutError::NotFound { .. } => ApiError::NotFound(capitalize(&err.to_string())),
            CheckoutError::Store(inner) => ApiError::Internal(inner.to_string()),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        // Reaches the API only from status/method string parsing.
        ApiError::BadRequest(capitalize(&err.to_string()))
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
