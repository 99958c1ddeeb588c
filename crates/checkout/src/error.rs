//! Service error types.

use domain::OrderStatus;
use store::StoreError;
use thiserror::Error;

/// Errors reported at the service boundary.
///
/// Business-rule failures carry a customer-facing message and are never
/// retried; persistence failures stay wrapped so the API layer can keep
/// their detail out of production responses.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// The cart has no lines to check out.
    #[error("Cart is empty")]
    EmptyCart,

    /// The product exists but is not purchasable.
    #[error("{name} is not available")]
    ProductUnavailable { name: String },

    /// More units requested than are in stock; carries what is available.
    #[error("{name}: only {available} in stock")]
    InsufficientStock { name: String, available: u32 },

    /// The entity does not exist or is not visible to the caller.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// The order's current status does not permit the transition.
    #[error("Cannot cancel order with status: {status}")]
    InvalidTransition { status: OrderStatus },

    /// Persistence failure.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, .. } => CheckoutError::NotFound { entity },
            StoreError::InvalidTransition { status } => CheckoutError::InvalidTransition { status },
            StoreError::InsufficientStock {
                product_id,
                available,
            } => CheckoutError::InsufficientStock {
                name: product_id.to_string(),
                available,
            },
            other => CheckoutError::Store(other),
        }
    }
}

/// Convenience alias for service results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
