//! Store error types.

use common::ProductId;
use domain::OrderStatus;
use thiserror::Error;

/// Errors that can occur in the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced entity does not exist (or is not visible to the
    /// requesting user).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A conditional stock decrement found fewer units than requested.
    /// Carries what is actually available.
    #[error("insufficient stock for product {product_id}: {available} available")]
    InsufficientStock {
        product_id: ProductId,
        available: u32,
    },

    /// A guarded status transition found the order in a status that does
    /// not permit it.
    #[error("cannot cancel an order in {status} status")]
    InvalidTransition { status: OrderStatus },

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Persisted data failed to serialize or deserialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Persisted data was readable but not interpretable.
    #[error("stored data could not be decoded: {0}")]
    Decode(String),
}

impl StoreError {
    /// Convenience constructor for [`StoreError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Convenience alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
