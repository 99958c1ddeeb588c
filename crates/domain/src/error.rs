//! Domain error types.

use thiserror::Error;

use crate::order::OrderStatus;

/// Errors raised by domain rules.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The order is not in a state that permits the requested transition.
    #[error("cannot {action} an order in {status} status")]
    InvalidTransition {
        status: OrderStatus,
        action: &'static str,
    },

    /// Not a recognized order status value.
    #[error("invalid order status: {0}")]
    UnknownOrderStatus(String),

    /// Not a recognized payment status value.
    #[error("invalid payment status: {0}")]
    UnknownPaymentStatus(String),

    /// Not a recognized payment method value.
    #[error("invalid payment method: {0}")]
    UnknownPaymentMethod(String),
}
