//! Application services for the storefront backend.
//!
//! [`CartService`] owns cart mutations and the cart view; [`CheckoutService`]
//! owns the cart-to-order conversion, cancellation, and order queries. Both
//! are generic over the store backend so the same logic runs against the
//! in-memory store in tests and PostgreSQL in production.

mod cart_service;
mod checkout_service;
pub mod error;

pub use cart_service::{CartItemView, CartService, CartView, ProductSummary};
pub use checkout_service::{CheckoutRequest, CheckoutService};
pub use error::CheckoutError;
