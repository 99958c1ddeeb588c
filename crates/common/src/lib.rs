//! Shared types for the storefront backend.
//!
//! Typed identifiers keep user, product, order, address, and cart-line
//! references from being mixed up, and [`Money`] keeps all amounts in
//! integer minor units.

mod ids;
mod money;

pub use ids::{AddressId, LineId, OrderId, ProductId, UserId};
pub use money::Money;
