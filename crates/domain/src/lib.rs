//! Domain model for the storefront backend.
//!
//! This crate is pure data and rules: catalog and address records, the cart
//! aggregate, the order aggregate with its status state machine, order
//! number formatting, and pricing. Persistence and orchestration live in
//! the `store` and `checkout` crates.

pub mod address;
pub mod cart;
pub mod error;
pub mod order;
pub mod pricing;
pub mod product;

pub use address::Address;
pub use cart::{Cart, CartLine};
pub use error::DomainError;
pub use order::{
    Order, OrderLine, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus, ShippingInfo,
};
pub use pricing::{Pricing, SHIPPING_FEE_CENTS, TAX_RATE_PERCENT};
pub use product::Product;
