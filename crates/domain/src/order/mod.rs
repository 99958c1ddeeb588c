//! Order aggregate and related types.

mod aggregate;
mod number;
mod state;

pub use aggregate::{Order, OrderLine, ShippingInfo};
pub use number::OrderNumber;
pub use state::{OrderStatus, PaymentMethod, PaymentStatus};
