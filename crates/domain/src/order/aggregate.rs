//! Order aggregate.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::DomainError;
use crate::pricing::Pricing;

use super::number::OrderNumber;
use super::state::{OrderStatus, PaymentMethod, PaymentStatus};

/// Immutable snapshot of one cart line, captured at checkout.
///
/// Decoupled from the cart line and the product after creation: later
/// price, name, or stock changes never alter a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    /// Returns quantity times the captured unit price.
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Courier and delivery metadata, filled in as fulfillment progresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub courier: Option<String>,
    pub tracking_number: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// A placed order.
///
/// Created once at checkout with its lines, address, and pricing already
/// snapshotted; afterwards only the status fields and shipping metadata
/// change, and only through the methods below. Orders are never deleted;
/// cancellation is a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    pub shipping_address: Address,
    pub pricing: Pricing,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub shipping: ShippingInfo,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order in `pending`/`pending` status.
    pub fn place(
        order_number: OrderNumber,
        user_id: UserId,
        lines: Vec<OrderLine>,
        shipping_address: Address,
        pricing: Pricing,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            id: OrderId::new(),
            order_number,
            user_id,
            lines,
            shipping_address,
            pricing,
            payment_method,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Pending,
            shipping: ShippingInfo::default(),
            created_at: Utc::now(),
        }
    }

    /// Applies the cancellation transition.
    ///
    /// Only valid while the status still permits it (`pending` or
    /// `confirmed`). On success the order moves to `cancelled` and the
    /// payment to `refunded`. The caller owns the compensating stock
    /// restore and must perform it only when this guard passes.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        if !self.order_status.can_cancel() {
            return Err(DomainError::InvalidTransition {
                status: self.order_status,
                action: "cancel",
            });
        }
        self.order_status = OrderStatus::Cancelled;
        self.payment_status = PaymentStatus::Refunded;
        Ok(())
    }

    /// Administrative status override: any enumerated target is accepted.
    ///
    /// Entering `shipped` or `delivered` stamps the corresponding
    /// timestamp the first time.
    pub fn set_order_status(&mut self, status: OrderStatus) {
        self.order_status = status;
        match status {
            OrderStatus::Shipped if self.shipping.shipped_at.is_none() => {
                self.shipping.shipped_at = Some(Utc::now());
            }
            OrderStatus::Delivered if self.shipping.delivered_at.is_none() => {
                self.shipping.delivered_at = Some(Utc::now());
            }
            _ => {}
        }
    }

    /// Administrative payment status override, unguarded.
    pub fn set_payment_status(&mut self, status: PaymentStatus) {
        self.payment_status = status;
    }

    /// Sum of line quantities.
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}
