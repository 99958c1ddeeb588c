//! Checkout orchestration and order operations.

use std::collections::HashMap;

use common::{AddressId, OrderId, ProductId, UserId};
use domain::{Order, OrderLine, OrderStatus, PaymentMethod, PaymentStatus, Pricing};
use store::{
    AddressStore, Backend, CartStore, OrderDraft, OrderStats, OrderStore, Page, PageRequest,
    ProductStore, StoreError,
};

use crate::error::{CheckoutError, Result};

/// Input to [`CheckoutService::checkout`]. Both fields are required; they
/// are optional here so that missing input is reported as a validation
/// failure rather than a deserialization one.
#[derive(Debug, Clone, Default)]
pub struct CheckoutRequest {
    pub shipping_address_id: Option<AddressId>,
    pub payment_method: Option<PaymentMethod>,
}

/// Coordinates carts, the inventory ledger, and orders.
///
/// The multi-step conversion of a cart into an order is delegated to the
/// store's single atomic commit; this service owns the validation, the
/// address snapshot, and the pricing around it.
#[derive(Clone)]
pub struct CheckoutService<S> {
    store: S,
}

impl<S: Backend> CheckoutService<S> {
    /// Creates a checkout service over the given backend.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Converts the user's cart into an order.
    ///
    /// Validates input, re-checks stock per line (the authoritative check
    /// is the conditional decrement inside the commit), snapshots the
    /// shipping address and order lines, computes pricing from the cart's
    /// stored unit prices, and commits everything as one unit. On success
    /// stock is decremented, the cart is empty, and exactly one new order
    /// exists; on failure none of those are visible.
    #[tracing::instrument(skip(self, request))]
    pub async fn checkout(&self, user_id: UserId, request: CheckoutRequest) -> Result<Order> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = std::time::Instant::now();

        // 1. Required input
        let (Some(address_id), Some(payment_method)) =
            (request.shipping_address_id, request.payment_method)
        else {
            return Err(CheckoutError::Validation(
                "Shipping address and payment method are required".to_string(),
            ));
        };

        // 2. The cart must have something in it
        let cart = self.store.fetch_cart(user_id).await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        // 3. Address snapshot, scoped to the caller
        let address = self
            .store
            .get_address(user_id, address_id)
            .await?
            .ok_or(CheckoutError::NotFound {
                entity: "shipping address",
            })?;

        // 4. Per-line stock re-check and line snapshots. This supersedes
        //    any check done when the items went into the cart; stock may
        //    have moved since.
        let mut lines = Vec::with_capacity(cart.len());
        let mut names: HashMap<ProductId, String> = HashMap::new();
        for line in &cart.lines {
            let product = self
                .store
                .get_product(line.product_id)
                .await?
                .ok_or(CheckoutError::NotFound { entity: "product" })?;
            if product.stock < line.quantity {
                return Err(CheckoutError::InsufficientStock {
                    name: product.name,
                    available: product.stock,
                });
            }
            names.insert(product.id, product.name.clone());
            lines.push(OrderLine {
                product_id: line.product_id,
                name: product.name,
                quantity: line.quantity,
                // The price captured on the cart line, not the live one.
                unit_price: line.unit_price,
            });
        }

        // 5. Pricing, computed once and stored on the order
        let pricing = Pricing::compute(cart.subtotal());

        // 6. One atomic commit: conditional decrements, order number,
        //    order insert, cart clear.
        let draft = OrderDraft {
            user_id,
            lines,
            shipping_address: address,
            pricing,
            payment_method,
        };
        let order = self.store.place_order(draft).await.map_err(|err| {
            // A line can still come up short inside the commit if a
            // concurrent checkout won the race; name the product for the
            // customer the way the pre-check would have.
            if let StoreError::InsufficientStock {
                product_id,
                available,
            } = &err
            {
                let name = names
                    .get(product_id)
                    .cloned()
                    .unwrap_or_else(|| product_id.to_string());
                return CheckoutError::InsufficientStock {
                    name,
                    available: *available,
                };
            }
            err.into()
        })?;

        metrics::counter!("orders_placed_total").increment(1);
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(
            order_number = %order.order_number,
            total_cents = order.pricing.total.cents(),
            "checkout complete"
        );
        Ok(order)
    }

    /// Cancels one of the user's orders, restoring stock.
    ///
    /// Valid only while the order is `pending` or `confirmed`; the store's
    /// guarded transition keeps the restore at-most-once even under
    /// concurrent cancels.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        let order = self.store.cancel_order(user_id, order_id).await?;
        metrics::counter!("orders_cancelled_total").increment(1);
        Ok(order)
    }

    /// Loads one of the user's orders.
    pub async fn get_order(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        self.store
            .get_order_for_user(user_id, order_id)
            .await?
            .ok_or(CheckoutError::NotFound { entity: "order" })
    }

    /// Lists the user's orders, newest first.
    pub async fn list_orders(&self, user_id: UserId, page: PageRequest) -> Result<Page<Order>> {
        Ok(self.store.list_orders_for_user(user_id, page).await?)
    }

    /// Lists every order, newest first (administrative).
    pub async fn list_all_orders(&self, page: PageRequest) -> Result<Page<Order>> {
        Ok(self.store.list_orders(page).await?)
    }

    /// Administrative fulfillment-status override. Any enumerated target
    /// is accepted; only the customer cancel path is guarded.
    #[tracing::instrument(skip(self))]
    pub async fn set_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        Ok(self.store.set_order_status(order_id, status).await?)
    }

    /// Administrative payment-status override, unguarded.
    #[tracing::instrument(skip(self))]
    pub async fn set_payment_status(
        &self,
        order_id: OrderId,
        status: PaymentStatus,
    ) -> Result<Order> {
        Ok(self.store.set_payment_status(order_id, status).await?)
    }

    /// Aggregate order figures (administrative).
    pub async fn order_stats(&self) -> Result<OrderStats> {
        Ok(self.store.order_stats().await?)
    }
}
