use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use common::{AddressId, LineId, Money, OrderId, ProductId, UserId};
use domain::{Address, Cart, Order, OrderNumber, OrderStatus, PaymentStatus, Product};
use tokio::sync::RwLock;

use crate::store::{
    AddressStore, CartStore, OrderDraft, OrderStats, OrderStore, Page, PageRequest, ProductStore,
};
use crate::{Result, StoreError};

#[derive(Default)]
struct State {
    products: HashMap<ProductId, Product>,
    carts: HashMap<UserId, Cart>,
    addresses: HashMap<AddressId, Address>,
    /// Insertion order; newest last.
    orders: Vec<Order>,
    /// Per-day order-number counters.
    counters: HashMap<NaiveDate, u32>,
}

/// In-memory store implementation for tests and development.
///
/// All state sits behind one `RwLock`, so every trait method is a single
/// critical section. That is what makes the compound commits
/// ([`OrderStore::place_order`], [`OrderStore::cancel_order`]) atomic here,
/// and what serializes concurrent mutations of the same cart.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of placed orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

fn restore_product(products: &mut HashMap<ProductId, Product>, product_id: ProductId, qty: u32) {
    if let Some(product) = products.get_mut(&product_id) {
        product.stock += qty;
        product.total_sales = product.total_sales.saturating_sub(u64::from(qty));
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn insert_product(&self, product: Product) -> Result<()> {
        self.state
            .write()
            .await
            .products
            .insert(product.id, product);
        Ok(())
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&product_id).cloned())
    }

    async fn check_available(&self, product_id: ProductId, quantity: u32) -> Result<bool> {
        let state = self.state.read().await;
        let product = state
            .products
            .get(&product_id)
            .ok_or_else(|| StoreError::not_found("product", product_id))?;
        Ok(product.has_stock(quantity))
    }

    async fn decrement_stock(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(&product_id)
            .ok_or_else(|| StoreError::not_found("product", product_id))?;
        if product.stock < quantity {
            return Err(StoreError::InsufficientStock {
                product_id,
                available: product.stock,
            });
        }
        product.stock -= quantity;
        product.total_sales += u64::from(quantity);
        Ok(())
    }

    async fn restore_stock(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.products.contains_key(&product_id) {
            return Err(StoreError::not_found("product", product_id));
        }
        restore_product(&mut state.products, product_id, quantity);
        Ok(())
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn fetch_cart(&self, user_id: UserId) -> Result<Cart> {
        let mut state = self.state.write().await;
        Ok(state
            .carts
            .entry(user_id)
            .or_insert_with(|| Cart::empty(user_id))
            .clone())
    }

    async fn add_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Cart> {
        let mut state = self.state.write().await;
        let cart = state
            .carts
            .entry(user_id)
            .or_insert_with(|| Cart::empty(user_id));
        cart.add_line(product_id, quantity, unit_price);
        Ok(cart.clone())
    }

    async fn update_line(
        &self,
        user_id: UserId,
        line_id: LineId,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Cart> {
        let mut state = self.state.write().await;
        let cart = state
            .carts
            .entry(user_id)
            .or_insert_with(|| Cart::empty(user_id));
        let line = cart
            .line_mut(line_id)
            .ok_or_else(|| StoreError::not_found("cart item", line_id))?;
        line.quantity = quantity;
        line.unit_price = unit_price;
        Ok(cart.clone())
    }

    async fn remove_line(&self, user_id: UserId, line_id: LineId) -> Result<Cart> {
        let mut state = self.state.write().await;
        let cart = state
            .carts
            .entry(user_id)
            .or_insert_with(|| Cart::empty(user_id));
        cart.remove_line(line_id);
        Ok(cart.clone())
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<Cart> {
        let mut state = self.state.write().await;
        let cart = state
            .carts
            .entry(user_id)
            .or_insert_with(|| Cart::empty(user_id));
        cart.clear();
        Ok(cart.clone())
    }
}

#[async_trait]
impl AddressStore for InMemoryStore {
    async fn insert_address(&self, address: Address) -> Result<()> {
        self.state
            .write()
            .await
            .addresses
            .insert(address.id, address);
        Ok(())
    }

    async fn get_address(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<Option<Address>> {
        let state = self.state.read().await;
        Ok(state
            .addresses
            .get(&address_id)
            .filter(|a| a.user_id == user_id)
            .cloned())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn place_order(&self, draft: OrderDraft) -> Result<Order> {
        let mut state = self.state.write().await;

        // Validate every line before touching anything, so a short line
        // leaves the whole commit untouched.
        for line in &draft.lines {
            let product = state
                .products
                .get(&line.product_id)
                .ok_or_else(|| StoreError::not_found("product", line.product_id))?;
            if product.stock < line.quantity {
                return Err(StoreError::InsufficientStock {
                    product_id: line.product_id,
                    available: product.stock,
                });
            }
        }

        for line in &draft.lines {
            if let Some(product) = state.products.get_mut(&line.product_id) {
                product.stock -= line.quantity;
                product.total_sales += u64::from(line.quantity);
            }
        }

        let day = Utc::now().date_naive();
        let sequence = state.counters.entry(day).or_insert(0);
        *sequence += 1;
        let order_number = OrderNumber::from_parts(day, *sequence);

        let order = Order::place(
            order_number,
            draft.user_id,
            draft.lines,
            draft.shipping_address,
            draft.pricing,
            draft.payment_method,
        );

        if let Some(cart) = state.carts.get_mut(&draft.user_id) {
            cart.clear();
        }
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn cancel_order(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        let mut state = self.state.write().await;
        let State {
            orders, products, ..
        } = &mut *state;

        let order = orders
            .iter_mut()
            .find(|o| o.id == order_id && o.user_id == user_id)
            .ok_or_else(|| StoreError::not_found("order", order_id))?;

        let status = order.order_status;
        order
            .cancel()
            .map_err(|_| StoreError::InvalidTransition { status })?;

        // The transition succeeded, so this is the one restore this order
        // will ever get.
        for line in &order.lines {
            restore_product(products, line.product_id, line.quantity);
        }
        Ok(order.clone())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.iter().find(|o| o.id == order_id).cloned())
    }

    async fn get_order_for_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .find(|o| o.id == order_id && o.user_id == user_id)
            .cloned())
    }

    async fn list_orders_for_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Order>> {
        let state = self.state.read().await;
        let matching: Vec<&Order> = state
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .collect();
        paginate(matching, page)
    }

    async fn list_orders(&self, page: PageRequest) -> Result<Page<Order>> {
        let state = self.state.read().await;
        let matching: Vec<&Order> = state.orders.iter().rev().collect();
        paginate(matching, page)
    }

    async fn set_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| StoreError::not_found("order", order_id))?;
        order.set_order_status(status);
        Ok(order.clone())
    }

    async fn set_payment_status(&self, order_id: OrderId, status: PaymentStatus) -> Result<Order> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| StoreError::not_found("order", order_id))?;
        order.set_payment_status(status);
        Ok(order.clone())
    }

    async fn order_stats(&self) -> Result<OrderStats> {
        let state = self.state.read().await;
        let mut stats = OrderStats {
            total_orders: state.orders.len() as u64,
            total_revenue: Money::zero(),
            orders_by_status: Default::default(),
            payments_by_status: Default::default(),
        };
        for order in &state.orders {
            stats.total_revenue += order.pricing.total;
            *stats
                .orders_by_status
                .entry(order.order_status.as_str().to_string())
                .or_insert(0) += 1;
            *stats
                .payments_by_status
                .entry(order.payment_status.as_str().to_string())
                .or_insert(0) += 1;
        }
        Ok(stats)
    }
}

fn paginate(matching: Vec<&Order>, page: PageRequest) -> Result<Page<Order>> {
    let total = matching.len() as u64;
    let items = matching
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .cloned()
        .collect();
    Ok(Page::new(items, total, page))
}
