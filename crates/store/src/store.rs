use std::collections::BTreeMap;

use async_trait::async_trait;
use common::{AddressId, LineId, Money, OrderId, ProductId, UserId};
use domain::{
    Address, Cart, Order, OrderLine, OrderStatus, PaymentMethod, PaymentStatus, Pricing, Product,
};
use serde::Serialize;

use crate::Result;

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound on the page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A 1-based page request with a clamped page size.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Creates a page request, clamping `page` to at least 1 and `limit`
    /// to `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Returns the 1-based page index.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Returns the page size.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Returns the number of items to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// One page of results plus pagination totals.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub pages: u32,
}

impl<T> Page<T> {
    /// Assembles a page from the fetched items and the overall total.
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let pages = total.div_ceil(u64::from(request.limit())) as u32;
        Self {
            items,
            total,
            page: request.page(),
            pages,
        }
    }
}

/// Everything needed to commit a checkout, assembled by the orchestrator.
///
/// The order id, number, and creation time are assigned by the store at
/// commit time.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    pub shipping_address: Address,
    pub pricing: Pricing,
    pub payment_method: PaymentMethod,
}

/// Aggregate order figures for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct OrderStats {
    pub total_orders: u64,
    /// Sum of order totals across every order, cancelled included.
    pub total_revenue: Money,
    pub orders_by_status: BTreeMap<String, u64>,
    pub payments_by_status: BTreeMap<String, u64>,
}

/// Catalog access and the inventory ledger.
///
/// `decrement_stock` and `restore_stock` are the ledger's two movements:
/// a decrement reduces stock and bumps the cumulative sales counter, a
/// restore reverses both. Restores are not idempotent: callers must pair
/// each restore with exactly one prior decrement (the cancellation commit
/// does this by conditioning the restore on the status transition).
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Inserts a product into the catalog.
    async fn insert_product(&self, product: Product) -> Result<()>;

    /// Loads a product. Returns None if it does not exist.
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Returns true iff current stock covers `quantity`.
    ///
    /// Advisory only: stock may change between this call and any
    /// subsequent write. The binding check is the conditional decrement.
    async fn check_available(&self, product_id: ProductId, quantity: u32) -> Result<bool>;

    /// Atomically decrements stock and increments the sales counter.
    ///
    /// Fails with [`StoreError::InsufficientStock`] and no side effect if
    /// stock is short; the check and the write are one operation.
    ///
    /// [`StoreError::InsufficientStock`]: crate::StoreError::InsufficientStock
    async fn decrement_stock(&self, product_id: ProductId, quantity: u32) -> Result<()>;

    /// Reverses a decrement: stock back up, sales counter back down.
    async fn restore_stock(&self, product_id: ProductId, quantity: u32) -> Result<()>;
}

/// Per-user cart persistence.
///
/// Every method is a single atomic unit, so rapid successive mutations of
/// the same cart serialize instead of losing updates.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Loads the user's cart, creating an empty one on first access.
    async fn fetch_cart(&self, user_id: UserId) -> Result<Cart>;

    /// Merges a quantity of a product into the cart: an existing line for
    /// the product has its quantity summed and unit price refreshed, and
    /// otherwise a new line is appended. Returns the updated cart.
    async fn add_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Cart>;

    /// Replaces a line's quantity and unit price. Fails with `NotFound` if
    /// the line is not in this user's cart.
    async fn update_line(
        &self,
        user_id: UserId,
        line_id: LineId,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Cart>;

    /// Removes a line. Removing an absent line succeeds as a no-op.
    async fn remove_line(&self, user_id: UserId, line_id: LineId) -> Result<Cart>;

    /// Removes every line from the user's cart.
    async fn clear_cart(&self, user_id: UserId) -> Result<Cart>;
}

/// Saved shipping addresses.
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// Inserts an address into the user's address book.
    async fn insert_address(&self, address: Address) -> Result<()>;

    /// Loads an address, scoped to its owner. Returns None if it does not
    /// exist or belongs to a different user.
    async fn get_address(&self, user_id: UserId, address_id: AddressId)
    -> Result<Option<Address>>;
}

/// Order persistence and the two compound commits of the system.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Commits a checkout as one atomic unit: a conditional stock
    /// decrement for every line, allocation of the day's next order
    /// number, the order insert, and the cart clear. If any line's stock
    /// is short the whole unit fails with `InsufficientStock` and nothing
    /// is changed.
    async fn place_order(&self, draft: OrderDraft) -> Result<Order>;

    /// Commits a cancellation as one atomic unit. The status transition
    /// (`pending`/`confirmed` → `cancelled`, payment → `refunded`) is the
    /// guard: stock and sales counters are restored only when it
    /// succeeds, so a second cancel cannot restore twice. Fails with
    /// `NotFound` or `InvalidTransition`.
    async fn cancel_order(&self, user_id: UserId, order_id: OrderId) -> Result<Order>;

    /// Loads an order by id.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Loads an order by id, scoped to its owner.
    async fn get_order_for_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>>;

    /// Lists a user's orders, newest first.
    async fn list_orders_for_user(&self, user_id: UserId, page: PageRequest)
    -> Result<Page<Order>>;

    /// Lists all orders, newest first.
    async fn list_orders(&self, page: PageRequest) -> Result<Page<Order>>;

    /// Administrative fulfillment-status override; stamps shipping
    /// timestamps via the aggregate. Fails with `NotFound` on an unknown
    /// order.
    async fn set_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order>;

    /// Administrative payment-status override. Fails with `NotFound` on an
    /// unknown order.
    async fn set_payment_status(&self, order_id: OrderId, status: PaymentStatus) -> Result<Order>;

    /// Aggregate figures across all orders.
    async fn order_stats(&self) -> Result<OrderStats>;
}

/// Marker for backends that implement every store trait; the bound used by
/// the service layer.
pub trait Backend: ProductStore + CartStore + AddressStore + OrderStore {}

impl<T: ProductStore + CartStore + AddressStore + OrderStore> Backend for T {}
