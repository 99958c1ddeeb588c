use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use common::{AddressId, LineId, Money, OrderId, ProductId, UserId};
use domain::{
    Address, Cart, CartLine, Order, OrderLine, OrderNumber, OrderStatus, PaymentMethod,
    PaymentStatus, Pricing, Product,
};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::store::{
    AddressStore, CartStore, OrderDraft, OrderStats, OrderStore, Page, PageRequest, ProductStore,
};
use crate::{Result, StoreError};

const ORDER_COLUMNS: &str = "id, order_number, user_id, lines, shipping_address, \
     subtotal_cents, shipping_fee_cents, tax_cents, total_cents, \
     payment_method, payment_status, order_status, shipping, created_at";

/// PostgreSQL-backed store implementation.
///
/// Checkout and cancellation run inside a single transaction each, with
/// the stock guard expressed as a conditional `UPDATE … WHERE stock >= $n`
/// so that two concurrent commits cannot both pass a pre-check and drive
/// stock negative. Order numbers come from an `ON CONFLICT … DO UPDATE`
/// per-day counter row.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

fn to_u32(value: i64, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Decode(format!("{what} out of range: {value}")))
}

fn parse_status<T>(raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| StoreError::Decode(e.to_string()))
}

fn row_to_order(row: &PgRow) -> Result<Order> {
    let lines: serde_json::Value = row.try_get("lines")?;
    let shipping_address: serde_json::Value = row.try_get("shipping_address")?;
    let shipping: serde_json::Value = row.try_get("shipping")?;

    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_number: OrderNumber::from(row.try_get::<String, _>("order_number")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        lines: serde_json::from_value::<Vec<OrderLine>>(lines)?,
        shipping_address: serde_json::from_value::<Address>(shipping_address)?,
        pricing: Pricing {
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
            shipping_fee: Money::from_cents(row.try_get("shipping_fee_cents")?),
            tax: Money::from_cents(row.try_get("tax_cents")?),
            total: Money::from_cents(row.try_get("total_cents")?),
        },
        payment_method: parse_status::<PaymentMethod>(row.try_get("payment_method")?)?,
        payment_status: parse_status::<PaymentStatus>(row.try_get("payment_status")?)?,
        order_status: parse_status::<OrderStatus>(row.try_get("order_status")?)?,
        shipping: serde_json::from_value(shipping)?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_cart_line(row: &PgRow) -> Result<CartLine> {
    Ok(CartLine {
        id: LineId::from_uuid(row.try_get::<Uuid, _>("id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        quantity: to_u32(row.try_get("quantity")?, "cart quantity")?,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
    })
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock: to_u32(row.try_get("stock")?, "stock")?,
        total_sales: row.try_get::<i64, _>("total_sales")? as u64,
        is_active: row.try_get("is_active")?,
    })
}

fn row_to_address(row: &PgRow) -> Result<Address> {
    Ok(Address {
        id: AddressId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        full_name: row.try_get("full_name")?,
        phone: row.try_get("phone")?,
        street: row.try_get("street")?,
        barangay: row.try_get("barangay")?,
        city: row.try_get("city")?,
        province: row.try_get("province")?,
        zip_code: row.try_get("zip_code")?,
    })
}

/// Conditional decrement: the availability check and the write are one
/// statement, so concurrent callers cannot both pass and oversell.
async fn decrement_stock_on(
    conn: &mut PgConnection,
    product_id: ProductId,
    quantity: u32,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE products \
         SET stock = stock - $2, total_sales = total_sales + $2 \
         WHERE id = $1 AND stock >= $2",
    )
    .bind(product_id.as_uuid())
    .bind(i64::from(quantity))
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(product_id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?;
        return Err(match available {
            Some(stock) => StoreError::InsufficientStock {
                product_id,
                available: to_u32(stock, "stock")?,
            },
            None => StoreError::not_found("product", product_id),
        });
    }
    Ok(())
}

async fn restore_stock_on(
    conn: &mut PgConnection,
    product_id: ProductId,
    quantity: u32,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE products \
         SET stock = stock + $2, total_sales = GREATEST(total_sales - $2, 0) \
         WHERE id = $1",
    )
    .bind(product_id.as_uuid())
    .bind(i64::from(quantity))
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::not_found("product", product_id));
    }
    Ok(())
}

async fn fetch_cart_on(conn: &mut PgConnection, user_id: UserId) -> Result<Cart> {
    let rows = sqlx::query(
        "SELECT id, product_id, quantity, unit_price_cents \
         FROM cart_lines WHERE user_id = $1 ORDER BY created_at, id",
    )
    .bind(user_id.as_uuid())
    .fetch_all(conn)
    .await?;

    let mut cart = Cart::empty(user_id);
    for row in &rows {
        cart.lines.push(row_to_cart_line(row)?);
    }
    Ok(cart)
}

async fn insert_order_on(conn: &mut PgConnection, order: &Order) -> Result<()> {
    sqlx::query(
        "INSERT INTO orders (id, order_number, user_id, lines, shipping_address, \
         subtotal_cents, shipping_fee_cents, tax_cents, total_cents, \
         payment_method, payment_status, order_status, shipping, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
    )
    .bind(order.id.as_uuid())
    .bind(order.order_number.as_str())
    .bind(order.user_id.as_uuid())
    .bind(serde_json::to_value(&order.lines)?)
    .bind(serde_json::to_value(&order.shipping_address)?)
    .bind(order.pricing.subtotal.cents())
    .bind(order.pricing.shipping_fee.cents())
    .bind(order.pricing.tax.cents())
    .bind(order.pricing.total.cents())
    .bind(order.payment_method.as_str())
    .bind(order.payment_status.as_str())
    .bind(order.order_status.as_str())
    .bind(serde_json::to_value(&order.shipping)?)
    .bind(order.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

async fn update_order_status_row(conn: &mut PgConnection, order: &Order) -> Result<()> {
    sqlx::query(
        "UPDATE orders SET order_status = $2, payment_status = $3, shipping = $4 WHERE id = $1",
    )
    .bind(order.id.as_uuid())
    .bind(order.order_status.as_str())
    .bind(order.payment_status.as_str())
    .bind(serde_json::to_value(&order.shipping)?)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn insert_product(&self, product: Product) -> Result<()> {
        sqlx::query(
            "INSERT INTO products (id, name, slug, price_cents, stock, total_sales, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.slug)
        .bind(product.price.cents())
        .bind(i64::from(product.stock))
        .bind(product.total_sales as i64)
        .bind(product.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, slug, price_cents, stock, total_sales, is_active \
             FROM products WHERE id = $1",
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_product).transpose()
    }

    async fn check_available(&self, product_id: ProductId, quantity: u32) -> Result<bool> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(product_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        let stock = stock.ok_or_else(|| StoreError::not_found("product", product_id))?;
        Ok(stock >= i64::from(quantity))
    }

    async fn decrement_stock(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        decrement_stock_on(&mut conn, product_id, quantity).await
    }

    async fn restore_stock(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        restore_stock_on(&mut conn, product_id, quantity).await
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn fetch_cart(&self, user_id: UserId) -> Result<Cart> {
        let mut conn = self.pool.acquire().await?;
        fetch_cart_on(&mut conn, user_id).await
    }

    async fn add_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Cart> {
        let mut conn = self.pool.acquire().await?;
        // One statement makes the merge atomic under concurrent adds; the
        // unique (user_id, product_id) key is the per-product line rule.
        sqlx::query(
            "INSERT INTO cart_lines (id, user_id, product_id, quantity, unit_price_cents) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id, product_id) DO UPDATE SET \
             quantity = cart_lines.quantity + EXCLUDED.quantity, \
             unit_price_cents = EXCLUDED.unit_price_cents",
        )
        .bind(LineId::new().as_uuid())
        .bind(user_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(i64::from(quantity))
        .bind(unit_price.cents())
        .execute(&mut *conn)
        .await?;

        fetch_cart_on(&mut conn, user_id).await
    }

    async fn update_line(
        &self,
        user_id: UserId,
        line_id: LineId,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Cart> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query(
            "UPDATE cart_lines SET quantity = $3, unit_price_cents = $4 \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(line_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(i64::from(quantity))
        .bind(unit_price.cents())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("cart item", line_id));
        }
        fetch_cart_on(&mut conn, user_id).await
    }

    async fn remove_line(&self, user_id: UserId, line_id: LineId) -> Result<Cart> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("DELETE FROM cart_lines WHERE id = $1 AND user_id = $2")
            .bind(line_id.as_uuid())
            .bind(user_id.as_uuid())
            .execute(&mut *conn)
            .await?;
        fetch_cart_on(&mut conn, user_id).await
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<Cart> {
        sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(Cart::empty(user_id))
    }
}

#[async_trait]
impl AddressStore for PostgresStore {
    async fn insert_address(&self, address: Address) -> Result<()> {
        sqlx::query(
            "INSERT INTO addresses (id, user_id, full_name, phone, street, barangay, city, \
             province, zip_code) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(address.id.as_uuid())
        .bind(address.user_id.as_uuid())
        .bind(&address.full_name)
        .bind(&address.phone)
        .bind(&address.street)
        .bind(&address.barangay)
        .bind(&address.city)
        .bind(&address.province)
        .bind(&address.zip_code)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_address(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<Option<Address>> {
        let row = sqlx::query(
            "SELECT id, user_id, full_name, phone, street, barangay, city, province, zip_code \
             FROM addresses WHERE id = $1 AND user_id = $2",
        )
        .bind(address_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_address).transpose()
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn place_order(&self, draft: OrderDraft) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        // Conditional decrements first: the first short line aborts the
        // transaction and nothing (stock, counter, order, cart) is kept.
        for line in &draft.lines {
            decrement_stock_on(&mut tx, line.product_id, line.quantity).await?;
        }

        let day = Utc::now().date_naive();
        let sequence: i64 = sqlx::query_scalar(
            "INSERT INTO order_counters (day, value) VALUES ($1, 1) \
             ON CONFLICT (day) DO UPDATE SET value = order_counters.value + 1 \
             RETURNING value",
        )
        .bind(day)
        .fetch_one(&mut *tx)
        .await?;

        let order = Order::place(
            OrderNumber::from_parts(day, to_u32(sequence, "order sequence")?),
            draft.user_id,
            draft.lines,
            draft.shipping_address,
            draft.pricing,
            draft.payment_method,
        );

        insert_order_on(&mut tx, &order).await?;

        sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
            .bind(draft.user_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            "order committed"
        );
        Ok(order)
    }

    async fn cancel_order(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        // The conditional update is the at-most-once guard: of two
        // concurrent cancels only one sees a cancellable status, and only
        // that one reaches the stock restore below.
        let row = sqlx::query(&format!(
            "UPDATE orders SET order_status = 'cancelled', payment_status = 'refunded' \
             WHERE id = $1 AND user_id = $2 \
             AND order_status IN ('pending', 'confirmed') \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            let status: Option<String> = sqlx::query_scalar(
                "SELECT order_status FROM orders WHERE id = $1 AND user_id = $2",
            )
            .bind(order_id.as_uuid())
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;
            return Err(match status {
                Some(raw) => StoreError::InvalidTransition {
                    status: parse_status(&raw)?,
                },
                None => StoreError::not_found("order", order_id),
            });
        };

        let order = row_to_order(&row)?;
        for line in &order.lines {
            restore_stock_on(&mut tx, line.product_id, line.quantity).await?;
        }

        tx.commit().await?;
        tracing::info!(order_id = %order.id, "order cancelled, stock restored");
        Ok(order)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_order).transpose()
    }

    async fn get_order_for_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND user_id = $2"
        ))
        .bind(order_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_order).transpose()
    }

    async fn list_orders_for_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id.as_uuid())
        .bind(i64::from(page.limit()))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        let items: Vec<Order> = rows.iter().map(row_to_order).collect::<Result<_>>()?;
        Ok(Page::new(items, total as u64, page))
    }

    async fn list_orders(&self, page: PageRequest) -> Result<Page<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(page.limit()))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        let items: Vec<Order> = rows.iter().map(row_to_order).collect::<Result<_>>()?;
        Ok(Page::new(items, total as u64, page))
    }

    async fn set_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found("order", order_id))?;

        let mut order = row_to_order(&row)?;
        order.set_order_status(status);
        update_order_status_row(&mut tx, &order).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn set_payment_status(&self, order_id: OrderId, status: PaymentStatus) -> Result<Order> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found("order", order_id))?;

        let mut order = row_to_order(&row)?;
        order.set_payment_status(status);
        update_order_status_row(&mut tx, &order).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn order_stats(&self) -> Result<OrderStats> {
        let total_orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        let total_revenue: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(total_cents), 0) FROM orders")
                .fetch_one(&self.pool)
                .await?;

        let mut orders_by_status = BTreeMap::new();
        let rows =
            sqlx::query("SELECT order_status, COUNT(*) AS count FROM orders GROUP BY order_status")
                .fetch_all(&self.pool)
                .await?;
        for row in rows {
            let status: String = row.try_get("order_status")?;
            let count: i64 = row.try_get("count")?;
            orders_by_status.insert(status, count as u64);
        }

        let mut payments_by_status = BTreeMap::new();
        let rows = sqlx::query(
            "SELECT payment_status, COUNT(*) AS count FROM orders GROUP BY payment_status",
        )
        .fetch_all(&self.pool)
        .await?;
        for row in rows {
            let status: String = row.try_get("payment_status")?;
            let count: i64 = row.try_get("count")?;
            payments_by_status.insert(status, count as u64);
        }

        Ok(OrderStats {
            total_orders: total_orders as u64,
            total_revenue: Money::from_cents(total_revenue),
            orders_by_status,
            payments_by_status,
        })
    }
}
