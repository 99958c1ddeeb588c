//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use common::{AddressId, Money, UserId};
use domain::{Address, OrderLine, OrderStatus, PaymentMethod, PaymentStatus, Pricing, Product};
use sqlx::PgPool;
use store::{
    CartStore, OrderDraft, OrderStore, PageRequest, PostgresStore, ProductStore, StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run the schema using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!("../../../migrations/001_create_storefront.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn store() -> PostgresStore {
    let info = get_container_info().await;
    let pool = PgPool::connect(&info.connection_string).await.unwrap();
    PostgresStore::new(pool)
}

fn sample_product(price: i64, stock: u32) -> Product {
    // Unique name per call so the slug unique index never collides across
    // tests sharing one database.
    let name = format!("Helmet {}", UserId::new());
    Product::new(name, Money::from_cents(price), stock)
}

fn sample_address(user_id: UserId) -> Address {
    Address {
        id: AddressId::new(),
        user_id,
        full_name: "Ramon Reyes".to_string(),
        phone: "09171234567".to_string(),
        street: "12 Mabini St".to_string(),
        barangay: Some("Poblacion".to_string()),
        city: "Makati".to_string(),
        province: "Metro Manila".to_string(),
        zip_code: "1210".to_string(),
    }
}

fn draft(user_id: UserId, product: &Product, quantity: u32) -> OrderDraft {
    OrderDraft {
        user_id,
        lines: vec![OrderLine {
            product_id: product.id,
            name: product.name.clone(),
            quantity,
            unit_price: product.price,
        }],
        shipping_address: sample_address(user_id),
        pricing: Pricing::compute(product.price.multiply(quantity)),
        payment_method: PaymentMethod::CashOnDelivery,
    }
}

#[tokio::test]
async fn conditional_decrement_enforces_stock() {
    let store = store().await;
    let product = sample_product(1000, 2);
    let id = product.id;
    store.insert_product(product).await.unwrap();

    store.decrement_stock(id, 2).await.unwrap();
    let err = store.decrement_stock(id, 1).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::InsufficientStock { available: 0, .. }
    ));

    let after = store.get_product(id).await.unwrap().unwrap();
    assert_eq!(after.stock, 0);
    assert_eq!(after.total_sales, 2);
}

#[tokio::test]
async fn concurrent_decrements_cannot_oversell() {
    let store = store().await;
    let product = sample_product(1000, 5);
    let id = product.id;
    store.insert_product(product).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let store = store.clone();
        handles.push(tokio::spawn(
            async move { store.decrement_stock(id, 3).await },
        ));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(store.get_product(id).await.unwrap().unwrap().stock, 2);
}

#[tokio::test]
async fn cart_upsert_merges_lines() {
    let store = store().await;
    let user = UserId::new();
    let product = sample_product(1000, 10);
    let id = product.id;
    store.insert_product(product).await.unwrap();

    store
        .add_line(user, id, 1, Money::from_cents(1000))
        .await
        .unwrap();
    let cart = store
        .add_line(user, id, 2, Money::from_cents(900))
        .await
        .unwrap();

    assert_eq!(cart.len(), 1);
    assert_eq!(cart.lines[0].quantity, 3);
    assert_eq!(cart.lines[0].unit_price.cents(), 900);
}

#[tokio::test]
async fn place_order_commits_all_steps() {
    let store = store().await;
    let user = UserId::new();
    let product = sample_product(1000, 5);
    let id = product.id;
    store.insert_product(product.clone()).await.unwrap();
    store.add_line(user, id, 2, product.price).await.unwrap();

    let order = store.place_order(draft(user, &product, 2)).await.unwrap();

    assert_eq!(order.pricing.total.cents(), 2340);
    assert_eq!(order.order_status, OrderStatus::Pending);
    assert_eq!(store.get_product(id).await.unwrap().unwrap().stock, 3);
    assert!(store.fetch_cart(user).await.unwrap().is_empty());

    // Timestamps lose sub-microsecond precision in the round trip, so
    // compare fields rather than whole values.
    let loaded = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(loaded.id, order.id);
    assert_eq!(loaded.order_number, order.order_number);
    assert_eq!(loaded.lines, order.lines);
    assert_eq!(loaded.pricing, order.pricing);
    assert_eq!(loaded.shipping_address, order.shipping_address);
}

#[tokio::test]
async fn place_order_short_stock_rolls_back() {
    let store = store().await;
    let user = UserId::new();
    let plenty = sample_product(500, 10);
    let scarce = sample_product(1000, 1);
    store.insert_product(plenty.clone()).await.unwrap();
    store.insert_product(scarce.clone()).await.unwrap();
    store
        .add_line(user, plenty.id, 2, plenty.price)
        .await
        .unwrap();

    let mut short = draft(user, &plenty, 2);
    short.lines.push(OrderLine {
        product_id: scarce.id,
        name: scarce.name.clone(),
        quantity: 2,
        unit_price: scarce.price,
    });

    let err = store.place_order(short).await.unwrap_err();
    assert!(matches!(err, StoreError::InsufficientStock { .. }));

    // The plenty decrement rolled back with everything else.
    assert_eq!(
        store.get_product(plenty.id).await.unwrap().unwrap().stock,
        10
    );
    assert_eq!(store.fetch_cart(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn order_numbers_unique_under_concurrent_checkout() {
    let store = store().await;
    let product = sample_product(100, 1000);
    store.insert_product(product.clone()).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        let product = product.clone();
        handles.push(tokio::spawn(async move {
            store
                .place_order(draft(UserId::new(), &product, 1))
                .await
                .unwrap()
                .order_number
        }));
    }

    let mut numbers = std::collections::HashSet::new();
    for handle in handles {
        assert!(numbers.insert(handle.await.unwrap().to_string()));
    }
    assert_eq!(numbers.len(), 10);
}

#[tokio::test]
async fn cancel_restores_stock_once_and_guards_repeat() {
    let store = store().await;
    let user = UserId::new();
    let product = sample_product(1000, 5);
    let id = product.id;
    store.insert_product(product.clone()).await.unwrap();
    let order = store.place_order(draft(user, &product, 2)).await.unwrap();

    let cancelled = store.cancel_order(user, order.id).await.unwrap();
    assert_eq!(cancelled.order_status, OrderStatus::Cancelled);
    assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
    assert_eq!(store.get_product(id).await.unwrap().unwrap().stock, 5);

    let err = store.cancel_order(user, order.id).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::InvalidTransition {
            status: OrderStatus::Cancelled
        }
    ));
    assert_eq!(store.get_product(id).await.unwrap().unwrap().stock, 5);
}

#[tokio::test]
async fn status_overrides_persist() {
    let store = store().await;
    let user = UserId::new();
    let product = sample_product(1000, 5);
    store.insert_product(product.clone()).await.unwrap();
    let order = store.place_order(draft(user, &product, 1)).await.unwrap();

    let shipped = store
        .set_order_status(order.id, OrderStatus::Shipped)
        .await
        .unwrap();
    assert_eq!(shipped.order_status, OrderStatus::Shipped);
    assert!(shipped.shipping.shipped_at.is_some());

    let paid = store
        .set_payment_status(order.id, PaymentStatus::Completed)
        .await
        .unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Completed);

    let loaded = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(loaded.order_status, OrderStatus::Shipped);
    assert_eq!(loaded.payment_status, PaymentStatus::Completed);
}

#[tokio::test]
async fn user_scoped_listing_paginates() {
    let store = store().await;
    let user = UserId::new();
    let product = sample_product(100, 1000);
    store.insert_product(product.clone()).await.unwrap();

    for _ in 0..3 {
        store.place_order(draft(user, &product, 1)).await.unwrap();
    }

    let page = store
        .list_orders_for_user(user, PageRequest::new(1, 2))
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.pages, 2);
    assert_eq!(page.items.len(), 2);
}
