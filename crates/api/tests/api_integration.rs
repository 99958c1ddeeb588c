//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{AddressId, Money, UserId};
use domain::{Address, Product};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{AddressStore, InMemoryStore, ProductStore};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: Router,
    store: InMemoryStore,
    user: UserId,
    address_id: AddressId,
}

async fn setup() -> TestApp {
    let store = InMemoryStore::new();
    let state = api::create_state(store.clone());
    let app = api::create_app(state, get_metrics_handle());

    let user = UserId::new();
    let address = Address {
        id: AddressId::new(),
        user_id: user,
        full_name: "Ramon Reyes".to_string(),
        phone: "09171234567".to_string(),
        street: "12 Mabini St".to_string(),
        barangay: Some("Poblacion".to_string()),
        city: "Makati".to_string(),
        province: "Metro Manila".to_string(),
        zip_code: "1210".to_string(),
    };
    let address_id = address.id;
    store.insert_address(address).await.unwrap();

    TestApp {
        app,
        store,
        user,
        address_id,
    }
}

async fn seed_product(t: &TestApp, price: i64, stock: u32) -> Product {
    let product = Product::new(
        format!("Helmet {}", UserId::new()),
        Money::from_cents(price),
        stock,
    );
    t.store.insert_product(product.clone()).await.unwrap();
    product
}

fn user_request(t: &TestApp, method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", t.user.to_string());
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_string(&json).unwrap())
        }
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

fn admin_request(t: &TestApp, method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let mut request = user_request(t, method, uri, body);
    request
        .headers_mut()
        .insert("x-user-role", "admin".parse().unwrap());
    request
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn checkout(t: &TestApp) -> serde_json::Value {
    let response = t
        .app
        .clone()
        .oneshot(user_request(
            t,
            "POST",
            "/api/orders",
            Some(serde_json::json!({
                "shippingAddressId": t.address_id.to_string(),
                "paymentMethod": "cash_on_delivery"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[tokio::test]
async fn test_health_check() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_cart_requires_identity() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri("/api/cart")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_add_to_cart_and_read_back() {
    let t = setup().await;
    let product = seed_product(&t, 1000, 5).await;

    let response = t
        .app
        .clone()
        .oneshot(user_request(
            &t,
            "POST",
            "/api/cart",
            Some(serde_json::json!({
                "productId": product.id.to_string(),
                "quantity": 2
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Added to cart");
    assert_eq!(json["data"]["itemsCount"], 1);
    assert_eq!(json["data"]["subtotal"], 2000);

    let response = t
        .app
        .clone()
        .oneshot(user_request(&t, "GET", "/api/cart", None))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["data"]["items"][0]["quantity"], 2);
    assert_eq!(json["data"]["items"][0]["product"]["name"], product.name);
    assert_eq!(json["data"]["total"], 2000);
}

#[tokio::test]
async fn test_add_to_cart_rejects_bad_input() {
    let t = setup().await;
    let product = seed_product(&t, 1000, 5).await;

    // Missing quantity
    let response = t
        .app
        .clone()
        .oneshot(user_request(
            &t,
            "POST",
            "/api/cart",
            Some(serde_json::json!({ "productId": product.id.to_string() })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Valid product ID and quantity required");

    // Unknown product
    let response = t
        .app
        .clone()
        .oneshot(user_request(
            &t,
            "POST",
            "/api/cart",
            Some(serde_json::json!({
                "productId": UserId::new().to_string(),
                "quantity": 1
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // More than in stock
    let response = t
        .app
        .clone()
        .oneshot(user_request(
            &t,
            "POST",
            "/api/cart",
            Some(serde_json::json!({
                "productId": product.id.to_string(),
                "quantity": 9
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(
        json["message"]
            .as_str()
            .unwrap()
            .contains("only 5 in stock")
    );
}

#[tokio::test]
async fn test_checkout_end_to_end() {
    let t = setup().await;
    let product = seed_product(&t, 1000, 5).await;

    t.app
        .clone()
        .oneshot(user_request(
            &t,
            "POST",
            "/api/cart",
            Some(serde_json::json!({
                "productId": product.id.to_string(),
                "quantity": 2
            })),
        ))
        .await
        .unwrap();

    let json = checkout(&t).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Order created successfully");
    let data = &json["data"];
    assert_eq!(data["pricing"]["subtotal"], 2000);
    assert_eq!(data["pricing"]["shippingFee"], 100);
    assert_eq!(data["pricing"]["tax"], 240);
    assert_eq!(data["pricing"]["total"], 2340);
    assert_eq!(data["orderStatus"], "pending");
    assert_eq!(data["paymentStatus"], "pending");
    assert!(data["orderNumber"].as_str().unwrap().starts_with("AG-"));
    assert_eq!(data["shippingAddress"]["city"], "Makati");

    // Stock decremented and cart now empty.
    let left = t.store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(left.stock, 3);
    let response = t
        .app
        .clone()
        .oneshot(user_request(&t, "GET", "/api/cart", None))
        .await
        .unwrap();
    let cart = body_json(response).await;
    assert_eq!(cart["data"]["itemsCount"], 0);
}

#[tokio::test]
async fn test_checkout_validation_failures() {
    let t = setup().await;
    let product = seed_product(&t, 1000, 5).await;

    // Empty cart
    let response = t
        .app
        .clone()
        .oneshot(user_request(
            &t,
            "POST",
            "/api/orders",
            Some(serde_json::json!({
                "shippingAddressId": t.address_id.to_string(),
                "paymentMethod": "stripe"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Cart is empty");

    t.app
        .clone()
        .oneshot(user_request(
            &t,
            "POST",
            "/api/cart",
            Some(serde_json::json!({
                "productId": product.id.to_string(),
                "quantity": 1
            })),
        ))
        .await
        .unwrap();

    // Missing payment method
    let response = t
        .app
        .clone()
        .oneshot(user_request(
            &t,
            "POST",
            "/api/orders",
            Some(serde_json::json!({
                "shippingAddressId": t.address_id.to_string()
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(
        json["message"],
        "Shipping address and payment method are required"
    );

    // Unknown payment method string
    let response = t
        .app
        .clone()
        .oneshot(user_request(
            &t,
            "POST",
            "/api/orders",
            Some(serde_json::json!({
                "shippingAddressId": t.address_id.to_string(),
                "paymentMethod": "barter"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_orders_are_scoped_to_their_owner() {
    let t = setup().await;
    let product = seed_product(&t, 1000, 5).await;

    t.app
        .clone()
        .oneshot(user_request(
            &t,
            "POST",
            "/api/cart",
            Some(serde_json::json!({
                "productId": product.id.to_string(),
                "quantity": 1
            })),
        ))
        .await
        .unwrap();
    let order = checkout(&t).await;
    let order_id = order["data"]["id"].as_str().unwrap().to_string();

    // The owner sees it.
    let response = t
        .app
        .clone()
        .oneshot(user_request(&t, "GET", &format!("/api/orders/{order_id}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Someone else gets a 404.
    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri(format!("/api/orders/{order_id}"))
                .header("x-user-id", UserId::new().to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_and_repeat_cancel() {
    let t = setup().await;
    let product = seed_product(&t, 1000, 5).await;

    t.app
        .clone()
        .oneshot(user_request(
            &t,
            "POST",
            "/api/cart",
            Some(serde_json::json!({
                "productId": product.id.to_string(),
                "quantity": 2
            })),
        ))
        .await
        .unwrap();
    let order = checkout(&t).await;
    let order_id = order["data"]["id"].as_str().unwrap().to_string();

    let response = t
        .app
        .clone()
        .oneshot(user_request(
            &t,
            "PATCH",
            &format!("/api/orders/{order_id}/cancel"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["orderStatus"], "cancelled");
    assert_eq!(json["data"]["paymentStatus"], "refunded");
    assert_eq!(t.store.get_product(product.id).await.unwrap().unwrap().stock, 5);

    let response = t
        .app
        .clone()
        .oneshot(user_request(
            &t,
            "PATCH",
            &format!("/api/orders/{order_id}/cancel"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(
        json["message"]
            .as_str()
            .unwrap()
            .contains("cancelled")
    );
}

#[tokio::test]
async fn test_admin_routes_enforce_role() {
    let t = setup().await;
    let product = seed_product(&t, 1000, 5).await;

    t.app
        .clone()
        .oneshot(user_request(
            &t,
            "POST",
            "/api/cart",
            Some(serde_json::json!({
                "productId": product.id.to_string(),
                "quantity": 1
            })),
        ))
        .await
        .unwrap();
    let order = checkout(&t).await;
    let order_id = order["data"]["id"].as_str().unwrap().to_string();

    // Plain user is forbidden.
    let response = t
        .app
        .clone()
        .oneshot(user_request(
            &t,
            "PATCH",
            &format!("/api/orders/{order_id}/status"),
            Some(serde_json::json!({ "orderStatus": "shipped" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Admin succeeds.
    let response = t
        .app
        .clone()
        .oneshot(admin_request(
            &t,
            "PATCH",
            &format!("/api/orders/{order_id}/status"),
            Some(serde_json::json!({ "orderStatus": "shipped" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["orderStatus"], "shipped");
    assert!(json["data"]["shipping"]["shippedAt"].is_string());

    // Bad enum value is a 400.
    let response = t
        .app
        .clone()
        .oneshot(admin_request(
            &t,
            "PATCH",
            &format!("/api/orders/{order_id}/payment"),
            Some(serde_json::json!({ "paymentStatus": "maybe" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Invalid payment status: maybe");

    // Stats roll the order up.
    let response = t
        .app
        .clone()
        .oneshot(admin_request(&t, "GET", "/api/admin/orders/stats", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["totalOrders"], 1);
    assert_eq!(json["data"]["ordersByStatus"]["shipped"], 1);
}

#[tokio::test]
async fn test_order_listing_paginates() {
    let t = setup().await;
    let product = seed_product(&t, 500, 50).await;

    for _ in 0..3 {
        t.app
            .clone()
            .oneshot(user_request(
                &t,
                "POST",
                "/api/cart",
                Some(serde_json::json!({
                    "productId": product.id.to_string(),
                    "quantity": 1
                })),
            ))
            .await
            .unwrap();
        checkout(&t).await;
    }

    let response = t
        .app
        .clone()
        .oneshot(user_request(&t, "GET", "/api/orders?page=1&limit=2", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["count"], 2);
    assert_eq!(json["total"], 3);
    assert_eq!(json["page"], 1);
    assert_eq!(json["pages"], 2);
}

#[tokio::test]
async fn test_remove_absent_cart_line_succeeds() {
    let t = setup().await;

    let response = t
        .app
        .clone()
        .oneshot(user_request(
            &t,
            "DELETE",
            &format!("/api/cart/{}", UserId::new()),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Item removed from cart");
    assert_eq!(json["data"]["itemsCount"], 0);
}

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
