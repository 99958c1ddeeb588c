//! HTTP API server for the storefront backend.
//!
//! Exposes the cart and order endpoints under `/api`, plus `/health` and
//! Prometheus `/metrics`, with structured logging via `tracing`. Handlers
//! are generic over the store backend, so tests run the full router
//! against the in-memory store.

pub mod auth;
pub mod config;
pub mod error;
pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post, put};
use checkout::{CartService, CheckoutService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Backend;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Backend> {
    pub carts: CartService<S>,
    pub orders: CheckoutService<S>,
}

/// Builds the application state over a store backend.
pub fn create_state<S: Backend + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        carts: CartService::new(store.clone()),
        orders: CheckoutService::new(store),
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Backend + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let api = Router::new()
        .route(
            "/cart",
            get(routes::cart::get_cart::<S>)
                .post(routes::cart::add_item::<S>)
                .delete(routes::cart::clear::<S>),
        )
        .route(
            "/cart/{item_id}",
            put(routes::cart::update_item::<S>).delete(routes::cart::remove_item::<S>),
        )
        .route(
            "/orders",
            post(routes::orders::create::<S>).get(routes::orders::list::<S>),
        )
        .route("/orders/{order_id}", get(routes::orders::get::<S>))
        .route(
            "/orders/{order_id}/cancel",
            patch(routes::orders::cancel::<S>),
        )
        .route(
            "/orders/{order_id}/payment",
            patch(routes::orders::update_payment::<S>),
        )
        .route(
            "/orders/{order_id}/status",
            patch(routes::orders::update_status::<S>),
        )
        .route("/admin/orders", get(routes::orders::admin_list::<S>))
        .route("/admin/orders/stats", get(routes::orders::admin_stats::<S>));

    Router::new()
        .route("/health", get(routes::health::check))
        .nest("/api", api)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
