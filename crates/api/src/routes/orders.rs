//! Order endpoints: checkout, queries, cancellation, admin updates.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use checkout::CheckoutRequest;
use chrono::{DateTime, Utc};
use common::{AddressId, Money, OrderId, ProductId};
use domain::{Order, OrderStatus, PaymentMethod, PaymentStatus};
use serde::{Deserialize, Serialize};
use store::{Backend, OrderStats, PageRequest};

use crate::AppState;
use crate::auth::{AdminUser, AuthUser};
use crate::error::ApiError;
use crate::response::{ApiResponse, PaginatedResponse};
use crate::routes::parse_id;

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    pub shipping_address_id: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentBody {
    pub payment_status: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusBody {
    pub order_status: String,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl Pagination {
    fn request(&self) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(1),
            self.limit.unwrap_or(store::DEFAULT_PAGE_SIZE),
        )
    }
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub price: Money,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressResponse {
    pub full_name: String,
    pub phone: String,
    pub street: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barangay: Option<String>,
    pub city: String,
    pub province: String,
    pub zip_code: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingResponse {
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub tax: Money,
    pub total: Money,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: OrderId,
    pub order_number: String,
    pub items: Vec<OrderItemResponse>,
    pub shipping_address: AddressResponse,
    pub pricing: PricingResponse,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub shipping: ShippingResponse,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number.to_string(),
            items: order
                .lines
                .into_iter()
                .map(|line| OrderItemResponse {
                    product_id: line.product_id,
                    name: line.name,
                    quantity: line.quantity,
                    price: line.unit_price,
                })
                .collect(),
            shipping_address: AddressResponse {
                full_name: order.shipping_address.full_name,
                phone: order.shipping_address.phone,
                street: order.shipping_address.street,
                barangay: order.shipping_address.barangay,
                city: order.shipping_address.city,
                province: order.shipping_address.province,
                zip_code: order.shipping_address.zip_code,
            },
            pricing: PricingResponse {
                subtotal: order.pricing.subtotal,
                shipping_fee: order.pricing.shipping_fee,
                tax: order.pricing.tax,
                total: order.pricing.total,
            },
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            order_status: order.order_status,
            shipping: ShippingResponse {
                courier: order.shipping.courier,
                tracking_number: order.shipping.tracking_number,
                shipped_at: order.shipping.shipped_at,
                delivered_at: order.shipping.delivered_at,
            },
            created_at: order.created_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_orders: u64,
    pub total_revenue: Money,
    pub orders_by_status: BTreeMap<String, u64>,
    pub payments_by_status: BTreeMap<String, u64>,
}

impl From<OrderStats> for StatsResponse {
    fn from(stats: OrderStats) -> Self {
        Self {
            total_orders: stats.total_orders,
            total_revenue: stats.total_revenue,
            orders_by_status: stats.orders_by_status,
            payments_by_status: stats.payments_by_status,
        }
    }
}

// -- Handlers --

/// POST /api/orders — convert the caller's cart into an order.
#[tracing::instrument(skip(state, body))]
pub async fn create<S: Backend + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CheckoutBody>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ApiError> {
    let shipping_address_id: Option<AddressId> =
        body.shipping_address_id.as_deref().map(parse_id).transpose()?;
    let payment_method: Option<PaymentMethod> = body
        .payment_method
        .as_deref()
        .map(|m| m.parse())
        .transpose()?;

    let order = state
        .orders
        .checkout(
            user_id,
            CheckoutRequest {
                shipping_address_id,
                payment_method,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Order created successfully",
            OrderResponse::from(order),
        )),
    ))
}

/// GET /api/orders — the caller's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Backend + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user_id): AuthUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<OrderResponse>>, ApiError> {
    let page = state
        .orders
        .list_orders(user_id, pagination.request())
        .await?;
    Ok(Json(PaginatedResponse::from_page(page, OrderResponse::from)))
}

/// GET /api/orders/{orderId} — one of the caller's orders.
#[tracing::instrument(skip(state))]
pub async fn get<S: Backend + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user_id): AuthUser,
    Path(order_id): Path<String>,
) -> Result<Json<ApiResponse<OrderResponse>>, ApiError> {
    let order_id: OrderId = parse_id(&order_id)?;
    let order = state.orders.get_order(user_id, order_id).await?;
    Ok(Json(ApiResponse::ok(OrderResponse::from(order))))
}

/// PATCH /api/orders/{orderId}/cancel — cancel and restore stock.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: Backend + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user_id): AuthUser,
    Path(order_id): Path<String>,
) -> Result<Json<ApiResponse<OrderResponse>>, ApiError> {
    let order_id: OrderId = parse_id(&order_id)?;
    let order = state.orders.cancel_order(user_id, order_id).await?;
    Ok(Json(ApiResponse::with_message(
        "Order cancelled successfully",
        OrderResponse::from(order),
    )))
}

/// PATCH /api/orders/{orderId}/payment — admin payment-status override.
#[tracing::instrument(skip(state, body))]
pub async fn update_payment<S: Backend + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Path(order_id): Path<String>,
    Json(body): Json<UpdatePaymentBody>,
) -> Result<Json<ApiResponse<OrderResponse>>, ApiError> {
    let order_id: OrderId = parse_id(&order_id)?;
    let status: PaymentStatus = body.payment_status.parse()?;
    let order = state.orders.set_payment_status(order_id, status).await?;
    Ok(Json(ApiResponse::with_message(
        "Payment status updated",
        OrderResponse::from(order),
    )))
}

/// PATCH /api/orders/{orderId}/status — admin fulfillment-status override.
#[tracing::instrument(skip(state, body))]
pub async fn update_status<S: Backend + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Path(order_id): Path<String>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<ApiResponse<OrderResponse>>, ApiError> {
    let order_id: OrderId = parse_id(&order_id)?;
    let status: OrderStatus = body.order_status.parse()?;
    let order = state.orders.set_order_status(order_id, status).await?;
    Ok(Json(ApiResponse::with_message(
        "Order status updated",
        OrderResponse::from(order),
    )))
}

/// GET /api/admin/orders — all orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn admin_list<S: Backend + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<OrderResponse>>, ApiError> {
    let page = state.orders.list_all_orders(pagination.request()).await?;
    Ok(Json(PaginatedResponse::from_page(page, OrderResponse::from)))
}

/// GET /api/admin/orders/stats — aggregate order figures.
#[tracing::instrument(skip(state))]
pub async fn admin_stats<S: Backend + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<StatsResponse>>, ApiError> {
    let stats = state.orders.order_stats().await?;
    Ok(Json(ApiResponse::ok(StatsResponse::from(stats))))
}
