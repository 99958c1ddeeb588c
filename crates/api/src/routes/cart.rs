//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use checkout::CartView;
use common::{LineId, ProductId};
use serde::Deserialize;
use store::Backend;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::routes::parse_id;

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartBody {
    pub product_id: Option<String>,
    pub quantity: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdateItemBody {
    pub quantity: Option<i64>,
}

fn valid_quantity(quantity: Option<i64>, message: &str) -> Result<u32, ApiError> {
    match quantity {
        Some(q) if q >= 1 => {
            u32::try_from(q).map_err(|_| ApiError::BadRequest(message.to_string()))
        }
        _ => Err(ApiError::BadRequest(message.to_string())),
    }
}

// -- Handlers --

/// GET /api/cart — the caller's cart with totals.
#[tracing::instrument(skip(state))]
pub async fn get_cart<S: Backend + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    let view = state.carts.get_cart(user_id).await?;
    Ok(Json(ApiResponse::ok(view)))
}

/// POST /api/cart — add a product to the cart.
#[tracing::instrument(skip(state, body))]
pub async fn add_item<S: Backend + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<AddToCartBody>,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    const MESSAGE: &str = "Valid product ID and quantity required";
    let quantity = valid_quantity(body.quantity, MESSAGE)?;
    let product_id: ProductId = body
        .product_id
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest(MESSAGE.to_string()))
        .and_then(parse_id)?;

    let view = state.carts.add_item(user_id, product_id, quantity).await?;
    Ok(Json(ApiResponse::with_message("Added to cart", view)))
}

/// PUT /api/cart/{itemId} — change a line's quantity.
#[tracing::instrument(skip(state, body))]
pub async fn update_item<S: Backend + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user_id): AuthUser,
    Path(item_id): Path<String>,
    Json(body): Json<UpdateItemBody>,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    let quantity = valid_quantity(body.quantity, "Quantity must be at least 1")?;
    let line_id: LineId = parse_id(&item_id)?;

    let view = state.carts.update_item(user_id, line_id, quantity).await?;
    Ok(Json(ApiResponse::with_message("Cart updated", view)))
}

/// DELETE /api/cart/{itemId} — drop a line; absent lines are fine.
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: Backend + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user_id): AuthUser,
    Path(item_id): Path<String>,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    let line_id: LineId = parse_id(&item_id)?;
    let view = state.carts.remove_item(user_id, line_id).await?;
    Ok(Json(ApiResponse::with_message(
        "Item removed from cart",
        view,
    )))
}

/// DELETE /api/cart — empty the cart.
#[tracing::instrument(skip(state))]
pub async fn clear<S: Backend + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    let view = state.carts.clear(user_id).await?;
    Ok(Json(ApiResponse::with_message("Cart cleared", view)))
}
