//! Cart operations and the cart view.

use common::{LineId, Money, ProductId, UserId};
use domain::{Cart, Product};
use serde::Serialize;
use store::{Backend, CartStore, ProductStore};

use crate::error::{CheckoutError, Result};

/// Catalog details joined onto a cart line for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Money,
    pub stock: u32,
    pub is_active: bool,
}

impl From<Product> for ProductSummary {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            slug: p.slug,
            price: p.price,
            stock: p.stock,
            is_active: p.is_active,
        }
    }
}

/// One cart line with its product joined in.
///
/// `product` is None when the product has since been removed from the
/// catalog; `price` is always the stored line price, not the live one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub id: LineId,
    pub product: Option<ProductSummary>,
    pub quantity: u32,
    pub price: Money,
}

/// The cart as returned to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub items_count: usize,
    pub subtotal: Money,
    /// Equal to the subtotal; shipping and tax are checkout-time figures.
    pub total: Money,
}

/// Cart mutations with catalog validation.
///
/// Stock checks here are advisory conveniences for the shopper; the
/// binding check happens inside the checkout commit.
#[derive(Clone)]
pub struct CartService<S> {
    store: S,
}

impl<S: Backend> CartService<S> {
    /// Creates a cart service over the given backend.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the user's cart, creating an empty one on first access.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<CartView> {
        let cart = self.store.fetch_cart(user_id).await?;
        self.view(cart).await
    }

    /// Adds a quantity of a product to the cart at its current price.
    ///
    /// An existing line for the product has its quantity summed and its
    /// stored price refreshed; drift between repeated adds is accepted.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartView> {
        if quantity < 1 {
            return Err(CheckoutError::Validation(
                "Valid product ID and quantity required".to_string(),
            ));
        }

        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or(CheckoutError::NotFound { entity: "product" })?;

        if !product.is_active {
            return Err(CheckoutError::ProductUnavailable { name: product.name });
        }
        if product.stock < quantity {
            return Err(CheckoutError::InsufficientStock {
                name: product.name,
                available: product.stock,
            });
        }

        let cart = self
            .store
            .add_line(user_id, product_id, quantity, product.price)
            .await?;
        self.view(cart).await
    }

    /// Replaces a line's quantity, refreshing the stored price.
    #[tracing::instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: UserId,
        line_id: LineId,
        quantity: u32,
    ) -> Result<CartView> {
        if quantity < 1 {
            return Err(CheckoutError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let cart = self.store.fetch_cart(user_id).await?;
        let line = cart.line(line_id).ok_or(CheckoutError::NotFound {
            entity: "cart item",
        })?;

        let product = self
            .store
            .get_product(line.product_id)
            .await?
            .ok_or(CheckoutError::NotFound { entity: "product" })?;

        if product.stock < quantity {
            return Err(CheckoutError::InsufficientStock {
                name: product.name,
                available: product.stock,
            });
        }

        let cart = self
            .store
            .update_line(user_id, line_id, quantity, product.price)
            .await?;
        self.view(cart).await
    }

    /// Removes a line; removing one that is already gone still succeeds.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, line_id: LineId) -> Result<CartView> {
        let cart = self.store.remove_line(user_id, line_id).await?;
        self.view(cart).await
    }

    /// Empties the cart.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<CartView> {
        let cart = self.store.clear_cart(user_id).await?;
        self.view(cart).await
    }

    async fn view(&self, cart: Cart) -> Result<CartView> {
        let mut items = Vec::with_capacity(cart.len());
        for line in &cart.lines {
            let product = self.store.get_product(line.product_id).await?;
            items.push(CartItemView {
                id: line.id,
                product: product.map(ProductSummary::from),
                quantity: line.quantity,
                price: line.unit_price,
            });
        }
        let subtotal = cart.subtotal();
        Ok(CartView {
            items_count: items.len(),
            items,
            subtotal,
            total: subtotal,
        })
    }
}
