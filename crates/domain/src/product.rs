//! Catalog product record.

use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

/// A catalog product with its inventory ledger state.
///
/// `stock` and `total_sales` move together: a successful checkout
/// decrements stock and increments sales by the same quantity, and a
/// cancellation reverses both. `stock` never goes below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Money,
    pub stock: u32,
    pub total_sales: u64,
    pub is_active: bool,
}

impl Product {
    /// Creates an active product with a slug derived from its name.
    pub fn new(name: impl Into<String>, price: Money, stock: u32) -> Self {
        let name = name.into();
        let slug = slugify(&name);
        Self {
            id: ProductId::new(),
            name,
            slug,
            price,
            stock,
            total_sales: 0,
            is_active: true,
        }
    }

    /// Returns true if at least `quantity` units are in stock.
    pub fn has_stock(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }
}

/// Lowercases a name and collapses non-alphanumeric runs into hyphens.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_hyphen = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_product_is_active_with_slug() {
        let product = Product::new("MX-9 Adventure Helmet", Money::from_cents(15999), 10);
        assert!(product.is_active);
        assert_eq!(product.slug, "mx-9-adventure-helmet");
        assert_eq!(product.total_sales, 0);
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Touring / City (Gloss)"), "touring-city-gloss");
        assert_eq!(slugify("  Trim  "), "trim");
    }

    #[test]
    fn has_stock_boundary() {
        let product = Product::new("Visor", Money::from_cents(500), 3);
        assert!(product.has_stock(3));
        assert!(!product.has_stock(4));
        assert!(product.has_stock(0));
    }
}
