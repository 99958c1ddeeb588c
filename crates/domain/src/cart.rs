//! Cart aggregate.

use common::{LineId, Money, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// One product entry in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: LineId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price captured when the line was added or last updated. Not
    /// re-read at checkout; the order bills this stored price.
    pub unit_price: Money,
}

impl CartLine {
    /// Returns quantity times the stored unit price.
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A user's cart: at most one line per distinct product.
///
/// Created lazily on first access and cleared rather than deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// Creates an empty cart for a user.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            lines: Vec::new(),
        }
    }

    /// Merges a quantity of a product into the cart.
    ///
    /// An existing line for the product has its quantity summed and its
    /// unit price refreshed; otherwise a new line is appended. Returns the
    /// id of the affected line.
    pub fn add_line(&mut self, product_id: ProductId, quantity: u32, unit_price: Money) -> LineId {
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity += quantity;
            line.unit_price = unit_price;
            return line.id;
        }
        let line = CartLine {
            id: LineId::new(),
            product_id,
            quantity,
            unit_price,
        };
        let id = line.id;
        self.lines.push(line);
        id
    }

    /// Returns the line with the given id, if present.
    pub fn line(&self, line_id: LineId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    /// Returns the line with the given id mutably, if present.
    pub fn line_mut(&mut self, line_id: LineId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.id == line_id)
    }

    /// Removes the line with the given id. Removing an absent line is a
    /// no-op, not an error.
    pub fn remove_line(&mut self, line_id: LineId) {
        self.lines.retain(|l| l.id != line_id);
    }

    /// Removes every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum over lines of stored unit price times quantity. Computed, never
    /// persisted.
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::total_price).sum()
    }

    /// Returns the number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns true if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
