//! Cart records.
//!
//! A [`Cart`] is the last snapshot the server returned for a user. Lines are
//! unique by product ID and keep the server's order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{CartId, ProductId, UserId};
use super::money::Money;
use super::product::ProductSnapshot;
use super::quantity::Quantity;

/// Product details cached on a cart line when it was added or fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSnapshot {
    /// Product name.
    pub name: String,
    /// Thumbnail URL.
    pub image: Option<String>,
    /// Stock reported when the line was added.
    pub stock_at_add: u32,
}

impl From<&ProductSnapshot> for LineSnapshot {
    fn from(product: &ProductSnapshot) -> Self {
        Self {
            name: product.name.clone(),
            image: product.primary_image().map(str::to_owned),
            stock_at_add: product.stock,
        }
    }
}

/// One product entry in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product this line refers to.
    pub product_id: ProductId,
    /// Unit price as last reported by the server.
    pub unit_price: Money,
    /// Units in the cart (always at least one).
    pub quantity: Quantity,
    /// Cached product details.
    pub snapshot: LineSnapshot,
}

impl CartLine {
    /// Line subtotal (`unit_price * quantity`).
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// A user's cart as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Server-side cart document ID, if the cart exists remotely.
    pub id: Option<CartId>,
    /// Owner.
    pub user_id: UserId,
    /// Lines in server order, unique by product ID.
    pub lines: Vec<CartLine>,
    /// Last server-side modification.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Cart {
    /// An empty cart for a user.
    #[must_use]
    pub const fn empty(user_id: UserId) -> Self {
        Self {
            id: None,
            user_id,
            lines: Vec::new(),
            updated_at: None,
        }
    }

    /// Build a cart, merging duplicate product lines.
    ///
    /// The server should never send two lines for one product; if it does, the
    /// later line wins but keeps the earlier position.
    #[must_use]
    pub fn new(
        id: Option<CartId>,
        user_id: UserId,
        lines: impl IntoIterator<Item = CartLine>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        let mut unique: Vec<CartLine> = Vec::new();
        for line in lines {
            match unique.iter_mut().find(|l| l.product_id == line.product_id) {
                Some(existing) => *existing = line,
                None => unique.push(line),
            }
        }
        Self {
            id,
            user_id,
            lines: unique,
            updated_at,
        }
    }

    /// Find the line for a product.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product_id == product_id)
    }

    /// Sum of line subtotals.
    #[must_use]
    pub fn total(&self) -> Money {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity.get())).sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
