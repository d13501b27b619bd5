//! Order records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{OrderId, ProductId, UserId};
use super::money::Money;
use super::product::ProductSnapshot;
use super::quantity::Quantity;
use super::status::OrderStatus;

/// The buyer of an order, when the server populates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buyer {
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: Option<String>,
}

/// An order as returned by the server.
///
/// Created server-side at checkout completion; this crate only reads it and
/// advances its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order ID (also the QR payload).
    pub id: OrderId,
    /// Buyer's user ID.
    pub user_id: UserId,
    /// Populated buyer details, if any.
    pub buyer: Option<Buyer>,
    /// Linked product; `None` once the product was deleted.
    pub product_id: Option<ProductId>,
    /// Product name embedded in the order, if the server populated it.
    pub product_name: Option<String>,
    /// Unit price embedded in the order, if the server populated it.
    pub unit_price: Option<Money>,
    /// Units ordered.
    pub quantity: Quantity,
    /// Fulfillment status.
    pub status: OrderStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// An order together with its (optional) product enrichment.
///
/// `product` is `None` when the enrichment fetch failed; the order is still
/// listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedOrder {
    /// The raw order.
    pub order: Order,
    /// Product snapshot fetched for this order.
    pub product: Option<ProductSnapshot>,
}

impl TrackedOrder {
    /// Pair an order with its enrichment.
    #[must_use]
    pub const fn new(order: Order, product: Option<ProductSnapshot>) -> Self {
        Self { order, product }
    }

    /// Order ID.
    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.order.id
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.order.status
    }

    /// Product name from the snapshot, falling back to the embedded name.
    #[must_use]
    pub fn product_name(&self) -> Option<&str> {
        self.product
            .as_ref()
            .map(|p| p.name.as_str())
            .or(self.order.product_name.as_deref())
    }

    /// Buyer name, if populated.
    #[must_use]
    pub fn buyer_name(&self) -> Option<&str> {
        self.order.buyer.as_ref().map(|b| b.name.as_str())
    }

    /// Unit price from the order, falling back to the snapshot.
    #[must_use]
    pub fn unit_price(&self) -> Option<Money> {
        self.order
            .unit_price
            .or_else(|| self.product.as_ref().map(|p| p.price))
    }

    /// Order total (`quantity * unit price`) when a price is known.
    #[must_use]
    pub fn total(&self) -> Option<Money> {
        self.unit_price().map(|price| price.times(self.order.quantity))
    }

    /// Product images, empty when not enriched.
    #[must_use]
    pub fn images(&self) -> &[String] {
        self.product
            .as_ref()
            .map(|p| p.images.as_slice())
            .unwrap_or_default()
    }

    /// Whether `needle` (already lowercased) occurs in the order ID, buyer
    /// name, or product name.
    #[must_use]
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        let contains = |haystack: &str| haystack.to_lowercase().contains(needle);
        contains(self.order.id.as_str())
            || self.buyer_name().is_some_and(contains)
            || self.product_name().is_some_and(contains)
    }
}
