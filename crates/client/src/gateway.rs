//! Remote gateway traits.
//!
//! The cart engine, order tracker and checkout bridge only talk to the server
//! through these traits. [`crate::api::ApiClient`] implements all three over
//! REST; tests substitute in-memory fakes.

use async_trait::async_trait;
use maya_core::{
    Cart, CartLine, LineSnapshot, Money, Order, OrderId, OrderStatus, ProductId, ProductSnapshot,
    Quantity, UserId,
};
use url::Url;

use crate::api::ApiError;

// =============================================================================
// Reply types
// =============================================================================

/// Price and display details of a line, when the server populated them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDetails {
    pub unit_price: Money,
    pub snapshot: LineSnapshot,
}

/// A cart line as reported by a mutation reply.
///
/// Mutation replies do not always populate the product, so `details` may be
/// missing; the engine then keeps the details it already has for that line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub details: Option<LineDetails>,
}

impl RemoteLine {
    /// Convert into a cart line when details are present.
    #[must_use]
    pub fn into_cart_line(self) -> Option<CartLine> {
        let details = self.details?;
        Some(CartLine {
            product_id: self.product_id,
            unit_price: details.unit_price,
            quantity: self.quantity,
            snapshot: details.snapshot,
        })
    }
}

impl From<CartLine> for RemoteLine {
    fn from(line: CartLine) -> Self {
        Self {
            product_id: line.product_id,
            quantity: line.quantity,
            details: Some(LineDetails {
                unit_price: line.unit_price,
                snapshot: line.snapshot,
            }),
        }
    }
}

/// What a cart mutation answered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartReply {
    /// The whole cart after the mutation.
    Cart(Vec<RemoteLine>),
    /// Only the affected line.
    Line(RemoteLine),
    /// No usable body; the mutation was accepted.
    Acknowledged,
}

// =============================================================================
// Traits
// =============================================================================

/// Cart endpoints.
#[async_trait]
pub trait CartGateway: Send + Sync {
    /// `GET /cart/{userId}`. A user without a cart gets an empty one.
    async fn fetch_cart(&self, user: &UserId) -> Result<Cart, ApiError>;

    /// `POST /cart`. The server merges into an existing line.
    async fn add_line(
        &self,
        user: &UserId,
        product: &ProductId,
        quantity: Quantity,
    ) -> Result<CartReply, ApiError>;

    /// `PATCH /cart/update`.
    async fn update_quantity(
        &self,
        user: &UserId,
        product: &ProductId,
        quantity: Quantity,
    ) -> Result<CartReply, ApiError>;

    /// `DELETE /cart/remove`.
    async fn remove_line(&self, user: &UserId, product: &ProductId) -> Result<CartReply, ApiError>;

    /// `DELETE /cart/clear`.
    async fn clear(&self, user: &UserId) -> Result<(), ApiError>;

    /// `POST /cart/checkout`. Turns the cart into orders and empties it.
    async fn checkout(&self, user: &UserId) -> Result<(), ApiError>;
}

/// Order and product endpoints.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// `GET /orders/user/{userId}`.
    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Order>, ApiError>;

    /// `GET /orders`.
    async fn list_all(&self) -> Result<Vec<Order>, ApiError>;

    /// `PATCH /orders/{id}/{status}`.
    async fn set_status(&self, order: &OrderId, status: OrderStatus) -> Result<(), ApiError>;

    /// `GET /products/{id}`.
    async fn fetch_product(&self, product: &ProductId) -> Result<ProductSnapshot, ApiError>;

    /// Drop any cached snapshot of a product.
    async fn invalidate_product(&self, _product: &ProductId) {}
}

/// Payment provider hand-off.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// `POST /payments/create-order`; returns the hosted approval page.
    async fn create_order(&self, total: &Money) -> Result<Url, ApiError>;
}
