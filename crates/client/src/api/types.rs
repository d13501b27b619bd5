//! Wire types for the REST API.
//!
//! These mirror the JSON the server sends (document ids under `_id`,
//! references that are either a bare id or a populated object) and are
//! converted into `maya_core` types in `conversions`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// References
// =============================================================================

/// A reference the server may or may not populate.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Ref<T> {
    /// Populated document.
    Populated(T),
    /// Bare document id.
    Id(String),
}

impl<T: HasId> Ref<T> {
    /// Referenced document id.
    pub fn id(&self) -> &str {
        match self {
            Self::Populated(doc) => doc.id(),
            Self::Id(id) => id,
        }
    }

    /// Populated document, if any.
    pub const fn populated(&self) -> Option<&T> {
        match self {
            Self::Populated(doc) => Some(doc),
            Self::Id(_) => None,
        }
    }
}

/// Documents addressable by `_id`.
pub trait HasId {
    /// Document id.
    fn id(&self) -> &str;
}

// =============================================================================
// Products and users
// =============================================================================

/// Product document (`GET /products/{id}`, or populated inside carts/orders).
#[derive(Debug, Clone, Deserialize)]
pub struct WireProduct {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default, rename = "image_1")]
    pub image_1: Option<String>,
    #[serde(default, rename = "image_2")]
    pub image_2: Option<String>,
    #[serde(default, rename = "image_3")]
    pub image_3: Option<String>,
    #[serde(default)]
    pub stock: Option<i64>,
}

impl HasId for WireProduct {
    fn id(&self) -> &str {
        &self.id
    }
}

/// User document populated inside orders.
#[derive(Debug, Clone, Deserialize)]
pub struct WireUser {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl HasId for WireUser {
    fn id(&self) -> &str {
        &self.id
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One cart item. `product_id` is `null` once the product was deleted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCartItem {
    #[serde(default)]
    pub product_id: Option<Ref<WireProduct>>,
    pub quantity: i64,
}

/// Cart document (`GET /cart/{userId}`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCart {
    #[serde(default, rename = "_id")]
    pub id: Option<String>,
    pub user_id: Ref<WireUser>,
    pub items: Vec<WireCartItem>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body returned by cart mutations.
///
/// The server answers with the whole cart, a cart wrapped in an envelope,
/// the single affected item, or something else (a message) that only
/// acknowledges the request.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireCartReply {
    Cart(WireCart),
    Wrapped { cart: WireCart },
    Item(WireCartItem),
    Other(serde_json::Value),
}

/// Body of every cart mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineBody<'a> {
    pub user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

// =============================================================================
// Orders
// =============================================================================

/// Order document (`GET /orders`, `GET /orders/user/{userId}`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireOrder {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: Ref<WireUser>,
    #[serde(default)]
    pub product_id: Option<Ref<WireProduct>>,
    pub quantity: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Payments
// =============================================================================

/// Body of `POST /payments/create-order`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentBody {
    pub total_amount: String,
}

/// Reply of `POST /payments/create-order`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireApproval {
    #[serde(default)]
    pub approval_url: Option<String>,
}

/// Body of `POST /cart/checkout`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody<'a> {
    pub user_id: &'a str,
}

/// Error body (`{"message": ...}` or `{"error": ...}`).
#[derive(Debug, Clone, Deserialize)]
pub struct WireErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
