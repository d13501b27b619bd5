//! Type conversion functions from wire types to domain types.

use maya_core::{
    Buyer, Cart, CartId, LineSnapshot, Money, Order, OrderId, OrderStatus, ProductId,
    ProductSnapshot, Quantity, UserId,
};
use tracing::warn;

use super::error::ApiError;
use super::types::{Ref, WireCart, WireCartItem, WireCartReply, WireOrder, WireProduct};
use crate::gateway::{CartReply, LineDetails, RemoteLine};

// =============================================================================
// Products
// =============================================================================

fn stock_of(product: &WireProduct) -> u32 {
    product
        .stock
        .map_or(0, |s| u32::try_from(s.max(0)).unwrap_or(u32::MAX))
}

fn images_of(product: &WireProduct) -> Vec<String> {
    [&product.image_1, &product.image_2, &product.image_3]
        .into_iter()
        .flatten()
        .cloned()
        .collect()
}

/// Convert a product document into a snapshot.
pub fn convert_product(product: WireProduct) -> Result<ProductSnapshot, ApiError> {
    let price = product
        .price
        .ok_or_else(|| ApiError::Malformed(format!("product {} has no price", product.id)))?;
    let name = product
        .name
        .clone()
        .ok_or_else(|| ApiError::Malformed(format!("product {} has no name", product.id)))?;
    let stock = stock_of(&product);
    let images = images_of(&product);
    Ok(ProductSnapshot::new(
        ProductId::new(product.id),
        name,
        images,
        Money::from_decimal(price),
        stock,
    ))
}

/// Price and display details of a populated product.
fn convert_line_details(product: &WireProduct) -> Option<LineDetails> {
    let price = product.price?;
    let name = product.name.clone()?;
    Some(LineDetails {
        unit_price: Money::from_decimal(price),
        snapshot: LineSnapshot {
            name,
            image: images_of(product).into_iter().next(),
            stock_at_add: stock_of(product),
        },
    })
}

// =============================================================================
// Cart
// =============================================================================

/// Convert one cart item. Items whose product was deleted are logged and
/// yield `None`.
fn convert_remote_line(item: WireCartItem) -> Result<Option<RemoteLine>, ApiError> {
    let Some(product) = item.product_id else {
        warn!(quantity = item.quantity, "Skipping cart item without a product");
        return Ok(None);
    };
    let product_id = ProductId::new(product.id());
    let quantity = Quantity::new(item.quantity).map_err(|e| {
        ApiError::Malformed(format!("cart item {product_id} has bad quantity: {e}"))
    })?;
    let details = product.populated().and_then(convert_line_details);
    Ok(Some(RemoteLine {
        product_id,
        quantity,
        details,
    }))
}

fn convert_remote_lines(items: Vec<WireCartItem>) -> Result<Vec<RemoteLine>, ApiError> {
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        lines.extend(convert_remote_line(item)?);
    }
    Ok(lines)
}

/// Convert a fetched cart. Every item must carry populated product details;
/// items whose product no longer exists are dropped.
pub fn convert_cart(cart: WireCart) -> Result<Cart, ApiError> {
    let user_id = UserId::new(cart.user_id.id());
    let lines = convert_remote_lines(cart.items)?
        .into_iter()
        .map(|line| {
            let product_id = line.product_id.clone();
            line.into_cart_line().ok_or_else(|| {
                ApiError::Malformed(format!("cart item {product_id} is missing product details"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Cart::new(
        cart.id.map(CartId::new),
        user_id,
        lines,
        cart.updated_at,
    ))
}

/// Convert the reply of a cart mutation.
pub fn convert_cart_reply(reply: WireCartReply) -> Result<CartReply, ApiError> {
    match reply {
        WireCartReply::Cart(cart) | WireCartReply::Wrapped { cart } => {
            Ok(CartReply::Cart(convert_remote_lines(cart.items)?))
        }
        WireCartReply::Item(item) => Ok(convert_remote_line(item)?
            .map_or(CartReply::Acknowledged, CartReply::Line)),
        WireCartReply::Other(_) => Ok(CartReply::Acknowledged),
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Convert an order document.
///
/// Returns `None` (and logs) for orders whose status is unknown, so one
/// malformed document does not hide the rest of the list. An order whose
/// product was deleted is kept without a product.
pub fn convert_order(order: WireOrder) -> Option<Order> {
    let status = match order.status.parse::<OrderStatus>() {
        Ok(status) => status,
        Err(e) => {
            warn!(order_id = %order.id, error = %e, "Skipping order with unknown status");
            return None;
        }
    };
    if order.quantity < 1 {
        warn!(order_id = %order.id, quantity = order.quantity, "Order quantity below 1, clamping");
    }

    let buyer = order.user_id.populated().and_then(|user| {
        user.name.clone().map(|name| Buyer {
            name,
            email: user.email.clone(),
        })
    });
    if order.product_id.is_none() {
        warn!(order_id = %order.id, "Order has no product reference");
    }
    let product = order.product_id.as_ref().and_then(Ref::populated);

    Some(Order {
        id: OrderId::new(order.id.as_str()),
        user_id: UserId::new(order.user_id.id()),
        buyer,
        product_id: order.product_id.as_ref().map(|p| ProductId::new(p.id())),
        product_name: product.and_then(|p| p.name.clone()),
        unit_price: product.and_then(|p| p.price).map(Money::from_decimal),
        quantity: Quantity::clamped(order.quantity),
        status,
        created_at: order.created_at,
        updated_at: order.updated_at.unwrap_or(order.created_at),
    })
}

/// Convert a list of order documents, skipping malformed ones.
pub fn convert_orders(orders: Vec<WireOrder>) -> Vec<Order> {
    orders.into_iter().filter_map(convert_order).collect()
}
