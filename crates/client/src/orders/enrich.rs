//! Product enrichment of order lists.

use std::collections::HashMap;

use futures::future::join_all;
use maya_core::{Order, OrderId, ProductId, ProductSnapshot, TrackedOrder};
use tracing::warn;

use crate::gateway::OrderGateway;

/// Reported when an order has no usable product.
const MISSING_PRODUCT: &str = "product reference missing";

/// An order whose product could not be fetched.
///
/// `product_id` is `None` when the order no longer references a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentFailure {
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub error: String,
}

/// Fetch the product of every order concurrently.
///
/// Each distinct product is requested once. A failed fetch leaves the
/// affected orders without a product and is reported in the second element;
/// it never drops an order or fails the whole list.
pub async fn enrich(
    gateway: &dyn OrderGateway,
    orders: Vec<Order>,
) -> (Vec<TrackedOrder>, Vec<EnrichmentFailure>) {
    let mut product_ids: Vec<&ProductId> =
        orders.iter().filter_map(|o| o.product_id.as_ref()).collect();
    product_ids.sort();
    product_ids.dedup();

    let results = join_all(product_ids.iter().map(|id| gateway.fetch_product(id))).await;
    let fetched: HashMap<ProductId, Result<ProductSnapshot, String>> = product_ids
        .into_iter()
        .cloned()
        .zip(results.into_iter().map(|r| r.map_err(|e| e.to_string())))
        .collect();

    let mut failures = Vec::new();
    let tracked = orders
        .into_iter()
        .map(|order| {
            let Some(product_id) = order.product_id.clone() else {
                warn!(order_id = %order.id, "Order has no product to enrich");
                failures.push(EnrichmentFailure {
                    order_id: order.id.clone(),
                    product_id: None,
                    error: MISSING_PRODUCT.to_string(),
                });
                return TrackedOrder::new(order, None);
            };
            let product = match fetched.get(&product_id) {
                Some(Ok(snapshot)) => Some(snapshot.clone()),
                Some(Err(error)) => {
                    warn!(
                        order_id = %order.id,
                        product_id = %product_id,
                        error = %error,
                        "Order enrichment failed"
                    );
                    failures.push(EnrichmentFailure {
                        order_id: order.id.clone(),
                        product_id: Some(product_id),
                        error: error.clone(),
                    });
                    None
                }
                None => None,
            };
            TrackedOrder::new(order, product)
        })
        .collect();

    (tracked, failures)
}
