//! REST client for the storefront API.
//!
//! Uses `reqwest` 0.13 for HTTP. Product snapshots are cached with `moka`
//! (TTL from [`ClientConfig::product_cache_ttl`]); carts and orders are never
//! cached.

mod conversions;
mod error;
mod types;

pub use error::ApiError;

use std::sync::Arc;

use async_trait::async_trait;
use maya_core::{
    Cart, Money, Order, OrderId, OrderStatus, ProductId, ProductSnapshot, Quantity, UserId,
};
use moka::future::Cache;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ClientConfig;
use crate::gateway::{CartGateway, CartReply, OrderGateway, PaymentGateway};

use conversions::{convert_cart, convert_cart_reply, convert_orders, convert_product};
use types::{
    CartLineBody, CheckoutBody, CreatePaymentBody, WireApproval, WireCart, WireCartReply,
    WireErrorBody, WireOrder, WireProduct,
};

/// Maximum body characters written to logs.
const LOG_BODY_LIMIT: usize = 500;

/// Maximum body characters kept in an error message.
const MESSAGE_BODY_LIMIT: usize = 200;

/// Maximum cached product snapshots.
const PRODUCT_CACHE_CAPACITY: u64 = 1000;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront REST API.
///
/// Cheap to clone; clones share the connection pool and product cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    config: ClientConfig,
    products: Cache<ProductId, ProductSnapshot>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let products = Cache::builder()
            .max_capacity(PRODUCT_CACHE_CAPACITY)
            .time_to_live(config.product_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                config,
                products,
            }),
        })
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Send a request and return the body text (`None` when empty).
    async fn execute<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<String>, ApiError> {
        let url = self.inner.config.endpoint(path);
        let mut request = self.inner.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                url = %url,
                body = %truncate(&response_text, LOG_BODY_LIMIT),
                "API returned non-success status"
            );
            let message = error_message(&response_text)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
            if status == StatusCode::NOT_FOUND {
                return Err(ApiError::NotFound(message));
            }
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        if response_text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(response_text))
    }

    /// Send a request and parse a JSON body.
    async fn execute_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let text = self
            .execute(method, path, body)
            .await?
            .ok_or_else(|| ApiError::Malformed(format!("empty body from {path}")))?;
        parse_body(&text)
    }

    /// Send a cart mutation and interpret its reply.
    async fn execute_cart_mutation(
        &self,
        method: Method,
        path: &str,
        body: &CartLineBody<'_>,
    ) -> Result<CartReply, ApiError> {
        match self.execute(method, path, Some(body)).await? {
            Some(text) => convert_cart_reply(parse_body::<WireCartReply>(&text)?),
            None => Ok(CartReply::Acknowledged),
        }
    }
}

// =============================================================================
// Gateway implementations
// =============================================================================

#[async_trait]
impl CartGateway for ApiClient {
    #[instrument(skip(self), fields(user_id = %user))]
    async fn fetch_cart(&self, user: &UserId) -> Result<Cart, ApiError> {
        let path = format!("cart/{}", urlencoding::encode(user.as_str()));
        match self.execute_json::<(), WireCart>(Method::GET, &path, None).await {
            Ok(cart) => convert_cart(cart),
            Err(ApiError::NotFound(_)) => {
                debug!("No remote cart yet, treating as empty");
                Ok(Cart::empty(user.clone()))
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(user_id = %user, product_id = %product, quantity = %quantity))]
    async fn add_line(
        &self,
        user: &UserId,
        product: &ProductId,
        quantity: Quantity,
    ) -> Result<CartReply, ApiError> {
        let body = CartLineBody {
            user_id: user.as_str(),
            product_id: Some(product.as_str()),
            quantity: Some(quantity.get()),
        };
        self.execute_cart_mutation(Method::POST, "cart", &body).await
    }

    #[instrument(skip(self), fields(user_id = %user, product_id = %product, quantity = %quantity))]
    async fn update_quantity(
        &self,
        user: &UserId,
        product: &ProductId,
        quantity: Quantity,
    ) -> Result<CartReply, ApiError> {
        let body = CartLineBody {
            user_id: user.as_str(),
            product_id: Some(product.as_str()),
            quantity: Some(quantity.get()),
        };
        self.execute_cart_mutation(Method::PATCH, "cart/update", &body)
            .await
    }

    #[instrument(skip(self), fields(user_id = %user, product_id = %product))]
    async fn remove_line(&self, user: &UserId, product: &ProductId) -> Result<CartReply, ApiError> {
        let body = CartLineBody {
            user_id: user.as_str(),
            product_id: Some(product.as_str()),
            quantity: None,
        };
        self.execute_cart_mutation(Method::DELETE, "cart/remove", &body)
            .await
    }

    #[instrument(skip(self), fields(user_id = %user))]
    async fn clear(&self, user: &UserId) -> Result<(), ApiError> {
        let body = CartLineBody {
            user_id: user.as_str(),
            product_id: None,
            quantity: None,
        };
        self.execute(Method::DELETE, "cart/clear", Some(&body))
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user))]
    async fn checkout(&self, user: &UserId) -> Result<(), ApiError> {
        let body = CheckoutBody {
            user_id: user.as_str(),
        };
        self.execute(Method::POST, "cart/checkout", Some(&body))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl OrderGateway for ApiClient {
    #[instrument(skip(self), fields(user_id = %user))]
    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Order>, ApiError> {
        let path = format!("orders/user/{}", urlencoding::encode(user.as_str()));
        let orders: Vec<WireOrder> = self.execute_json::<(), _>(Method::GET, &path, None).await?;
        Ok(convert_orders(orders))
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<Order>, ApiError> {
        let orders: Vec<WireOrder> = self
            .execute_json::<(), _>(Method::GET, "orders", None)
            .await?;
        Ok(convert_orders(orders))
    }

    #[instrument(skip(self), fields(order_id = %order, status = %status))]
    async fn set_status(&self, order: &OrderId, status: OrderStatus) -> Result<(), ApiError> {
        let path = format!(
            "orders/{}/{}",
            urlencoding::encode(order.as_str()),
            status.as_str()
        );
        self.execute::<()>(Method::PATCH, &path, None).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product))]
    async fn fetch_product(&self, product: &ProductId) -> Result<ProductSnapshot, ApiError> {
        // Check cache
        if let Some(snapshot) = self.inner.products.get(product).await {
            debug!("Cache hit for product");
            return Ok(snapshot);
        }

        let path = format!("products/{}", urlencoding::encode(product.as_str()));
        let wire: WireProduct = self.execute_json::<(), _>(Method::GET, &path, None).await?;
        let snapshot = convert_product(wire)?;

        // Cache the result
        self.inner
            .products
            .insert(product.clone(), snapshot.clone())
            .await;

        Ok(snapshot)
    }

    async fn invalidate_product(&self, product: &ProductId) {
        self.inner.products.invalidate(product).await;
    }
}

#[async_trait]
impl PaymentGateway for ApiClient {
    #[instrument(skip(self), fields(total = %total))]
    async fn create_order(&self, total: &Money) -> Result<Url, ApiError> {
        let body = CreatePaymentBody {
            total_amount: total.to_fixed(),
        };
        let approval: WireApproval = self
            .execute_json(Method::POST, "payments/create-order", Some(&body))
            .await?;
        let raw = approval
            .approval_url
            .ok_or_else(|| ApiError::Malformed("reply has no approvalUrl".to_string()))?;
        Url::parse(&raw).map_err(|e| ApiError::Malformed(format!("bad approvalUrl '{raw}': {e}")))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Parse a JSON body, logging it when it does not match.
fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %truncate(text, LOG_BODY_LIMIT),
            "Failed to parse API response"
        );
        ApiError::Parse(e)
    })
}

/// Extract a human-readable message from an error body.
///
/// Prefers a JSON `message` or `error` field; falls back to the raw body.
fn error_message(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<WireErrorBody>(body)
        && let Some(message) = parsed.message.or(parsed.error)
        && !message.trim().is_empty()
    {
        return Some(message);
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(truncate(trimmed, MESSAGE_BODY_LIMIT))
    }
}
