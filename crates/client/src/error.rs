//! Unified error handling with Sentry integration.
//!
//! Every cart, order and checkout operation returns `Result<T, StoreError>`.
//! Optimistic changes are rolled back before an error is returned, so callers
//! only render the message and offer a retry when [`StoreError::is_retryable`].

use maya_core::{OrderId, ProductId, QuantityError};
use thiserror::Error;

use crate::api::ApiError;
use crate::qr::DecodeError;

/// Error type for storefront operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No signed-in user; the caller should route to sign-in.
    #[error("No signed-in user")]
    IdentityMissing,

    /// Transient failure reaching the server. Prior state is preserved.
    #[error("Network error: {0}")]
    Network(ApiError),

    /// The server refused the request (stock exceeded, illegal transition).
    #[error("{message}")]
    Rejected {
        /// HTTP status, when the server answered.
        status: Option<u16>,
        /// Server message, shown verbatim.
        message: String,
    },

    /// A scanned symbol is not an order identifier.
    #[error("Invalid QR code: {0}")]
    InvalidSymbol(#[from] DecodeError),

    /// The cart has no line for this product.
    #[error("Product {0} is not in the cart")]
    LineNotFound(ProductId),

    /// The order is not in the tracked list.
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    /// Requested more units than the last known stock.
    #[error("Only {available} in stock (requested {requested})")]
    InsufficientStock {
        /// Units requested.
        requested: u32,
        /// Units known to be available.
        available: u32,
    },

    /// A quantity that cannot be sent.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityError),

    /// Checkout started with nothing in the cart.
    #[error("The cart is empty")]
    EmptyCart,

    /// A checkout return URL arrived with no checkout in progress.
    #[error("No checkout in progress")]
    CheckoutNotStarted,
}

impl StoreError {
    /// Whether the same operation may succeed if retried later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Whether the caller should route to sign-in.
    #[must_use]
    pub const fn requires_sign_in(&self) -> bool {
        matches!(self, Self::IdentityMissing)
    }
}

impl From<ApiError> for StoreError {
    fn from(err: ApiError) -> Self {
        if err.is_transient() {
            return Self::Network(err);
        }
        let status = err.status();
        let message = match err {
            ApiError::Status { message, .. } | ApiError::NotFound(message) => message,
            other => other.to_string(),
        };
        Self::Rejected { status, message }
    }
}

/// Result type alias for `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after sign-in to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Changed quantity", Some(&[("product_id", "p1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
