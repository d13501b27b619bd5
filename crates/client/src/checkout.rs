//! Checkout Redirect Bridge.
//!
//! Hands the cart total to the payment provider, then watches the embedded
//! browser's navigations for the provider's return URL:
//!
//! ```text
//! Idle ──begin──▶ AwaitingApproval ──success──▶ Finalizing ──▶ Completed
//!                        │                          │
//!                        └──cancel──▶ Cancelled     └─(finalize fails)─▶ AwaitingApproval
//! ```

use std::sync::Arc;

use maya_core::Money;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::cart::CartEngine;
use crate::config::CheckoutMarkers;
use crate::error::{Result, StoreError, add_breadcrumb};
use crate::gateway::PaymentGateway;
use crate::orders::OrderTracker;

/// Where a checkout stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CheckoutState {
    #[default]
    Idle,
    /// The approval page is open.
    AwaitingApproval { approval_url: Url, total: Money },
    /// The payment was approved and the cart is being turned into orders.
    Finalizing,
    Completed,
    Cancelled,
}

/// What a navigated-to URL means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    Success,
    Cancel,
    /// Any other page; keep browsing.
    Other,
}

/// Result of [`CheckoutBridge::on_navigation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// Not a return URL.
    Continue,
    /// Orders were created; show the order-tracking view.
    Completed,
    /// The buyer cancelled; the cart is untouched.
    Cancelled,
    /// A repeat of a return URL that was already handled.
    AlreadyHandled,
}

/// Classify a URL by the markers in its path segments.
///
/// A segment matches when it contains the marker, ignoring case, so
/// `/payments/success.html` is a success. The query string and fragment are
/// ignored. A success marker wins over a cancel marker.
#[must_use]
pub fn classify(url: &Url, markers: &CheckoutMarkers) -> ReturnKind {
    let segments: Vec<String> = url
        .path_segments()
        .map(|segments| segments.map(str::to_lowercase).collect())
        .unwrap_or_default();
    let has = |marker: &str| {
        let marker = marker.to_lowercase();
        segments.iter().any(|s| s.contains(&marker))
    };

    if has(&markers.success) {
        ReturnKind::Success
    } else if has(&markers.cancel) {
        ReturnKind::Cancel
    } else {
        ReturnKind::Other
    }
}

/// Drives one checkout at a time for the signed-in user.
#[derive(Clone)]
pub struct CheckoutBridge {
    inner: Arc<CheckoutBridgeInner>,
}

struct CheckoutBridgeInner {
    payments: Arc<dyn PaymentGateway>,
    cart: CartEngine,
    orders: OrderTracker,
    markers: CheckoutMarkers,
    state: Mutex<CheckoutState>,
}

impl CheckoutBridge {
    pub fn new(
        payments: Arc<dyn PaymentGateway>,
        cart: CartEngine,
        orders: OrderTracker,
        markers: CheckoutMarkers,
    ) -> Self {
        Self {
            inner: Arc::new(CheckoutBridgeInner {
                payments,
                cart,
                orders,
                markers,
                state: Mutex::new(CheckoutState::Idle),
            }),
        }
    }

    /// Current state.
    pub async fn state(&self) -> CheckoutState {
        self.inner.state.lock().await.clone()
    }

    /// Reload the cart and request an approval URL for its total.
    ///
    /// Starting again while a checkout is open replaces it.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart` when the reloaded cart has no lines, or the
    /// request error. The state is unchanged on error.
    #[instrument(skip(self))]
    pub async fn begin(&self) -> Result<Url> {
        let mut state = self.inner.state.lock().await;

        let cart = self.inner.cart.load().await?;
        if cart.lines.is_empty() {
            return Err(StoreError::EmptyCart);
        }
        let total = cart.total();

        add_breadcrumb(
            "checkout",
            "Requested approval URL",
            Some(&[("total", total.to_fixed().as_str())]),
        );
        let approval_url = self.inner.payments.create_order(&total).await?;
        info!(%total, url = %approval_url, "Awaiting payment approval");

        *state = CheckoutState::AwaitingApproval {
            approval_url: approval_url.clone(),
            total,
        };
        Ok(approval_url)
    }

    /// Inspect a URL the embedded browser navigated to.
    ///
    /// On a success URL the cart is finalized and the buyer's orders are
    /// refreshed. If finalizing fails the checkout stays open, so the same
    /// return URL can be retried.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutNotStarted` for a return URL with no open checkout,
    /// or the finalize error.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn on_navigation(&self, url: &Url) -> Result<NavigationOutcome> {
        let kind = classify(url, &self.inner.markers);
        if kind == ReturnKind::Other {
            return Ok(NavigationOutcome::Continue);
        }

        let mut state = self.inner.state.lock().await;
        match &*state {
            CheckoutState::AwaitingApproval { .. } => {}
            CheckoutState::Finalizing | CheckoutState::Completed | CheckoutState::Cancelled => {
                debug!(state = ?*state, "Return URL already handled");
                return Ok(NavigationOutcome::AlreadyHandled);
            }
            CheckoutState::Idle => return Err(StoreError::CheckoutNotStarted),
        }

        if kind == ReturnKind::Cancel {
            info!("Payment cancelled");
            add_breadcrumb("checkout", "Payment cancelled", None);
            *state = CheckoutState::Cancelled;
            return Ok(NavigationOutcome::Cancelled);
        }

        let previous = std::mem::replace(&mut *state, CheckoutState::Finalizing);
        if let Err(e) = self.inner.cart.finalize_checkout().await {
            warn!(error = %e, "Finalizing checkout failed");
            *state = previous;
            return Err(e);
        }

        if let Err(e) = self.inner.orders.refresh().await {
            warn!(error = %e, "Order refresh after checkout failed");
        }
        info!("Checkout completed");
        *state = CheckoutState::Completed;
        Ok(NavigationOutcome::Completed)
    }

    /// Return to `Idle`.
    pub async fn reset(&self) {
        *self.inner.state.lock().await = CheckoutState::Idle;
    }
}
