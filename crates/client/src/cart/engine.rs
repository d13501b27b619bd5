//! Cart Synchronization Engine.
//!
//! Each mutation applies locally, confirms remotely, and rolls back if the
//! request fails. Mutations of one line are serialized; different lines run
//! concurrently. `load`, `clear` and checkout finalization take the whole cart
//! exclusively.

use std::sync::Arc;

use maya_core::{Cart, CartLine, LineSnapshot, Money, ProductId, ProductSnapshot, Quantity, UserId};
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, instrument, warn};

use super::state::{CartAction, CartNotice, CartState};
use crate::error::{Result, StoreError, add_breadcrumb, clear_sentry_user};
use crate::gateway::{CartGateway, CartReply, RemoteLine};
use crate::locks::KeyedLocks;
use crate::session::Session;

/// Outcome of [`CartEngine::change_quantity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantityChange {
    /// Quantity sent to the server (after clamping).
    pub requested: Quantity,
    /// Quantity the server settled on; `None` if it dropped the line.
    pub confirmed: Option<Quantity>,
    /// Set when `confirmed` differs from `requested`.
    pub notice: Option<CartNotice>,
}

/// Single in-memory representation of the signed-in user's cart.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CartEngine {
    inner: Arc<CartEngineInner>,
}

struct CartEngineInner {
    gateway: Arc<dyn CartGateway>,
    session: Session,
    state: watch::Sender<CartState>,
    lines: KeyedLocks<ProductId>,
    gate: RwLock<()>,
}

impl CartEngine {
    /// Create an engine with an empty, unloaded cart.
    pub fn new(gateway: Arc<dyn CartGateway>, session: Session) -> Self {
        let (state, _) = watch::channel(CartState::default());
        Self {
            inner: Arc::new(CartEngineInner {
                gateway,
                session,
                state,
                lines: KeyedLocks::new(),
                gate: RwLock::new(()),
            }),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.state.subscribe()
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    /// Current lines.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.inner.state.borrow().lines().to_vec()
    }

    /// Current line for a product.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<CartLine> {
        self.inner.state.borrow().line(product_id).cloned()
    }

    /// Cart total, recomputed from the current lines on every call.
    #[must_use]
    pub fn total(&self) -> Money {
        self.inner.state.borrow().total()
    }

    /// Units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.inner.state.borrow().item_count()
    }

    fn dispatch(&self, action: CartAction) {
        self.inner.state.send_modify(|state| state.apply(action));
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Fetch the cart and replace the local one wholesale.
    ///
    /// # Errors
    ///
    /// Returns `IdentityMissing` without a user. On a request failure the
    /// previous state is kept.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Cart> {
        let user = self.inner.session.require_user().await?;
        let _gate = self.inner.gate.write().await;

        let cart = self.inner.gateway.fetch_cart(&user).await.map_err(|e| {
            warn!(error = %e, "Cart load failed, keeping previous state");
            StoreError::from(e)
        })?;
        debug!(lines = cart.lines.len(), "Cart loaded");
        self.dispatch(CartAction::Replace(cart.clone()));
        Ok(cart)
    }

    /// Add units of a product.
    ///
    /// A new line is shown immediately. For a product already in the cart the
    /// server merges the quantities and its result is adopted as-is. A cart
    /// that was never loaded is loaded first.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity` for a quantity below one and
    /// `InsufficientStock` when the snapshot's stock minus what is already in
    /// the cart is smaller than `quantity`. Request failures roll back.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add(&self, product: &ProductSnapshot, quantity: i64) -> Result<CartLine> {
        let quantity = Quantity::new(quantity)?;
        let user = self.inner.session.require_user().await?;
        let loaded = self.inner.state.borrow().is_loaded();
        if !loaded {
            debug!("Cart not loaded yet, loading before add");
            self.load().await?;
        }
        let _gate = self.inner.gate.read().await;
        let _line = self.inner.lines.lock(&product.id).await;

        let existing = self.line(&product.id);
        let in_cart = existing.as_ref().map_or(0, |l| l.quantity.get());
        let available = product.stock.saturating_sub(in_cart);
        if quantity.get() > available {
            return Err(StoreError::InsufficientStock {
                requested: quantity.get(),
                available,
            });
        }

        add_breadcrumb(
            "cart",
            "Added product",
            Some(&[("product_id", product.id.as_str())]),
        );

        self.dispatch(CartAction::Ensure(user.clone()));
        self.dispatch(CartAction::Begin(product.id.clone()));
        let optimistic = CartLine {
            product_id: product.id.clone(),
            unit_price: product.price,
            quantity,
            snapshot: LineSnapshot::from(product),
        };
        if existing.is_none() {
            self.dispatch(CartAction::Upsert(optimistic.clone()));
        }

        let result = self
            .inner
            .gateway
            .add_line(&user, &product.id, quantity)
            .await;

        let outcome = match result {
            Ok(reply) => {
                let acknowledged = existing.is_none().then_some(quantity);
                let confirmed = self
                    .apply_reply(&user, &product.id, reply, acknowledged, Some(&optimistic))
                    .await;
                Ok(confirmed.unwrap_or(optimistic))
            }
            Err(e) => {
                warn!(error = %e, "Add failed, rolling back");
                if existing.is_none() {
                    self.dispatch(CartAction::Remove(product.id.clone()));
                }
                Err(StoreError::from(e))
            }
        };
        self.dispatch(CartAction::Finish(product.id.clone()));
        outcome
    }

    /// Set a line's quantity.
    ///
    /// Values below one are sent as one. The local line changes immediately
    /// and is then corrected to whatever the server confirms; a difference is
    /// reported as a notice, not an error.
    ///
    /// # Errors
    ///
    /// Returns `LineNotFound` if the product is not in the cart. Request
    /// failures restore the previous line.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn change_quantity(
        &self,
        product_id: &ProductId,
        requested: i64,
    ) -> Result<QuantityChange> {
        let target = Quantity::clamped(requested);
        let user = self.inner.session.require_user().await?;
        let _gate = self.inner.gate.read().await;
        let _line = self.inner.lines.lock(product_id).await;

        let previous = self
            .line(product_id)
            .ok_or_else(|| StoreError::LineNotFound(product_id.clone()))?;

        let quantity = target.to_string();
        add_breadcrumb(
            "cart",
            "Changed quantity",
            Some(&[
                ("product_id", product_id.as_str()),
                ("quantity", quantity.as_str()),
            ]),
        );

        self.dispatch(CartAction::Begin(product_id.clone()));
        self.dispatch(CartAction::SetQuantity(product_id.clone(), target));

        let result = self
            .inner
            .gateway
            .update_quantity(&user, product_id, target)
            .await;

        let outcome = match result {
            Ok(reply) => {
                let confirmed = self
                    .apply_reply(&user, product_id, reply, None, Some(&previous))
                    .await
                    .map(|l| l.quantity);
                let notice = match confirmed {
                    Some(quantity) if quantity == target => None,
                    Some(quantity) => Some(CartNotice::QuantityAdjusted {
                        product_id: product_id.clone(),
                        requested: target,
                        confirmed: quantity,
                    }),
                    None => Some(CartNotice::LineDropped {
                        product_id: product_id.clone(),
                    }),
                };
                if let Some(notice) = &notice {
                    info!(%notice, "Server adjusted cart line");
                    self.dispatch(CartAction::Notify(notice.clone()));
                }
                Ok(QuantityChange {
                    requested: target,
                    confirmed,
                    notice,
                })
            }
            Err(e) => {
                warn!(error = %e, "Quantity change failed, rolling back");
                self.dispatch(CartAction::Upsert(previous));
                Err(StoreError::from(e))
            }
        };
        self.dispatch(CartAction::Finish(product_id.clone()));
        outcome
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `LineNotFound` if the product is not in the cart. Request
    /// failures put the line back where it was.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove(&self, product_id: &ProductId) -> Result<()> {
        let user = self.inner.session.require_user().await?;
        let _gate = self.inner.gate.read().await;
        let _line = self.inner.lines.lock(product_id).await;

        let (index, previous) = self
            .inner
            .state
            .borrow()
            .position(product_id)
            .map(|(index, line)| (index, line.clone()))
            .ok_or_else(|| StoreError::LineNotFound(product_id.clone()))?;

        add_breadcrumb(
            "cart",
            "Removed product",
            Some(&[("product_id", product_id.as_str())]),
        );

        self.dispatch(CartAction::Begin(product_id.clone()));
        self.dispatch(CartAction::Remove(product_id.clone()));

        let outcome = match self.inner.gateway.remove_line(&user, product_id).await {
            Ok(CartReply::Cart(remote)) => {
                let lines = self.resolve_lines(&user, remote).await;
                self.dispatch(CartAction::Reconcile {
                    owner: product_id.clone(),
                    lines,
                });
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Remove failed, restoring line");
                self.dispatch(CartAction::Restore {
                    index,
                    line: previous,
                });
                Err(StoreError::from(e))
            }
        };
        self.dispatch(CartAction::Finish(product_id.clone()));
        outcome
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Request failures restore the previous lines.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        let user = self.inner.session.require_user().await?;
        let _gate = self.inner.gate.write().await;

        add_breadcrumb("cart", "Cleared cart", None);

        let previous = self.lines();
        self.dispatch(CartAction::ReplaceLines(Vec::new()));

        if let Err(e) = self.inner.gateway.clear(&user).await {
            warn!(error = %e, "Clear failed, restoring lines");
            self.dispatch(CartAction::ReplaceLines(previous));
            return Err(StoreError::from(e));
        }
        Ok(())
    }

    /// Turn the cart into orders after an approved payment, then reload.
    ///
    /// # Errors
    ///
    /// Returns the finalize request's error; the cart is left untouched.
    #[instrument(skip(self))]
    pub async fn finalize_checkout(&self) -> Result<()> {
        let user = self.inner.session.require_user().await?;
        let _gate = self.inner.gate.write().await;

        add_breadcrumb("checkout", "Finalizing checkout", None);
        self.inner.gateway.checkout(&user).await?;

        match self.inner.gateway.fetch_cart(&user).await {
            Ok(cart) => self.dispatch(CartAction::Replace(cart)),
            Err(e) => {
                warn!(error = %e, "Reload after checkout failed, emptying cart locally");
                self.dispatch(CartAction::Ensure(user));
                self.dispatch(CartAction::ReplaceLines(Vec::new()));
            }
        }
        Ok(())
    }

    /// Drop the local cart without contacting the server (logout).
    pub fn reset(&self) {
        debug!("Cart reset");
        self.dispatch(CartAction::Reset);
        clear_sentry_user();
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Apply a mutation reply for `owner` and return the confirmed line.
    ///
    /// `acknowledged` is the quantity to keep when the server answers without
    /// a body; `None` means the outcome is unknown and the cart is refetched.
    async fn apply_reply(
        &self,
        user: &UserId,
        owner: &ProductId,
        reply: CartReply,
        acknowledged: Option<Quantity>,
        fallback: Option<&CartLine>,
    ) -> Option<CartLine> {
        match reply {
            CartReply::Cart(remote) => {
                let lines = self.resolve_lines(user, remote).await;
                self.dispatch(CartAction::Reconcile {
                    owner: owner.clone(),
                    lines,
                });
            }
            CartReply::Line(remote) if &remote.product_id == owner => {
                let local = self.line(owner);
                match fill_details(remote, local.as_ref().or(fallback)) {
                    Some(line) => self.dispatch(CartAction::Upsert(line)),
                    None => self.refetch(user, owner).await,
                }
            }
            CartReply::Line(remote) => {
                warn!(reply_product = %remote.product_id, "Reply names another line, refetching");
                self.refetch(user, owner).await;
            }
            CartReply::Acknowledged => match acknowledged {
                Some(quantity) => self.dispatch(CartAction::SetQuantity(owner.clone(), quantity)),
                None => self.refetch(user, owner).await,
            },
        }
        self.line(owner)
    }

    /// Turn reply lines into cart lines, borrowing missing details from the
    /// local cart and refetching when that is not enough.
    async fn resolve_lines(&self, user: &UserId, remote: Vec<RemoteLine>) -> Vec<CartLine> {
        let local = self.lines();
        let mut unresolved = false;
        let lines: Vec<CartLine> = remote
            .into_iter()
            .filter_map(|r| {
                let known = local.iter().find(|l| l.product_id == r.product_id);
                let line = fill_details(r, known);
                unresolved |= line.is_none();
                line
            })
            .collect();
        if !unresolved {
            return lines;
        }

        debug!("Reply has unknown lines, refetching cart");
        match self.inner.gateway.fetch_cart(user).await {
            Ok(cart) => cart.lines,
            Err(e) => {
                warn!(error = %e, "Refetch failed, keeping resolvable lines");
                lines
            }
        }
    }

    async fn refetch(&self, user: &UserId, owner: &ProductId) {
        match self.inner.gateway.fetch_cart(user).await {
            Ok(cart) => self.dispatch(CartAction::Reconcile {
                owner: owner.clone(),
                lines: cart.lines,
            }),
            Err(e) => warn!(error = %e, "Refetch failed, line may be stale until next load"),
        }
    }
}

impl std::fmt::Debug for CartEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartEngine")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

/// Complete a reply line with details from `known` when the server omitted
/// them.
fn fill_details(remote: RemoteLine, known: Option<&CartLine>) -> Option<CartLine> {
    let quantity = remote.quantity;
    remote.into_cart_line().or_else(|| {
        known.map(|line| CartLine {
            quantity,
            ..line.clone()
        })
    })
}
