//! Order Fulfillment Tracker.
//!
//! Holds the enriched order list for one scope (the signed-in buyer, or the
//! whole warehouse) and drives orders through
//! `pendiente -> almacenado -> completado`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use maya_core::{Order, OrderId, OrderStatus, TrackedOrder, UserId};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::enrich::{EnrichmentFailure, enrich};
use crate::error::{Result, StoreError, add_breadcrumb};
use crate::gateway::OrderGateway;
use crate::locks::KeyedLocks;
use crate::qr;
use crate::session::Session;

/// Which orders a tracker lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    /// Orders of the signed-in user.
    User,
    /// Every order (warehouse view).
    Warehouse,
}

/// An enriched order list and the enrichment failures that came with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBook {
    pub orders: Vec<TrackedOrder>,
    pub failures: Vec<EnrichmentFailure>,
    pub refreshed_at: Option<DateTime<Utc>>,
    generation: u64,
}

impl OrderBook {
    /// Find an order by ID.
    #[must_use]
    pub fn find(&self, order_id: &OrderId) -> Option<&TrackedOrder> {
        self.orders.iter().find(|o| o.id() == order_id)
    }
}

/// Result of [`OrderTracker::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// One transition was sent and accepted.
    Advanced { from: OrderStatus, to: OrderStatus },
    /// The order was already `completado`; nothing was sent.
    AlreadyCompleted,
}

/// Order list plus the fulfillment state machine.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct OrderTracker {
    inner: Arc<OrderTrackerInner>,
}

struct OrderTrackerInner {
    gateway: Arc<dyn OrderGateway>,
    session: Session,
    scope: OrderScope,
    book: watch::Sender<OrderBook>,
    orders: KeyedLocks<OrderId>,
    generations: AtomicU64,
}

impl OrderTracker {
    /// Create a tracker with an empty list.
    pub fn new(gateway: Arc<dyn OrderGateway>, session: Session, scope: OrderScope) -> Self {
        let (book, _) = watch::channel(OrderBook::default());
        Self {
            inner: Arc::new(OrderTrackerInner {
                gateway,
                session,
                scope,
                book,
                orders: KeyedLocks::new(),
                generations: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn scope(&self) -> OrderScope {
        self.inner.scope
    }

    /// Subscribe to list changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<OrderBook> {
        self.inner.book.subscribe()
    }

    /// Copy of the current list.
    #[must_use]
    pub fn snapshot(&self) -> OrderBook {
        self.inner.book.borrow().clone()
    }

    /// Current orders.
    #[must_use]
    pub fn orders(&self) -> Vec<TrackedOrder> {
        self.inner.book.borrow().orders.clone()
    }

    /// An order from the current list.
    #[must_use]
    pub fn find(&self, order_id: &OrderId) -> Option<TrackedOrder> {
        self.inner.book.borrow().find(order_id).cloned()
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Fetch and enrich a user's orders without touching the held list.
    ///
    /// # Errors
    ///
    /// Returns an error if the order list cannot be fetched. Product fetch
    /// failures are reported in [`OrderBook::failures`] instead.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn list_for_user(&self, user: &UserId) -> Result<OrderBook> {
        let orders = self.inner.gateway.list_for_user(user).await?;
        Ok(self.enriched(orders).await)
    }

    /// Fetch and enrich every order without touching the held list.
    ///
    /// # Errors
    ///
    /// Returns an error if the order list cannot be fetched.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<OrderBook> {
        let orders = self.inner.gateway.list_all().await?;
        Ok(self.enriched(orders).await)
    }

    async fn enriched(&self, orders: Vec<Order>) -> OrderBook {
        let (orders, failures) = enrich(self.inner.gateway.as_ref(), orders).await;
        OrderBook {
            orders,
            failures,
            refreshed_at: Some(Utc::now()),
            generation: 0,
        }
    }

    /// Replace the held list with a fresh fetch for this tracker's scope.
    ///
    /// When refreshes overlap, the one started last wins.
    ///
    /// # Errors
    ///
    /// Returns `IdentityMissing` for a user-scoped tracker without a user, or
    /// the fetch error. The held list is unchanged on error.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<OrderBook> {
        let generation = self.inner.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let mut book = match self.inner.scope {
            OrderScope::User => {
                let user = self.inner.session.require_user().await?;
                self.list_for_user(&user).await?
            }
            OrderScope::Warehouse => self.list_all().await?,
        };
        book.generation = generation;
        debug!(
            orders = book.orders.len(),
            failures = book.failures.len(),
            "Orders refreshed"
        );

        self.inner.book.send_if_modified(|held| {
            if held.generation > generation {
                return false;
            }
            *held = book.clone();
            true
        });
        Ok(book)
    }

    // =========================================================================
    // Fulfillment
    // =========================================================================

    /// Move an order to its next status.
    ///
    /// The target is computed from the current status, never supplied by the
    /// caller. Calls for the same order are serialized and each re-reads the
    /// status first, so a repeat on a completed order sends nothing. After a
    /// successful transition the list is refreshed in full.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound` if the order is not listed even after a
    /// refresh, or the server's rejection of the transition.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn advance(&self, order_id: &OrderId) -> Result<AdvanceOutcome> {
        let _order = self.inner.orders.lock(order_id).await;

        let tracked = match self.find(order_id) {
            Some(tracked) => tracked,
            None => {
                self.refresh().await?;
                self.find(order_id)
                    .ok_or_else(|| StoreError::OrderNotFound(order_id.clone()))?
            }
        };

        let from = tracked.status();
        let Some(to) = from.next() else {
            debug!("Order already completed, nothing to send");
            return Ok(AdvanceOutcome::AlreadyCompleted);
        };

        add_breadcrumb(
            "orders",
            "Advancing order",
            Some(&[("order_id", order_id.as_str()), ("status", to.as_str())]),
        );

        self.inner
            .gateway
            .set_status(order_id, to)
            .await
            .map_err(|e| {
                warn!(error = %e, %from, %to, "Transition rejected");
                StoreError::from(e)
            })?;
        info!(%from, %to, "Order advanced");

        if let Some(product) = &tracked.order.product_id {
            self.inner.gateway.invalidate_product(product).await;
        }

        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Refresh after transition failed, patching status locally");
            self.inner.book.send_modify(|book| {
                if let Some(held) = book.orders.iter_mut().find(|o| o.id() == order_id) {
                    held.order.status = to;
                }
            });
        }

        Ok(AdvanceOutcome::Advanced { from, to })
    }

    /// Decode a scanned QR payload and advance that order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSymbol` without contacting the server when the payload
    /// is not an order ID; otherwise as [`Self::advance`].
    pub async fn advance_scanned(&self, raw: &str) -> Result<(OrderId, AdvanceOutcome)> {
        let order_id = qr::decode(raw)?;
        let outcome = self.advance(&order_id).await?;
        Ok((order_id, outcome))
    }
}

impl std::fmt::Debug for OrderTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderTracker")
            .field("scope", &self.inner.scope)
            .field("orders", &self.inner.book.borrow().orders.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::Ordering;

    use maya_core::ProductId;

    use super::*;
    use crate::session::StaticIdentity;
    use crate::testing::{FakeOrderGateway, Gate, order, product};

    fn warehouse(gateway: &Arc<FakeOrderGateway>) -> OrderTracker {
        OrderTracker::new(
            gateway.clone(),
            Session::fixed(UserId::new("u1")),
            OrderScope::Warehouse,
        )
    }

    fn gateway_with(orders: Vec<Order>) -> Arc<FakeOrderGateway> {
        FakeOrderGateway::new(orders, [product("p1", 1000, 5), product("p2", 500, 2)])
    }

    #[tokio::test]
    async fn test_refresh_keeps_orders_with_failed_enrichment() {
        let gateway = gateway_with(vec![
            order("A", "Ana", "p1", OrderStatus::Pending),
            order("O", "Omar", "missing", OrderStatus::Pending),
            order("B", "Beto", "p2", OrderStatus::Stored),
        ]);
        let tracker = warehouse(&gateway);

        let book = tracker.refresh().await.unwrap();
        let ids: Vec<_> = book.orders.iter().map(|o| o.id().as_str()).collect();
        assert_eq!(ids, vec!["A", "O", "B"]);
        assert!(book.orders[1].product.is_none());
        assert_eq!(book.failures.len(), 1);
        assert_eq!(tracker.orders().len(), 3);
    }

    #[tokio::test]
    async fn test_user_scope_requires_identity() {
        let gateway = gateway_with(vec![order("A", "Ana", "p1", OrderStatus::Pending)]);
        let tracker = OrderTracker::new(
            gateway.clone(),
            Session::new(StaticIdentity(None)),
            OrderScope::User,
        );
        assert!(tracker.refresh().await.unwrap_err().requires_sign_in());
        assert_eq!(gateway.lists.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_list() {
        let gateway = gateway_with(vec![order("A", "Ana", "p1", OrderStatus::Pending)]);
        let tracker = warehouse(&gateway);
        tracker.refresh().await.unwrap();

        gateway.set_offline(true);
        assert!(tracker.refresh().await.unwrap_err().is_retryable());
        assert_eq!(tracker.orders().len(), 1);
    }

    #[tokio::test]
    async fn test_advance_walks_the_state_machine() {
        let gateway = gateway_with(vec![order("A", "Ana", "p1", OrderStatus::Pending)]);
        let tracker = warehouse(&gateway);
        tracker.refresh().await.unwrap();
        let id = OrderId::new("A");

        assert_eq!(
            tracker.advance(&id).await.unwrap(),
            AdvanceOutcome::Advanced {
                from: OrderStatus::Pending,
                to: OrderStatus::Stored
            }
        );
        assert_eq!(tracker.find(&id).unwrap().status(), OrderStatus::Stored);

        assert_eq!(
            tracker.advance(&id).await.unwrap(),
            AdvanceOutcome::Advanced {
                from: OrderStatus::Stored,
                to: OrderStatus::Completed
            }
        );
        assert_eq!(gateway.status_of("A"), Some(OrderStatus::Completed));
        assert_eq!(
            gateway.invalidated.lock().unwrap().as_slice(),
            &[ProductId::new("p1"), ProductId::new("p1")]
        );
    }

    #[tokio::test]
    async fn test_advance_on_completed_sends_nothing() {
        let gateway = gateway_with(vec![order("A", "Ana", "p1", OrderStatus::Completed)]);
        let tracker = warehouse(&gateway);
        tracker.refresh().await.unwrap();
        let lists = gateway.lists.load(Ordering::SeqCst);

        for _ in 0..3 {
            assert_eq!(
                tracker.advance(&OrderId::new("A")).await.unwrap(),
                AdvanceOutcome::AlreadyCompleted
            );
        }
        assert_eq!(gateway.transition_count(), 0);
        assert_eq!(gateway.lists.load(Ordering::SeqCst), lists);
    }

    #[tokio::test]
    async fn test_concurrent_advances_send_one_transition_each_step() {
        let gateway = gateway_with(vec![order("A", "Ana", "p1", OrderStatus::Stored)]);
        let tracker = warehouse(&gateway);
        tracker.refresh().await.unwrap();

        let gate = Gate::new();
        gateway.hold_with(gate.clone());
        let first = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.advance(&OrderId::new("A")).await })
        };
        gate.entered().await;
        let second = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.advance(&OrderId::new("A")).await })
        };
        gate.release();

        assert!(matches!(
            first.await.unwrap().unwrap(),
            AdvanceOutcome::Advanced { .. }
        ));
        assert_eq!(
            second.await.unwrap().unwrap(),
            AdvanceOutcome::AlreadyCompleted
        );
        assert_eq!(gateway.transition_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_after_transition_patches_locally() {
        let gateway = gateway_with(vec![order("A", "Ana", "p1", OrderStatus::Pending)]);
        let tracker = warehouse(&gateway);
        tracker.refresh().await.unwrap();
        gateway.fail_lists_after(0);

        let outcome = tracker.advance(&OrderId::new("A")).await.unwrap();
        assert!(matches!(outcome, AdvanceOutcome::Advanced { .. }));
        assert_eq!(
            tracker.find(&OrderId::new("A")).unwrap().status(),
            OrderStatus::Stored
        );
    }

    #[tokio::test]
    async fn test_advance_unknown_order_refreshes_first() {
        let gateway = gateway_with(vec![order("A", "Ana", "p1", OrderStatus::Pending)]);
        let tracker = warehouse(&gateway);

        tracker.advance(&OrderId::new("A")).await.unwrap();
        assert_eq!(gateway.status_of("A"), Some(OrderStatus::Stored));

        assert!(matches!(
            tracker.advance(&OrderId::new("Z")).await.unwrap_err(),
            StoreError::OrderNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_advance_scanned_rejects_foreign_codes() {
        let id = "675a1f9c2b3e4d5f6a7b8c9d";
        let gateway = gateway_with(vec![order(id, "Ana", "p1", OrderStatus::Stored)]);
        let tracker = warehouse(&gateway);
        tracker.refresh().await.unwrap();

        let err = tracker
            .advance_scanned("https://example.com/promo")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidSymbol(_)));
        assert_eq!(gateway.transition_count(), 0);

        let (scanned, outcome) = tracker.advance_scanned(&format!("{id}\n")).await.unwrap();
        assert_eq!(scanned.as_str(), id);
        assert_eq!(
            outcome,
            AdvanceOutcome::Advanced {
                from: OrderStatus::Stored,
                to: OrderStatus::Completed
            }
        );
    }

    #[tokio::test]
    async fn test_rejected_transition_leaves_status() {
        let gateway = gateway_with(vec![order("A", "Ana", "p1", OrderStatus::Pending)]);
        let tracker = warehouse(&gateway);
        tracker.refresh().await.unwrap();
        gateway.set_offline(true);

        let err = tracker.advance(&OrderId::new("A")).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(
            tracker.find(&OrderId::new("A")).unwrap().status(),
            OrderStatus::Pending
        );
        assert_eq!(gateway.status_of("A"), Some(OrderStatus::Pending));
    }
}
