//! Observable cart state and its reducer.
//!
//! Every change to the local cart goes through [`CartState::apply`]; the
//! engine publishes the result to subscribers after each action.

use std::collections::BTreeSet;

use maya_core::{Cart, CartLine, Money, ProductId, Quantity, UserId};

/// Non-fatal outcome the UI should show after a confirmed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartNotice {
    /// The server settled on a different quantity than requested.
    QuantityAdjusted {
        product_id: ProductId,
        requested: Quantity,
        confirmed: Quantity,
    },
    /// The server no longer lists the line.
    LineDropped { product_id: ProductId },
}

impl std::fmt::Display for CartNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuantityAdjusted {
                product_id,
                requested,
                confirmed,
            } => write!(
                f,
                "Quantity for {product_id} set to {confirmed} (requested {requested})"
            ),
            Self::LineDropped { product_id } => {
                write!(f, "{product_id} is no longer in the cart")
            }
        }
    }
}

/// Local view of the signed-in user's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    /// Last reconciled cart with optimistic edits applied; `None` until the
    /// first load and after a reset.
    pub cart: Option<Cart>,
    /// Lines with a request in flight.
    pub pending: BTreeSet<ProductId>,
    /// Most recent notice.
    pub notice: Option<CartNotice>,
}

/// A single change to [`CartState`].
#[derive(Debug, Clone)]
pub enum CartAction {
    /// Replace the whole cart with a fetched one.
    Replace(Cart),
    /// Forget everything (logout).
    Reset,
    /// Create an empty cart for `user` if none is held.
    Ensure(UserId),
    /// Mark a line as in flight.
    Begin(ProductId),
    /// Clear a line's in-flight mark.
    Finish(ProductId),
    /// Insert a line, or replace it in place if present.
    Upsert(CartLine),
    /// Set a held line's quantity.
    SetQuantity(ProductId, Quantity),
    /// Drop a line.
    Remove(ProductId),
    /// Put a line back at its previous position.
    Restore { index: usize, line: CartLine },
    /// Replace all lines.
    ReplaceLines(Vec<CartLine>),
    /// Adopt the server's lines after a mutation of `owner`.
    ///
    /// Lines with their own request in flight keep their local value until
    /// that request settles.
    Reconcile {
        owner: ProductId,
        lines: Vec<CartLine>,
    },
    /// Publish a notice.
    Notify(CartNotice),
}

impl CartState {
    /// Apply an action.
    ///
    /// Line actions are ignored while no cart is held, so a reply that lands
    /// after a reset does not resurrect the previous user's cart.
    pub fn apply(&mut self, action: CartAction) {
        match action {
            CartAction::Replace(cart) => self.cart = Some(cart),
            CartAction::Reset => *self = Self::default(),
            CartAction::Ensure(user) => {
                if self.cart.is_none() {
                    self.cart = Some(Cart::empty(user));
                }
            }
            CartAction::Begin(product_id) => {
                self.pending.insert(product_id);
            }
            CartAction::Finish(product_id) => {
                self.pending.remove(&product_id);
            }
            CartAction::Notify(notice) => self.notice = Some(notice),
            CartAction::Upsert(line) => {
                if let Some(cart) = self.cart.as_mut() {
                    match cart.lines.iter_mut().find(|l| l.product_id == line.product_id) {
                        Some(existing) => *existing = line,
                        None => cart.lines.push(line),
                    }
                }
            }
            CartAction::SetQuantity(product_id, quantity) => {
                if let Some(line) = self
                    .cart
                    .as_mut()
                    .and_then(|c| c.lines.iter_mut().find(|l| l.product_id == product_id))
                {
                    line.quantity = quantity;
                }
            }
            CartAction::Remove(product_id) => {
                if let Some(cart) = self.cart.as_mut() {
                    cart.lines.retain(|l| l.product_id != product_id);
                }
            }
            CartAction::Restore { index, line } => {
                if let Some(cart) = self.cart.as_mut() {
                    cart.lines.retain(|l| l.product_id != line.product_id);
                    let index = index.min(cart.lines.len());
                    cart.lines.insert(index, line);
                }
            }
            CartAction::ReplaceLines(lines) => {
                if let Some(cart) = self.cart.as_mut() {
                    cart.lines = lines;
                }
            }
            CartAction::Reconcile { owner, lines } => self.reconcile(&owner, lines),
        }
    }

    fn reconcile(&mut self, owner: &ProductId, server: Vec<CartLine>) {
        let pending = &self.pending;
        let Some(cart) = self.cart.as_mut() else {
            return;
        };
        let held = |id: &ProductId| id != owner && pending.contains(id);

        let mut lines: Vec<CartLine> = server
            .into_iter()
            .filter_map(|line| {
                if held(&line.product_id) {
                    cart.line(&line.product_id).cloned()
                } else {
                    Some(line)
                }
            })
            .collect();
        for local in &cart.lines {
            if held(&local.product_id) && !lines.iter().any(|l| l.product_id == local.product_id)
            {
                lines.push(local.clone());
            }
        }
        cart.lines = lines;
    }

    /// Whether a cart has been loaded.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.cart.is_some()
    }

    /// Current lines (empty before the first load).
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        self.cart.as_ref().map(|c| c.lines.as_slice()).unwrap_or_default()
    }

    /// The line for a product.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.cart.as_ref().and_then(|c| c.line(product_id))
    }

    /// Position and value of a product's line.
    #[must_use]
    pub fn position(&self, product_id: &ProductId) -> Option<(usize, &CartLine)> {
        self.lines()
            .iter()
            .enumerate()
            .find(|(_, l)| &l.product_id == product_id)
    }

    /// Whether a line has a request in flight.
    #[must_use]
    pub fn is_pending(&self, product_id: &ProductId) -> bool {
        self.pending.contains(product_id)
    }

    /// Cart total, recomputed from the current lines.
    #[must_use]
    pub fn total(&self) -> Money {
        self.cart.as_ref().map(Cart::total).unwrap_or_default()
    }

    /// Units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.cart.as_ref().map_or(0, Cart::item_count)
    }
}
