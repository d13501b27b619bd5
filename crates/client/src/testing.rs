//! In-memory gateways for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use maya_core::{
    Cart, CartLine, LineSnapshot, Money, Order, OrderId, OrderStatus, ProductId, ProductSnapshot,
    Quantity, UserId,
};
use rust_decimal::Decimal;
use tokio::sync::Notify;
use url::Url;

use crate::api::ApiError;
use crate::gateway::{CartGateway, CartReply, OrderGateway, PaymentGateway, RemoteLine};

// =============================================================================
// Fixtures
// =============================================================================

pub fn product(id: &str, cents: i64, stock: u32) -> ProductSnapshot {
    ProductSnapshot::new(
        ProductId::new(id),
        format!("Product {id}"),
        [format!("https://img.example/{id}.jpg")],
        Money::from_decimal(Decimal::new(cents, 2)),
        stock,
    )
}

pub fn cart_line(product: &ProductSnapshot, quantity: i64) -> CartLine {
    CartLine {
        product_id: product.id.clone(),
        unit_price: product.price,
        quantity: Quantity::clamped(quantity),
        snapshot: LineSnapshot::from(product),
    }
}

pub fn order(id: &str, buyer: &str, product_id: &str, status: OrderStatus) -> Order {
    Order {
        id: OrderId::new(id),
        user_id: UserId::new("u1"),
        buyer: Some(maya_core::Buyer {
            name: buyer.to_string(),
            email: None,
        }),
        product_id: Some(ProductId::new(product_id)),
        product_name: None,
        unit_price: None,
        quantity: Quantity::ONE,
        status,
        created_at: DateTime::<Utc>::default(),
        updated_at: DateTime::<Utc>::default(),
    }
}

fn offline() -> ApiError {
    ApiError::Request("network unreachable".to_string())
}

// =============================================================================
// Gate
// =============================================================================

/// Pauses a fake request so a test can observe the optimistic state.
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Wait until a request reaches the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the waiting request continue.
    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

async fn pass(gate: &Mutex<Option<Arc<Gate>>>) {
    let gate = gate.lock().unwrap().clone();
    if let Some(gate) = gate {
        gate.pass().await;
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Shape of mutation replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    /// Whole cart with populated products.
    FullCart,
    /// Whole cart with bare product ids.
    BareCart,
    /// Only the affected line, unpopulated.
    Line,
    /// Empty body.
    Acknowledged,
}

/// Server-side cart for a single user.
pub struct FakeCartGateway {
    catalog: HashMap<ProductId, ProductSnapshot>,
    lines: Mutex<Vec<CartLine>>,
    stock_limit: Mutex<HashMap<ProductId, u32>>,
    mode: Mutex<ReplyMode>,
    offline: AtomicBool,
    reject: Mutex<Option<String>>,
    hold: Mutex<Option<Arc<Gate>>>,
    pub mutations: AtomicUsize,
    pub fetches: AtomicUsize,
    pub checkouts: AtomicUsize,
}

impl FakeCartGateway {
    pub fn new(catalog: impl IntoIterator<Item = ProductSnapshot>) -> Arc<Self> {
        Arc::new(Self {
            catalog: catalog.into_iter().map(|p| (p.id.clone(), p)).collect(),
            lines: Mutex::new(Vec::new()),
            stock_limit: Mutex::new(HashMap::new()),
            mode: Mutex::new(ReplyMode::FullCart),
            offline: AtomicBool::new(false),
            reject: Mutex::new(None),
            hold: Mutex::new(None),
            mutations: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            checkouts: AtomicUsize::new(0),
        })
    }

    pub fn seed(&self, lines: Vec<CartLine>) {
        *self.lines.lock().unwrap() = lines;
    }

    pub fn server_lines(&self) -> Vec<CartLine> {
        self.lines.lock().unwrap().clone()
    }

    pub fn limit_stock(&self, product_id: &str, stock: u32) {
        self.stock_limit
            .lock()
            .unwrap()
            .insert(ProductId::new(product_id), stock);
    }

    pub fn set_mode(&self, mode: ReplyMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn reject_with(&self, message: &str) {
        *self.reject.lock().unwrap() = Some(message.to_string());
    }

    pub fn hold_with(&self, gate: Arc<Gate>) {
        *self.hold.lock().unwrap() = Some(gate);
    }

    async fn begin_mutation(&self) -> Result<(), ApiError> {
        pass(&self.hold).await;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(offline());
        }
        if let Some(message) = self.reject.lock().unwrap().clone() {
            return Err(ApiError::Status {
                status: 400,
                message,
            });
        }
        Ok(())
    }

    fn clamp(&self, product_id: &ProductId, quantity: u32) -> Quantity {
        let limit = self
            .stock_limit
            .lock()
            .unwrap()
            .get(product_id)
            .copied()
            .unwrap_or(u32::MAX);
        Quantity::clamped(i64::from(quantity.min(limit)))
    }

    fn reply(&self, owner: &ProductId) -> CartReply {
        let lines = self.server_lines();
        match *self.mode.lock().unwrap() {
            ReplyMode::FullCart => CartReply::Cart(lines.into_iter().map(RemoteLine::from).collect()),
            ReplyMode::BareCart => CartReply::Cart(
                lines
                    .into_iter()
                    .map(|l| RemoteLine {
                        product_id: l.product_id,
                        quantity: l.quantity,
                        details: None,
                    })
                    .collect(),
            ),
            ReplyMode::Line => lines
                .into_iter()
                .find(|l| &l.product_id == owner)
                .map_or(CartReply::Acknowledged, |l| {
                    CartReply::Line(RemoteLine {
                        product_id: l.product_id,
                        quantity: l.quantity,
                        details: None,
                    })
                }),
            ReplyMode::Acknowledged => CartReply::Acknowledged,
        }
    }
}

#[async_trait]
impl CartGateway for FakeCartGateway {
    async fn fetch_cart(&self, user: &UserId) -> Result<Cart, ApiError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(offline());
        }
        Ok(Cart::new(None, user.clone(), self.server_lines(), None))
    }

    async fn add_line(
        &self,
        _user: &UserId,
        product: &ProductId,
        quantity: Quantity,
    ) -> Result<CartReply, ApiError> {
        self.begin_mutation().await?;
        let snapshot = self
            .catalog
            .get(product)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Producto no encontrado".to_string()))?;
        {
            let mut lines = self.lines.lock().unwrap();
            match lines.iter_mut().find(|l| &l.product_id == product) {
                Some(line) => {
                    line.quantity = self.clamp(product, line.quantity.get() + quantity.get());
                }
                None => {
                    let mut line = cart_line(&snapshot, 1);
                    line.quantity = self.clamp(product, quantity.get());
                    lines.push(line);
                }
            }
        }
        Ok(self.reply(product))
    }

    async fn update_quantity(
        &self,
        _user: &UserId,
        product: &ProductId,
        quantity: Quantity,
    ) -> Result<CartReply, ApiError> {
        self.begin_mutation().await?;
        let clamped = self.clamp(product, quantity.get());
        {
            let mut lines = self.lines.lock().unwrap();
            let line = lines
                .iter_mut()
                .find(|l| &l.product_id == product)
                .ok_or_else(|| ApiError::NotFound("Producto no está en el carrito".to_string()))?;
            line.quantity = clamped;
        }
        Ok(self.reply(product))
    }

    async fn remove_line(&self, _user: &UserId, product: &ProductId) -> Result<CartReply, ApiError> {
        self.begin_mutation().await?;
        self.lines
            .lock()
            .unwrap()
            .retain(|l| &l.product_id != product);
        Ok(self.reply(product))
    }

    async fn clear(&self, _user: &UserId) -> Result<(), ApiError> {
        self.begin_mutation().await?;
        self.lines.lock().unwrap().clear();
        Ok(())
    }

    async fn checkout(&self, _user: &UserId) -> Result<(), ApiError> {
        self.begin_mutation().await?;
        self.checkouts.fetch_add(1, Ordering::SeqCst);
        self.lines.lock().unwrap().clear();
        Ok(())
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Server-side order list and product catalog.
pub struct FakeOrderGateway {
    orders: Mutex<Vec<Order>>,
    catalog: HashMap<ProductId, ProductSnapshot>,
    broken_products: Mutex<HashSet<ProductId>>,
    offline: AtomicBool,
    fail_lists_after: Mutex<Option<usize>>,
    hold: Mutex<Option<Arc<Gate>>>,
    pub transitions: Mutex<Vec<(OrderId, OrderStatus)>>,
    pub invalidated: Mutex<Vec<ProductId>>,
    pub lists: AtomicUsize,
    pub product_fetches: AtomicUsize,
}

impl FakeOrderGateway {
    pub fn new(
        orders: Vec<Order>,
        catalog: impl IntoIterator<Item = ProductSnapshot>,
    ) -> Arc<Self> {
        Arc::new(Self {
            orders: Mutex::new(orders),
            catalog: catalog.into_iter().map(|p| (p.id.clone(), p)).collect(),
            broken_products: Mutex::new(HashSet::new()),
            offline: AtomicBool::new(false),
            fail_lists_after: Mutex::new(None),
            hold: Mutex::new(None),
            transitions: Mutex::new(Vec::new()),
            invalidated: Mutex::new(Vec::new()),
            lists: AtomicUsize::new(0),
            product_fetches: AtomicUsize::new(0),
        })
    }

    pub fn break_product(&self, product_id: &str) {
        self.broken_products
            .lock()
            .unwrap()
            .insert(ProductId::new(product_id));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail every list request after `count` more succeed.
    pub fn fail_lists_after(&self, count: usize) {
        *self.fail_lists_after.lock().unwrap() = Some(count);
    }

    pub fn hold_with(&self, gate: Arc<Gate>) {
        *self.hold.lock().unwrap() = Some(gate);
    }

    pub fn status_of(&self, order_id: &str) -> Option<OrderStatus> {
        self.orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id.as_str() == order_id)
            .map(|o| o.status)
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.lock().unwrap().len()
    }

    fn list(&self, user: Option<&UserId>) -> Result<Vec<Order>, ApiError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(offline());
        }
        {
            let mut remaining = self.fail_lists_after.lock().unwrap();
            if let Some(count) = remaining.as_mut() {
                if *count == 0 {
                    return Err(offline());
                }
                *count -= 1;
            }
        }
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| user.is_none_or(|u| &o.user_id == u))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrderGateway for FakeOrderGateway {
    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Order>, ApiError> {
        self.list(Some(user))
    }

    async fn list_all(&self) -> Result<Vec<Order>, ApiError> {
        self.list(None)
    }

    async fn set_status(&self, order: &OrderId, status: OrderStatus) -> Result<(), ApiError> {
        pass(&self.hold).await;
        if self.offline.load(Ordering::SeqCst) {
            return Err(offline());
        }
        let mut orders = self.orders.lock().unwrap();
        let stored = orders
            .iter_mut()
            .find(|o| &o.id == order)
            .ok_or_else(|| ApiError::NotFound("Orden no encontrada".to_string()))?;
        if stored.status.next() != Some(status) {
            return Err(ApiError::Status {
                status: 400,
                message: format!("Transición inválida: {} -> {status}", stored.status),
            });
        }
        stored.status = status;
        self.transitions
            .lock()
            .unwrap()
            .push((order.clone(), status));
        Ok(())
    }

    async fn fetch_product(&self, product: &ProductId) -> Result<ProductSnapshot, ApiError> {
        self.product_fetches.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(offline());
        }
        if self.broken_products.lock().unwrap().contains(product) {
            return Err(ApiError::Status {
                status: 500,
                message: "Error interno".to_string(),
            });
        }
        self.catalog
            .get(product)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Producto no encontrado".to_string()))
    }

    async fn invalidate_product(&self, product: &ProductId) {
        self.invalidated.lock().unwrap().push(product.clone());
    }
}

// =============================================================================
// Payments
// =============================================================================

/// Payment provider returning a fixed approval URL.
pub struct FakePaymentGateway {
    approval: Url,
    offline: AtomicBool,
    pub totals: Mutex<Vec<Money>>,
}

impl FakePaymentGateway {
    pub fn new(approval: &str) -> Arc<Self> {
        Arc::new(Self {
            approval: Url::parse(approval).unwrap(),
            offline: AtomicBool::new(false),
            totals: Mutex::new(Vec::new()),
        })
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for FakePaymentGateway {
    async fn create_order(&self, total: &Money) -> Result<Url, ApiError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(offline());
        }
        self.totals.lock().unwrap().push(*total);
        Ok(self.approval.clone())
    }
}
