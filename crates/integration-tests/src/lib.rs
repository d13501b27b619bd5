//! Integration tests for the Maya storefront client.
//!
//! [`FakeBackend`] serves the storefront REST API from memory on a random
//! local port, speaking the same JSON as the real server: `_id` document
//! keys, camelCase fields, Spanish order statuses and populated references.
//! Tests drive `maya_client` against it over real HTTP.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p maya-integration-tests
//! ```
//!
//! # Fault injection
//!
//! - [`FakeBackend::fail`] answers matching requests with an error status
//! - [`FakeBackend::set_cart_replies`] changes what cart mutations return
//! - [`FakeBackend::requests`] lists every request as `METHOD /path`

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use maya_client::config::{ClientConfig, ConfigError};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

const CREATED_AT: &str = "2024-11-20T10:00:00.000Z";
const FIRST_ORDER_ID: u128 = 0x675a_1f9c_2b3e_4d5f_6a7b_0000;

// =============================================================================
// Documents
// =============================================================================

/// Product document.
#[derive(Debug, Clone)]
pub struct ProductDoc {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub stock: i64,
}

impl ProductDoc {
    fn to_json(&self) -> Value {
        json!({
            "_id": self.id,
            "name": self.name,
            "price": self.price,
            "image_1": format!("https://img.maya.test/{}.jpg", self.id),
            "stock": self.stock,
        })
    }
}

/// Order document.
#[derive(Debug, Clone)]
pub struct OrderDoc {
    pub id: String,
    pub user_id: String,
    /// `None` once the product was deleted; served as `null`.
    pub product_id: Option<String>,
    pub quantity: u32,
    pub status: String,
}

/// What cart mutations answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CartReplyStyle {
    /// The whole cart with populated products.
    #[default]
    Populated,
    /// The cart inside an envelope, with bare product ids.
    Wrapped,
    /// A message only.
    Message,
}

#[derive(Default)]
struct Store {
    products: HashMap<String, ProductDoc>,
    users: HashMap<String, String>,
    carts: HashMap<String, Vec<(String, u32)>>,
    orders: Vec<OrderDoc>,
    next_order: u128,
    failures: Vec<(String, u16)>,
    cart_replies: CartReplyStyle,
    payments: Vec<String>,
    requests: Vec<String>,
}

type Shared = Arc<Mutex<Store>>;

fn lock(store: &Mutex<Store>) -> MutexGuard<'_, Store> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

fn next_status(status: &str) -> Option<&'static str> {
    match status {
        "pendiente" => Some("almacenado"),
        "almacenado" => Some("completado"),
        _ => None,
    }
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

// =============================================================================
// Backend
// =============================================================================

/// In-memory storefront API on a local port. Stops when dropped.
pub struct FakeBackend {
    addr: SocketAddr,
    store: Shared,
    server: JoinHandle<()>,
}

impl FakeBackend {
    /// Bind `127.0.0.1:0` and start serving.
    ///
    /// # Errors
    ///
    /// Returns the bind error.
    pub async fn start() -> std::io::Result<Self> {
        let store: Shared = Arc::new(Mutex::new(Store {
            next_order: FIRST_ORDER_ID,
            ..Store::default()
        }));

        let api = Router::new()
            .route("/cart", post(add_to_cart))
            .route("/cart/update", patch(update_cart))
            .route("/cart/remove", delete(remove_from_cart))
            .route("/cart/clear", delete(clear_cart))
            .route("/cart/checkout", post(checkout))
            .route("/cart/{user_id}", get(get_cart))
            .route("/orders", get(all_orders))
            .route("/orders/user/{user_id}", get(user_orders))
            .route("/orders/{order_id}/{status}", patch(set_order_status))
            .route("/products/{product_id}", get(get_product))
            .route("/payments/create-order", post(create_payment));

        let app = Router::new()
            .nest("/api", api)
            .layer(middleware::from_fn_with_state(store.clone(), record_and_fail))
            .with_state(store.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            store,
            server,
        })
    }

    /// API root, e.g. `http://127.0.0.1:4321/api`.
    #[must_use]
    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Client configuration pointing at this backend.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the local URL is rejected.
    pub fn config(&self) -> Result<ClientConfig, ConfigError> {
        ClientConfig::with_base_url(&self.api_url())
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    pub fn add_product(&self, id: &str, name: &str, price: f64, stock: i64) {
        lock(&self.store).products.insert(
            id.to_string(),
            ProductDoc {
                id: id.to_string(),
                name: name.to_string(),
                price,
                stock,
            },
        );
    }

    pub fn remove_product(&self, id: &str) {
        lock(&self.store).products.remove(id);
    }

    pub fn add_user(&self, id: &str, name: &str) {
        lock(&self.store)
            .users
            .insert(id.to_string(), name.to_string());
    }

    pub fn seed_cart(&self, user_id: &str, lines: &[(&str, u32)]) {
        lock(&self.store).carts.insert(
            user_id.to_string(),
            lines
                .iter()
                .map(|(product_id, quantity)| ((*product_id).to_string(), *quantity))
                .collect(),
        );
    }

    pub fn seed_order(&self, id: &str, user_id: &str, product_id: &str, quantity: u32, status: &str) {
        lock(&self.store).orders.push(OrderDoc {
            id: id.to_string(),
            user_id: user_id.to_string(),
            product_id: Some(product_id.to_string()),
            quantity,
            status: status.to_string(),
        });
    }

    /// Null out an order's product reference, as the server does after the
    /// product is deleted.
    pub fn orphan_order(&self, order_id: &str) {
        if let Some(order) = lock(&self.store)
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
        {
            order.product_id = None;
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Server cart lines as `(product id, quantity)`.
    #[must_use]
    pub fn cart_of(&self, user_id: &str) -> Vec<(String, u32)> {
        lock(&self.store)
            .carts
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn orders(&self) -> Vec<OrderDoc> {
        lock(&self.store).orders.clone()
    }

    #[must_use]
    pub fn status_of(&self, order_id: &str) -> Option<String> {
        lock(&self.store)
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .map(|o| o.status.clone())
    }

    #[must_use]
    pub fn stock_of(&self, product_id: &str) -> Option<i64> {
        lock(&self.store).products.get(product_id).map(|p| p.stock)
    }

    /// `totalAmount` of every payment order created.
    #[must_use]
    pub fn payments(&self) -> Vec<String> {
        lock(&self.store).payments.clone()
    }

    /// Every request received, as `METHOD /path`.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        lock(&self.store).requests.clone()
    }

    /// Requests starting with `prefix` (e.g. `"PATCH /api/orders"`).
    #[must_use]
    pub fn count(&self, prefix: &str) -> usize {
        lock(&self.store)
            .requests
            .iter()
            .filter(|r| r.starts_with(prefix))
            .count()
    }

    // =========================================================================
    // Faults
    // =========================================================================

    /// Answer requests starting with `prefix` with `status`.
    pub fn fail(&self, prefix: &str, status: u16) {
        lock(&self.store).failures.push((prefix.to_string(), status));
    }

    /// Stop failing requests.
    pub fn heal(&self) {
        lock(&self.store).failures.clear();
    }

    pub fn set_cart_replies(&self, style: CartReplyStyle) {
        lock(&self.store).cart_replies = style;
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// Middleware
// =============================================================================

async fn record_and_fail(State(store): State<Shared>, request: Request, next: Next) -> Response {
    let line = format!("{} {}", request.method(), request.uri().path());
    let failure = {
        let mut store = lock(&store);
        store.requests.push(line.clone());
        store
            .failures
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, status)| *status)
    };
    if let Some(status) = failure {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return message(status, "Servicio no disponible");
    }
    next.run(request).await
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineBody {
    user_id: String,
    #[serde(default)]
    product_id: Option<String>,
    #[serde(default)]
    quantity: Option<i64>,
}

fn cart_json(store: &Store, user_id: &str, populated: bool) -> Value {
    let items: Vec<Value> = store
        .carts
        .get(user_id)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .map(|(product_id, quantity)| {
            let product = match store.products.get(product_id) {
                Some(doc) if populated => doc.to_json(),
                _ => json!(product_id),
            };
            json!({ "productId": product, "quantity": quantity })
        })
        .collect();
    json!({
        "_id": format!("cart-{user_id}"),
        "userId": user_id,
        "items": items,
        "createdAt": CREATED_AT,
        "updatedAt": CREATED_AT,
    })
}

fn cart_reply(store: &Store, user_id: &str, text: &str) -> Response {
    match store.cart_replies {
        CartReplyStyle::Populated => Json(cart_json(store, user_id, true)).into_response(),
        CartReplyStyle::Wrapped => {
            Json(json!({ "message": text, "cart": cart_json(store, user_id, false) }))
                .into_response()
        }
        CartReplyStyle::Message => Json(json!({ "message": text })).into_response(),
    }
}

async fn get_cart(State(store): State<Shared>, Path(user_id): Path<String>) -> Response {
    let store = lock(&store);
    if !store.carts.contains_key(&user_id) {
        return message(StatusCode::NOT_FOUND, "Carrito no encontrado");
    }
    Json(cart_json(&store, &user_id, true)).into_response()
}

async fn add_to_cart(State(store): State<Shared>, Json(body): Json<LineBody>) -> Response {
    let mut store = lock(&store);
    let (Some(product_id), Some(quantity)) = (body.product_id, body.quantity) else {
        return message(StatusCode::BAD_REQUEST, "Datos incompletos");
    };
    let Some(stock) = store.products.get(&product_id).map(|p| p.stock) else {
        return message(StatusCode::NOT_FOUND, "Producto no encontrado");
    };
    if quantity < 1 || stock < 1 {
        return message(StatusCode::BAD_REQUEST, "Stock insuficiente");
    }
    let stock = u32::try_from(stock).unwrap_or(u32::MAX);
    let requested = u32::try_from(quantity).unwrap_or(u32::MAX);

    let lines = store.carts.entry(body.user_id.clone()).or_default();
    match lines.iter_mut().find(|(id, _)| *id == product_id) {
        Some((_, held)) => *held = held.saturating_add(requested).min(stock),
        None => lines.push((product_id, requested.min(stock))),
    }
    cart_reply(&store, &body.user_id, "Producto agregado al carrito")
}

async fn update_cart(State(store): State<Shared>, Json(body): Json<LineBody>) -> Response {
    let mut store = lock(&store);
    let (Some(product_id), Some(quantity)) = (body.product_id, body.quantity) else {
        return message(StatusCode::BAD_REQUEST, "Datos incompletos");
    };
    let stock = store
        .products
        .get(&product_id)
        .map_or(0, |p| u32::try_from(p.stock).unwrap_or(0));
    let Some(line) = store
        .carts
        .get_mut(&body.user_id)
        .and_then(|lines| lines.iter_mut().find(|(id, _)| *id == product_id))
    else {
        return message(StatusCode::NOT_FOUND, "Producto no está en el carrito");
    };
    line.1 = u32::try_from(quantity).unwrap_or(1).min(stock).max(1);
    cart_reply(&store, &body.user_id, "Cantidad actualizada")
}

async fn remove_from_cart(State(store): State<Shared>, Json(body): Json<LineBody>) -> Response {
    let mut store = lock(&store);
    let Some(product_id) = body.product_id else {
        return message(StatusCode::BAD_REQUEST, "Datos incompletos");
    };
    if let Some(lines) = store.carts.get_mut(&body.user_id) {
        lines.retain(|(id, _)| *id != product_id);
    }
    cart_reply(&store, &body.user_id, "Producto eliminado del carrito")
}

async fn clear_cart(State(store): State<Shared>, Json(body): Json<LineBody>) -> Response {
    let mut store = lock(&store);
    store.carts.insert(body.user_id, Vec::new());
    Json(json!({ "message": "Carrito vaciado" })).into_response()
}

async fn checkout(State(store): State<Shared>, Json(body): Json<LineBody>) -> Response {
    let mut store = lock(&store);
    let lines = store.carts.get(&body.user_id).cloned().unwrap_or_default();
    if lines.is_empty() {
        return message(StatusCode::BAD_REQUEST, "El carrito está vacío");
    }
    for (product_id, quantity) in lines {
        let id = format!("{:024x}", store.next_order);
        store.next_order += 1;
        if let Some(product) = store.products.get_mut(&product_id) {
            product.stock -= i64::from(quantity);
        }
        store.orders.push(OrderDoc {
            id,
            user_id: body.user_id.clone(),
            product_id: Some(product_id),
            quantity,
            status: "pendiente".to_string(),
        });
    }
    store.carts.insert(body.user_id, Vec::new());
    Json(json!({ "message": "Compra realizada" })).into_response()
}

// =============================================================================
// Orders and products
// =============================================================================

fn order_json(store: &Store, order: &OrderDoc) -> Value {
    let name = store
        .users
        .get(&order.user_id)
        .cloned()
        .unwrap_or_else(|| format!("Cliente {}", order.user_id));
    json!({
        "_id": order.id,
        "userId": {
            "_id": order.user_id,
            "name": name,
            "email": format!("{}@maya.test", order.user_id),
        },
        "productId": order.product_id,
        "quantity": order.quantity,
        "status": order.status,
        "createdAt": CREATED_AT,
        "updatedAt": CREATED_AT,
    })
}

async fn all_orders(State(store): State<Shared>) -> Json<Value> {
    let store = lock(&store);
    let orders: Vec<Value> = store.orders.iter().map(|o| order_json(&store, o)).collect();
    Json(Value::Array(orders))
}

async fn user_orders(State(store): State<Shared>, Path(user_id): Path<String>) -> Json<Value> {
    let store = lock(&store);
    let orders: Vec<Value> = store
        .orders
        .iter()
        .filter(|o| o.user_id == user_id)
        .map(|o| order_json(&store, o))
        .collect();
    Json(Value::Array(orders))
}

async fn set_order_status(
    State(store): State<Shared>,
    Path((order_id, status)): Path<(String, String)>,
) -> Response {
    let mut store = lock(&store);
    let Some(order) = store.orders.iter_mut().find(|o| o.id == order_id) else {
        return message(StatusCode::NOT_FOUND, "Orden no encontrada");
    };
    if next_status(&order.status) != Some(status.as_str()) {
        return message(StatusCode::BAD_REQUEST, "Transición de estado inválida");
    }
    order.status = status;
    let order = order.clone();
    Json(order_json(&store, &order)).into_response()
}

async fn get_product(State(store): State<Shared>, Path(product_id): Path<String>) -> Response {
    let store = lock(&store);
    match store.products.get(&product_id) {
        Some(product) => Json(product.to_json()).into_response(),
        None => message(StatusCode::NOT_FOUND, "Producto no encontrado"),
    }
}

// =============================================================================
// Payments
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentBody {
    total_amount: String,
}

async fn create_payment(State(store): State<Shared>, Json(body): Json<PaymentBody>) -> Json<Value> {
    let mut store = lock(&store);
    store.payments.push(body.total_amount);
    let token = store.payments.len();
    Json(json!({
        "id": format!("PAYPAL-{token}"),
        "approvalUrl": format!("https://www.sandbox.paypal.com/checkoutnow?token=EC-{token}"),
    }))
}
