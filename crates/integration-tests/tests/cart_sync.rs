//! Cart synchronization against the fake API.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use maya_client::StoreError;
use maya_client::api::ApiClient;
use maya_client::cart::{CartEngine, CartNotice};
use maya_client::gateway::OrderGateway;
use maya_client::session::{MemoryIdentity, Session};
use maya_core::{ProductId, UserId};
use maya_integration_tests::{CartReplyStyle, FakeBackend};

async fn setup() -> (FakeBackend, ApiClient, CartEngine) {
    let backend = FakeBackend::start().await.unwrap();
    backend.add_product("p1", "Huipil bordado", 25.0, 3);
    backend.add_product("p2", "Rebozo de seda", 12.5, 10);
    let api = ApiClient::new(backend.config().unwrap()).unwrap();
    let engine = CartEngine::new(Arc::new(api.clone()), Session::fixed(UserId::new("u1")));
    (backend, api, engine)
}

#[tokio::test]
async fn test_missing_cart_loads_empty_then_fills() {
    let (backend, api, engine) = setup().await;

    let cart = engine.load().await.unwrap();
    assert!(cart.is_empty());

    let huipil = api.fetch_product(&ProductId::new("p1")).await.unwrap();
    let line = engine.add(&huipil, 2).await.unwrap();
    assert_eq!(line.quantity.get(), 2);
    assert_eq!(line.snapshot.name, "Huipil bordado");

    assert_eq!(backend.cart_of("u1"), vec![("p1".to_string(), 2)]);
    assert_eq!(engine.total().to_fixed(), "50.00");
    assert_eq!(engine.item_count(), 2);
}

#[tokio::test]
async fn test_message_replies_are_resolved() {
    let (backend, api, engine) = setup().await;
    backend.set_cart_replies(CartReplyStyle::Message);
    engine.load().await.unwrap();

    let rebozo = api.fetch_product(&ProductId::new("p2")).await.unwrap();
    engine.add(&rebozo, 1).await.unwrap();
    engine.add(&rebozo, 2).await.unwrap();

    let line = engine.line(&rebozo.id).unwrap();
    assert_eq!(line.quantity.get(), 3);
    assert_eq!(line.snapshot.name, "Rebozo de seda");
    assert_eq!(backend.cart_of("u1"), vec![("p2".to_string(), 3)]);
}

#[tokio::test]
async fn test_wrapped_replies_keep_local_details() {
    let (backend, api, engine) = setup().await;
    backend.set_cart_replies(CartReplyStyle::Wrapped);
    engine.load().await.unwrap();

    let huipil = api.fetch_product(&ProductId::new("p1")).await.unwrap();
    engine.add(&huipil, 1).await.unwrap();

    let line = engine.line(&huipil.id).unwrap();
    assert_eq!(line.snapshot.name, "Huipil bordado");
    assert_eq!(line.unit_price.to_fixed(), "25.00");
}

#[tokio::test]
async fn test_server_clamp_becomes_a_notice() {
    let (backend, _api, engine) = setup().await;
    backend.seed_cart("u1", &[("p1", 2)]);
    engine.load().await.unwrap();
    assert_eq!(engine.total().to_fixed(), "50.00");

    // Stock dropped after the cart was loaded
    backend.add_product("p1", "Huipil bordado", 25.0, 1);
    let change = engine.change_quantity(&ProductId::new("p1"), 4).await.unwrap();

    assert_eq!(change.confirmed.unwrap().get(), 1);
    assert!(matches!(
        change.notice,
        Some(CartNotice::QuantityAdjusted { .. })
    ));
    assert_eq!(engine.total().to_fixed(), "25.00");
    assert_eq!(backend.cart_of("u1"), vec![("p1".to_string(), 1)]);
}

#[tokio::test]
async fn test_failed_remove_restores_line() {
    let (backend, _api, engine) = setup().await;
    backend.seed_cart("u1", &[("p1", 1), ("p2", 2)]);
    engine.load().await.unwrap();

    backend.fail("DELETE /api/cart/remove", 503);
    let err = engine.remove(&ProductId::new("p1")).await.unwrap_err();
    assert!(err.is_retryable());

    let ids: Vec<String> = engine
        .lines()
        .iter()
        .map(|l| l.product_id.to_string())
        .collect();
    assert_eq!(ids, ["p1", "p2"]);

    backend.heal();
    engine.remove(&ProductId::new("p1")).await.unwrap();
    assert_eq!(backend.cart_of("u1"), vec![("p2".to_string(), 2)]);
    assert_eq!(engine.lines().len(), 1);
}

#[tokio::test]
async fn test_rejected_add_is_not_retryable() {
    let (backend, api, engine) = setup().await;
    engine.load().await.unwrap();
    let huipil = api.fetch_product(&ProductId::new("p1")).await.unwrap();

    backend.fail("POST /api/cart", 400);
    let err = engine.add(&huipil, 1).await.unwrap_err();
    assert!(matches!(err, StoreError::Rejected { status: Some(400), .. }));
    assert!(engine.lines().is_empty());
}

#[tokio::test]
async fn test_concurrent_adds_of_different_products() {
    let (backend, api, engine) = setup().await;
    engine.load().await.unwrap();
    let huipil = api.fetch_product(&ProductId::new("p1")).await.unwrap();
    let rebozo = api.fetch_product(&ProductId::new("p2")).await.unwrap();

    let (a, b) = tokio::join!(engine.add(&huipil, 1), engine.add(&rebozo, 4));
    a.unwrap();
    b.unwrap();

    assert_eq!(engine.lines().len(), 2);
    assert_eq!(engine.item_count(), 5);
    let mut server = backend.cart_of("u1");
    server.sort();
    assert_eq!(
        server,
        vec![("p1".to_string(), 1), ("p2".to_string(), 4)]
    );
}

#[tokio::test]
async fn test_clear_empties_both_sides() {
    let (backend, _api, engine) = setup().await;
    backend.seed_cart("u1", &[("p1", 1), ("p2", 1)]);
    engine.load().await.unwrap();

    engine.clear().await.unwrap();
    assert!(engine.lines().is_empty());
    assert!(backend.cart_of("u1").is_empty());
}

#[tokio::test]
async fn test_signed_out_user_sends_nothing() {
    let backend = FakeBackend::start().await.unwrap();
    let api = ApiClient::new(backend.config().unwrap()).unwrap();
    let identity = MemoryIdentity::new();
    let engine = CartEngine::new(Arc::new(api), Session::new(identity.clone()));

    let err = engine.load().await.unwrap_err();
    assert!(err.requires_sign_in());
    assert!(backend.requests().is_empty());

    identity.sign_in(UserId::new("u9"));
    assert!(engine.load().await.unwrap().is_empty());
    assert_eq!(backend.requests(), ["GET /api/cart/u9"]);
}
