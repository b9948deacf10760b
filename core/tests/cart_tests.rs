// tests/cart_tests.rs
mod common;

use common::*;
use serde_json::json;
use tuckshop::api::HttpMethod::{Delete, Get, Post, Put};
use tuckshop::models::Cart;
use tuckshop::{QueryKey, ToastLevel, TuckshopError};

#[tokio::test]
async fn add_item_reconciles_with_server_cart() {
  setup_tracing();
  let backend = FakeTransport::new();
  backend
    .ok(Get, "/cart", cart_json(&[]))
    .ok(Get, "/products/1", product_json(1, 2.5, 10))
    .ok(Post, "/cart/add", cart_json(&[(1, 2.5, 2, 10)]));
  let shop = storefront(&backend);

  let cart = shop.cart().add_item(1, 2).await.unwrap();
  assert_eq!(cart.total_items, 2);
  assert_eq!(cart.total_amount, 5.0);
  assert_eq!(shop.cache().get::<Cart>(&QueryKey::cart()), Some(cart));

  let sent = backend.last(Post, "/cart/add").unwrap();
  assert_eq!(sent.body, Some(json!({ "productId": 1, "quantity": 2 })));
  assert_eq!(sent.bearer.as_deref(), Some("backend-token"));
}

#[tokio::test]
async fn optimistic_cart_is_visible_while_request_is_in_flight() {
  setup_tracing();
  let backend = FakeTransport::new();
  backend
    .ok(Get, "/cart", cart_json(&[(1, 2.0, 1, 10)]))
    .ok(Post, "/cart/add", cart_json(&[(1, 2.0, 3, 10)]));
  let gate = backend.gate(Post, "/cart/add");
  let shop = storefront(&backend);
  shop.cart().get().await.unwrap();

  let cart = shop.cart();
  let (result, ()) = tokio::join!(cart.add_item(1, 2), async {
    tokio::task::yield_now().await;
    let optimistic = shop.cache().get::<Cart>(&QueryKey::cart()).unwrap();
    assert_eq!(optimistic.quantity_of(1), 3);
    assert_eq!(optimistic.total_amount, 6.0);
    gate.notify_one();
  });
  assert_eq!(result.unwrap().quantity_of(1), 3);
}

#[tokio::test]
async fn failed_mutation_restores_cart_and_toasts() {
  setup_tracing();
  let backend = FakeTransport::new();
  backend
    .ok(Get, "/cart", cart_json(&[(1, 2.0, 1, 10)]))
    .reply(Put, "/cart/update", 500, failure("database down"));
  let shop = storefront(&backend);
  let before = shop.cart().get().await.unwrap();
  let mut toasts = shop.notifier().subscribe();

  let err = shop.cart().update_item(1, 4).await.unwrap_err();
  assert!(matches!(err, TuckshopError::Api { status: 500, .. }));
  assert_eq!(shop.cache().get::<Cart>(&QueryKey::cart()), Some(before));

  let toast = toasts.try_recv().unwrap();
  assert_eq!(toast.level, ToastLevel::Error);
  assert_eq!(toast.message, "database down");
}

#[tokio::test]
async fn stock_is_checked_before_dispatch() {
  setup_tracing();
  let backend = FakeTransport::new();
  backend.ok(Get, "/cart", cart_json(&[(1, 2.0, 3, 4)]));
  let shop = storefront(&backend);

  let err = shop.cart().add_item(1, 2).await.unwrap_err();
  assert!(matches!(
    err,
    TuckshopError::InsufficientStock {
      product_id: 1,
      requested: 5,
      available: 4
    }
  ));
  let err = shop.cart().update_item(1, 5).await.unwrap_err();
  assert!(matches!(err, TuckshopError::InsufficientStock { .. }));

  assert_eq!(backend.count(Post, "/cart/add"), 0);
  assert_eq!(backend.count(Put, "/cart/update"), 0);
}

#[tokio::test]
async fn stock_for_new_line_comes_from_product() {
  setup_tracing();
  let backend = FakeTransport::new();
  backend
    .ok(Get, "/cart", cart_json(&[]))
    .ok(Get, "/products/9", product_json(9, 1.0, 1));
  let shop = storefront(&backend);

  assert!(matches!(
    shop.cart().add_item(9, 2).await,
    Err(TuckshopError::InsufficientStock { available: 1, .. })
  ));
  assert_eq!(backend.count(Post, "/cart/add"), 0);
}

/// A cart whose lines carry no `stock` field.
fn cart_without_stock(quantity: u32) -> serde_json::Value {
  let mut cart = cart_json(&[(1, 2.5, quantity, 0)]);
  cart["items"][0].as_object_mut().unwrap().remove("stock");
  cart
}

#[tokio::test]
async fn unknown_line_stock_falls_back_to_product() {
  setup_tracing();
  let backend = FakeTransport::new();
  backend
    .ok(Get, "/cart", cart_without_stock(2))
    .ok(Get, "/products/1", product_json(1, 2.5, 10))
    .ok(Post, "/cart/add", cart_without_stock(3))
    .ok(Put, "/cart/update", cart_without_stock(11));
  let shop = storefront(&backend);

  let cart = shop.cart().add_item(1, 1).await.unwrap();
  assert_eq!(cart.quantity_of(1), 3);
  assert_eq!(backend.count(Post, "/cart/add"), 1);

  assert!(matches!(
    shop.cart().update_item(1, 11).await,
    Err(TuckshopError::InsufficientStock { available: 10, .. })
  ));
  assert_eq!(backend.count(Put, "/cart/update"), 0);
}

#[tokio::test]
async fn zero_quantity_add_is_a_validation_error() {
  setup_tracing();
  let backend = FakeTransport::new();
  let shop = storefront(&backend);
  assert!(matches!(shop.cart().add_item(1, 0).await, Err(TuckshopError::Validation(_))));
  assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn update_to_zero_removes_line() {
  setup_tracing();
  let backend = FakeTransport::new();
  backend
    .ok(Get, "/cart", cart_json(&[(1, 2.0, 1, 10), (2, 1.0, 1, 10)]))
    .ok(Delete, "/cart/remove/1", cart_json(&[(2, 1.0, 1, 10)]));
  let shop = storefront(&backend);
  shop.cart().get().await.unwrap();

  let cart = shop.cart().update_item(1, 0).await.unwrap();
  assert_eq!(cart.items.len(), 1);
  assert_eq!(backend.count(Put, "/cart/update"), 0);
  assert_eq!(backend.count(Delete, "/cart/remove/1"), 1);
}

#[tokio::test]
async fn mutation_discards_stale_refetch() {
  setup_tracing();
  let backend = FakeTransport::new();
  backend
    .ok(Get, "/cart", cart_json(&[(1, 2.0, 1, 10)]))
    .ok(Delete, "/cart/clear", cart_json(&[]));
  let shop = storefront(&backend);
  shop.cart().get().await.unwrap();
  shop.cache().invalidate(&QueryKey::cart());

  let gate = backend.gate(Get, "/cart");
  let cart = shop.cart();
  let (refetched, cleared) = tokio::join!(cart.get(), async {
    tokio::task::yield_now().await;
    let cleared = shop.cart().clear().await;
    gate.notify_one();
    cleared
  });
  assert!(cleared.unwrap().is_empty());
  // The refetch answered with the pre-clear cart; it must not land in the cache.
  assert_eq!(refetched.unwrap().quantity_of(1), 1);
  assert!(shop.cache().get::<Cart>(&QueryKey::cart()).unwrap().is_empty());
}
