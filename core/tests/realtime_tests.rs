// tests/realtime_tests.rs
mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use tuckshop::api::HttpMethod::Get;
use tuckshop::models::{OrderStatus, Product, StockLevel};
use tuckshop::realtime::handle_event;
use tuckshop::{PushEvent, QueryKey, RealtimeListener, ToastLevel, View};

#[tokio::test]
async fn stock_update_patches_and_invalidates_products() {
  setup_tracing();
  let backend = FakeTransport::new();
  backend.ok(Get, "/products/3", product_json(3, 1.0, 40));
  let shop = storefront(&backend);
  shop.catalog().product(3).await.unwrap();

  handle_event(&shop, &PushEvent::StockUpdate { product_id: 3, stock: 4 });

  let cached = shop.cache().get::<Product>(&QueryKey::product(3)).unwrap();
  assert_eq!(cached.stock, 4);
  assert_eq!(cached.stock_level, StockLevel::Low);
  assert!(shop.cache().is_stale(&QueryKey::product(3)));
}

#[tokio::test]
async fn stock_update_during_a_fetch_outlives_the_late_response() {
  setup_tracing();
  let backend = FakeTransport::new();
  backend.ok(Get, "/products/3", product_json(3, 1.0, 10));
  let shop = storefront(&backend);
  shop.catalog().product(3).await.unwrap();
  shop.cache().invalidate(&QueryKey::products());
  let gate = backend.gate(Get, "/products/3");

  let catalog = shop.catalog();
  let (fetched, _) = tokio::join!(catalog.product(3), async {
    while backend.count(Get, "/products/3") < 2 {
      tokio::task::yield_now().await;
    }
    handle_event(&shop, &PushEvent::StockUpdate { product_id: 3, stock: 2 });
    gate.notify_one();
  });

  // The caller still gets its answer, but the cache keeps the pushed level.
  assert_eq!(fetched.unwrap().stock, 10);
  let cached = shop.cache().get::<Product>(&QueryKey::product(3)).unwrap();
  assert_eq!(cached.stock, 2);
  assert!(shop.cache().is_stale(&QueryKey::product(3)));
}

#[tokio::test]
async fn order_update_invalidates_only_on_order_views() {
  setup_tracing();
  let backend = FakeTransport::new();
  backend.ok(Get, "/orders", serde_json::json!([order_json(1, "PENDING", "CASH")]));
  let shop = storefront(&backend);
  shop.orders().list().await.unwrap();
  let mut toasts = shop.notifier().subscribe();

  let event = PushEvent::OrderUpdate {
    order_id: 1,
    status: OrderStatus::Paid,
    order_number: Some("ORD-0001".into()),
  };

  shop.set_view(View::Catalog);
  handle_event(&shop, &event);
  assert!(!shop.cache().is_stale(&QueryKey::orders()));
  let toast = toasts.try_recv().unwrap();
  assert_eq!(toast.level, ToastLevel::Info);
  assert_eq!(toast.message, "Order ORD-0001 is now PAID.");

  shop.set_view(View::Orders);
  handle_event(&shop, &event);
  assert!(shop.cache().is_stale(&QueryKey::orders()));
  assert!(toasts.try_recv().is_ok());
}

#[tokio::test]
async fn listener_applies_events_and_reconnects() {
  setup_tracing();
  let backend = FakeTransport::new();
  backend.ok(Get, "/products/3", product_json(3, 1.0, 40));
  let shop = Arc::new(storefront(&backend));
  shop.catalog().product(3).await.unwrap();

  let source = FakeEventSource::new();
  source
    .connection(&[": hello\n\n", "data: {\"type\":\"ping\"}\n\n", "data: {\"type\":\"stock_"])
    .connection(&["data: garbage\n\n", "data: {\"type\":\"stock_update\",\"productId\":3,\"stock\":0}\n\n"]);

  let listener = RealtimeListener::new(&shop, source.clone(), "signed-token");
  tokio::time::timeout(Duration::from_secs(5), listener.run())
    .await
    .expect("listener should stop once the session is rejected");

  // Two scripted connections, then a rejected third attempt.
  assert_eq!(source.connect_count(), 3);
  assert!(source.connects.lock().iter().all(|t| t == "signed-token"));
  let cached = shop.cache().get::<Product>(&QueryKey::product(3)).unwrap();
  assert_eq!(cached.stock, 0);
  assert_eq!(cached.stock_level, StockLevel::Low);
}

#[tokio::test]
async fn reconnect_uses_the_latest_session_token() {
  setup_tracing();
  let backend = FakeTransport::new();
  let shop = Arc::new(storefront(&backend));
  let source = FakeEventSource::new();
  source.connection(&["data: {\"type\":\"ping\"}\n\n"]);
  let token = Arc::new(parking_lot::RwLock::new("first-token".to_string()));

  let listener = RealtimeListener::with_shared_token(&shop, source.clone(), token.clone());
  let resign = async {
    while source.connect_count() < 1 {
      tokio::task::yield_now().await;
    }
    *token.write() = "resigned-token".to_string();
  };
  tokio::time::timeout(Duration::from_secs(5), async { tokio::join!(listener.run(), resign) })
    .await
    .expect("listener should stop once the session is rejected");

  assert_eq!(
    *source.connects.lock(),
    vec!["first-token".to_string(), "resigned-token".to_string()]
  );
}

#[tokio::test]
async fn listener_ends_with_its_session() {
  setup_tracing();
  let backend = FakeTransport::new();
  let shop = Arc::new(storefront(&backend));
  let source = FakeEventSource::new();
  source.connection(&["data: {\"type\":\"ping\"}\n\n"]);

  let listener = RealtimeListener::new(&shop, source.clone(), "t");
  drop(shop);
  tokio::time::timeout(Duration::from_secs(5), listener.spawn())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(source.connect_count(), 0);
}
