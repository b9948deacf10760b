// tests/checkout_tests.rs
mod common;

use chrono::{Duration, Utc};
use common::*;
use serde_json::json;
use tuckshop::api::HttpMethod::{Get, Patch, Post};
use tuckshop::models::{Cart, Order, OrderStatus, PaymentMethod};
use tuckshop::{QueryKey, ToastLevel, TuckshopError};

fn with_cart(backend: &FakeTransport) {
  backend.ok(Get, "/cart", cart_json(&[(1, 2.5, 3, 10)]));
}

#[tokio::test]
async fn cash_checkout_prepares_qr_and_settles_cart() {
  setup_tracing();
  let backend = FakeTransport::new();
  with_cart(&backend);
  backend
    .ok(Post, "/orders/checkout", order_json(1, "PENDING", "CASH"))
    .ok(Get, "/orders/1/qr", json!({ "qrCode": "{\"orderId\":1}", "isUsed": false }));
  let shop = storefront(&backend);
  shop.cart().get().await.unwrap();
  let mut toasts = shop.notifier().subscribe();

  let before = Utc::now();
  let receipt = shop.orders().checkout(PaymentMethod::Cash).await.unwrap();

  assert_eq!(receipt.order.status, OrderStatus::Pending);
  assert!(receipt.payment_url.is_none());
  let expires_at = receipt.qr.unwrap().expires_at.unwrap();
  assert!(expires_at >= before + Duration::minutes(15));
  assert!(expires_at <= Utc::now() + Duration::minutes(15));

  assert_eq!(
    backend.last(Post, "/orders/checkout").unwrap().body,
    Some(json!({ "paymentMethod": "CASH" }))
  );
  assert_eq!(backend.count(Post, "/orders/1/paynow"), 0);
  assert!(shop.cache().get::<Cart>(&QueryKey::cart()).unwrap().is_empty());
  assert!(shop.cache().is_stale(&QueryKey::cart()));

  let toast = toasts.try_recv().unwrap();
  assert_eq!(toast.level, ToastLevel::Success);
  assert!(toast.message.contains("ORD-0001"));
}

#[tokio::test]
async fn paynow_checkout_skips_qr_and_returns_payment_url() {
  setup_tracing();
  let backend = FakeTransport::new();
  with_cart(&backend);
  backend
    .ok(Post, "/orders/checkout", order_json(2, "PENDING", "PAYNOW"))
    .ok(Post, "/orders/2/paynow", json!({ "url": "https://pay.example/session/abc" }));
  let shop = storefront(&backend);

  let receipt = shop.orders().checkout(PaymentMethod::Paynow).await.unwrap();
  assert_eq!(receipt.payment_url.as_deref(), Some("https://pay.example/session/abc"));
  assert!(receipt.qr.is_none());
  assert_eq!(backend.count(Get, "/orders/2/qr"), 0);
}

#[tokio::test]
async fn placed_order_survives_a_failed_qr_fetch() {
  setup_tracing();
  let backend = FakeTransport::new();
  with_cart(&backend);
  backend
    .ok(Post, "/orders/checkout", order_json(3, "PENDING", "CASH"))
    .reply(Get, "/orders/3/qr", 503, failure("qr service down"));
  let shop = storefront(&backend);
  shop.cart().get().await.unwrap();
  let mut toasts = shop.notifier().subscribe();

  let receipt = shop.orders().checkout(PaymentMethod::Cash).await.unwrap();

  assert_eq!(receipt.order.id, 3);
  assert!(receipt.qr.is_none());
  assert!(receipt.payment_error.is_some());
  assert_eq!(backend.count(Post, "/orders/checkout"), 1);
  assert!(shop.cache().get::<Cart>(&QueryKey::cart()).unwrap().is_empty());
  assert_eq!(
    shop.cache().get::<Order>(&QueryKey::order(3)).unwrap().status,
    OrderStatus::Pending
  );

  let toast = toasts.try_recv().unwrap();
  assert_eq!(toast.level, ToastLevel::Error);
  assert!(toast.message.contains("ORD-0003"));
}

#[tokio::test]
async fn paynow_session_can_be_resumed_after_checkout() {
  setup_tracing();
  let backend = FakeTransport::new();
  with_cart(&backend);
  backend
    .ok(Post, "/orders/checkout", order_json(4, "PENDING", "PAYNOW"))
    .fail_once(Post, "/orders/4/paynow", "connection reset")
    .ok(Post, "/orders/4/paynow", json!({ "url": "https://pay.example/session/retry" }));
  let shop = storefront(&backend);

  let receipt = shop.orders().checkout(PaymentMethod::Paynow).await.unwrap();
  assert!(receipt.payment_url.is_none());
  assert!(receipt.payment_error.is_some());
  assert!(shop.cache().get::<Cart>(&QueryKey::cart()).unwrap().is_empty());

  let url = shop.orders().resume_paynow(4).await.unwrap();
  assert_eq!(url, "https://pay.example/session/retry");
  assert_eq!(
    shop.cache().get::<Order>(&QueryKey::order(4)).unwrap().payment_url.as_deref(),
    Some("https://pay.example/session/retry")
  );
  assert_eq!(backend.count(Get, "/orders/4"), 0);
}

#[tokio::test]
async fn checkout_checks_stockless_lines_against_the_catalog() {
  setup_tracing();
  let backend = FakeTransport::new();
  let mut cart = cart_json(&[(1, 2.5, 3, 0)]);
  cart["items"][0].as_object_mut().unwrap().remove("stock");
  backend
    .ok(Get, "/cart", cart)
    .ok(Get, "/products/1", product_json(1, 2.5, 5))
    .ok(Post, "/orders/checkout", order_json(6, "PENDING", "CASH"))
    .ok(Get, "/orders/6/qr", json!({ "qrCode": "{\"orderId\":6}", "isUsed": false }));
  let shop = storefront(&backend);

  let receipt = shop.orders().checkout(PaymentMethod::Cash).await.unwrap();
  assert_eq!(receipt.order.id, 6);
  assert_eq!(backend.count(Get, "/products/1"), 1);
}

#[tokio::test]
async fn empty_cart_never_reaches_backend_checkout() {
  setup_tracing();
  let backend = FakeTransport::new();
  backend.ok(Get, "/cart", cart_json(&[]));
  let shop = storefront(&backend);
  let mut toasts = shop.notifier().subscribe();

  let err = shop.orders().checkout(PaymentMethod::Cash).await.unwrap_err();
  assert!(matches!(err, TuckshopError::Validation(ref f) if f.contains_key("cart")));
  assert_eq!(backend.count(Post, "/orders/checkout"), 0);
  assert_eq!(toasts.try_recv().unwrap().level, ToastLevel::Error);
}

#[tokio::test]
async fn embedded_expired_qr_is_regenerated_during_checkout() {
  setup_tracing();
  let backend = FakeTransport::new();
  with_cart(&backend);
  let mut order = order_json(3, "PENDING", "CASH");
  order["paymentQR"] = json!({ "qrCode": "old", "expiresAt": (Utc::now() - Duration::minutes(1)).to_rfc3339() });
  let fresh_until = Utc::now() + Duration::minutes(10);
  backend
    .ok(Post, "/orders/checkout", order)
    .ok(Post, "/orders/3/qr/regenerate", json!({ "qrCode": "new", "expiresAt": fresh_until.to_rfc3339() }));
  let shop = storefront(&backend);

  let receipt = shop.orders().checkout(PaymentMethod::Cash).await.unwrap();
  assert_eq!(receipt.qr.unwrap().qr_code, "new");
  assert_eq!(backend.count(Get, "/orders/3/qr"), 0);
}

#[tokio::test]
async fn expired_cash_qr_regenerates_transparently() {
  setup_tracing();
  let backend = FakeTransport::new();
  backend
    .ok(Get, "/orders/5", order_json(5, "PENDING", "CASH"))
    .ok(
      Get,
      "/orders/5/qr",
      json!({ "qrCode": "stale", "expiresAt": (Utc::now() - Duration::seconds(5)).to_rfc3339() }),
    )
    .ok(
      Post,
      "/orders/5/qr/regenerate",
      json!({ "qrCode": "fresh", "expiresAt": (Utc::now() + Duration::minutes(15)).to_rfc3339() }),
    );
  let shop = storefront(&backend);

  let qr = shop.orders().order_qr(5).await.unwrap();
  assert_eq!(qr.qr_code, "fresh");
  assert_eq!(backend.count(Post, "/orders/5/qr/regenerate"), 1);

  // Still valid: served from cache.
  shop.orders().order_qr(5).await.unwrap();
  assert_eq!(backend.count(Get, "/orders/5/qr"), 1);
}

#[tokio::test]
async fn only_pending_cash_orders_regenerate() {
  setup_tracing();
  let backend = FakeTransport::new();
  backend.ok(Get, "/orders/6", order_json(6, "PAID", "PAYNOW"));
  let shop = storefront(&backend);

  assert!(matches!(shop.orders().regenerate_qr(6).await, Err(TuckshopError::Validation(_))));
  assert_eq!(backend.count(Post, "/orders/6/qr/regenerate"), 0);
}

#[tokio::test]
async fn await_payment_returns_once_paid() {
  setup_tracing();
  let backend = FakeTransport::new();
  let status = |s: &str| json!({ "orderId": 8, "status": s, "paymentMethod": "PAYNOW" });
  backend
    .ok_once(Get, "/orders/8/payment-status", status("PENDING"))
    .fail_once(Get, "/orders/8/payment-status", "connection reset")
    .ok(Get, "/orders/8/payment-status", status("PAID"))
    .ok(Get, "/orders/8", order_json(8, "PAID", "PAYNOW"));
  let shop = storefront(&backend);

  let order = shop.orders().await_payment(8).await.unwrap();
  assert_eq!(order.status, OrderStatus::Paid);
  assert_eq!(backend.count(Get, "/orders/8/payment-status"), 3);
}

#[tokio::test]
async fn await_payment_fails_on_cancel_and_timeout() {
  setup_tracing();
  let backend = FakeTransport::new();
  backend
    .ok(Get, "/orders/9/payment-status", json!({ "orderId": 9, "status": "CANCELLED", "paymentMethod": "PAYNOW" }))
    .ok(Get, "/orders/10/payment-status", json!({ "orderId": 10, "status": "PENDING", "paymentMethod": "PAYNOW" }));
  let shop = storefront(&backend);

  assert!(matches!(
    shop.orders().await_payment(9).await,
    Err(TuckshopError::OrderCancelled { order_id: 9 })
  ));
  assert!(matches!(
    shop.orders().await_payment(10).await,
    Err(TuckshopError::PaymentTimeout { order_id: 10, attempts: 4 })
  ));
  assert_eq!(backend.count(Get, "/orders/10/payment-status"), 4);
}

#[tokio::test]
async fn cancel_checks_transition_before_dispatch() {
  setup_tracing();
  let backend = FakeTransport::new();
  backend
    .ok(Get, "/orders/11", order_json(11, "COMPLETED", "CASH"))
    .ok(Get, "/orders/12", order_json(12, "PENDING", "CASH"))
    .ok(Patch, "/orders/12/cancel", order_json(12, "CANCELLED", "CASH"));
  let shop = storefront(&backend);

  assert!(matches!(
    shop.orders().cancel_order(11).await,
    Err(TuckshopError::InvalidTransition {
      from: OrderStatus::Completed,
      to: OrderStatus::Cancelled,
      ..
    })
  ));
  assert_eq!(backend.count(Patch, "/orders/11/cancel"), 0);

  let cancelled = shop.orders().cancel_order(12).await.unwrap();
  assert_eq!(cancelled.status, OrderStatus::Cancelled);
  assert_eq!(shop.orders().get(12).await.unwrap().status, OrderStatus::Cancelled);
}
