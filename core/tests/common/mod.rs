// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::Level;
use tuckshop::api::{ApiRequest, ApiResponse, ByteStream, EventSource, HttpMethod, Transport};
use tuckshop::{ApiClient, Result, SessionClaims, ShopSettings, Storefront, TuckshopError};

// --- Tracing ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Scripted backend ---
enum Scripted {
  Reply(ApiResponse),
  Fail(String),
}

type Route = (HttpMethod, String);

/// In-memory backend. Routes answer with a queue of one-shot replies first,
/// then with their standing reply; unknown routes get a 404 envelope.
#[derive(Default)]
pub struct FakeTransport {
  once: Mutex<HashMap<Route, VecDeque<Scripted>>>,
  standing: Mutex<HashMap<Route, ApiResponse>>,
  gates: Mutex<HashMap<Route, Arc<Notify>>>,
  log: Mutex<Vec<ApiRequest>>,
}

pub fn envelope(data: Value) -> Value {
  json!({ "success": true, "message": "ok", "data": data })
}

pub fn failure(message: &str) -> Value {
  json!({ "success": false, "message": message })
}

impl FakeTransport {
  pub fn new() -> Arc<Self> {
    Arc::new(FakeTransport::default())
  }

  pub fn reply(&self, method: HttpMethod, path: &str, status: u16, body: Value) -> &Self {
    self
      .standing
      .lock()
      .insert((method, path.to_string()), ApiResponse { status, body });
    self
  }

  pub fn ok(&self, method: HttpMethod, path: &str, data: Value) -> &Self {
    self.reply(method, path, 200, envelope(data))
  }

  pub fn reply_once(&self, method: HttpMethod, path: &str, status: u16, body: Value) -> &Self {
    self
      .once
      .lock()
      .entry((method, path.to_string()))
      .or_default()
      .push_back(Scripted::Reply(ApiResponse { status, body }));
    self
  }

  pub fn ok_once(&self, method: HttpMethod, path: &str, data: Value) -> &Self {
    self.reply_once(method, path, 200, envelope(data))
  }

  /// A connection-level failure (transient).
  pub fn fail_once(&self, method: HttpMethod, path: &str, reason: &str) -> &Self {
    self
      .once
      .lock()
      .entry((method, path.to_string()))
      .or_default()
      .push_back(Scripted::Fail(reason.to_string()));
    self
  }

  /// Requests to this route wait until the returned `Notify` is signalled.
  pub fn gate(&self, method: HttpMethod, path: &str) -> Arc<Notify> {
    let notify = Arc::new(Notify::new());
    self.gates.lock().insert((method, path.to_string()), notify.clone());
    notify
  }

  pub fn requests(&self) -> Vec<ApiRequest> {
    self.log.lock().clone()
  }

  pub fn count(&self, method: HttpMethod, path: &str) -> usize {
    self
      .log
      .lock()
      .iter()
      .filter(|r| r.method == method && r.path == path)
      .count()
  }

  pub fn last(&self, method: HttpMethod, path: &str) -> Option<ApiRequest> {
    self
      .log
      .lock()
      .iter()
      .rev()
      .find(|r| r.method == method && r.path == path)
      .cloned()
  }
}

#[async_trait]
impl Transport for FakeTransport {
  async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
    let route = (request.method, request.path.clone());
    self.log.lock().push(request);

    let gate = self.gates.lock().get(&route).cloned();
    if let Some(gate) = gate {
      gate.notified().await;
    }

    let scripted = self.once.lock().get_mut(&route).and_then(VecDeque::pop_front);
    match scripted {
      Some(Scripted::Reply(response)) => Ok(response),
      Some(Scripted::Fail(reason)) => Err(TuckshopError::Unavailable(reason)),
      None => Ok(
        self
          .standing
          .lock()
          .get(&route)
          .cloned()
          .unwrap_or_else(|| ApiResponse {
            status: 404,
            body: failure(&format!("no route {} {}", route.0, route.1)),
          }),
      ),
    }
  }
}

// --- Scripted event source ---
#[derive(Default)]
pub struct FakeEventSource {
  connections: Mutex<VecDeque<Vec<Vec<u8>>>>,
  pub connects: Mutex<Vec<String>>,
}

impl FakeEventSource {
  pub fn new() -> Arc<Self> {
    Arc::new(FakeEventSource::default())
  }

  /// Queues one connection that delivers `chunks` and then closes.
  pub fn connection(&self, chunks: &[&str]) -> &Self {
    self
      .connections
      .lock()
      .push_back(chunks.iter().map(|c| c.as_bytes().to_vec()).collect());
    self
  }

  pub fn connect_count(&self) -> usize {
    self.connects.lock().len()
  }
}

#[async_trait]
impl EventSource for FakeEventSource {
  async fn connect(&self, session_token: &str) -> Result<ByteStream> {
    self.connects.lock().push(session_token.to_string());
    match self.connections.lock().pop_front() {
      Some(chunks) => Ok(stream::iter(chunks.into_iter().map(Ok)).boxed()),
      // Out of scripted connections: behave like a revoked session.
      None => Err(TuckshopError::Unauthorized("no more connections".to_string())),
    }
  }
}

// --- Fixtures ---
pub fn fast_settings() -> ShopSettings {
  ShopSettings {
    payment_poll_interval: Duration::from_millis(1),
    payment_poll_attempts: 4,
    complete_retry_base: Duration::from_millis(1),
    realtime_reconnect: Duration::from_millis(5),
    ..ShopSettings::default()
  }
}

pub fn claims(role: &str) -> SessionClaims {
  serde_json::from_value(json!({
    "sub": "7",
    "sid": "session-1",
    "role": role,
    "name": "Ada",
    "email": "ada@example.com",
    "api_token": "backend-token",
    "iat": 0,
    "exp": i64::MAX / 2
  }))
  .unwrap()
}

pub fn storefront(transport: &Arc<FakeTransport>) -> Storefront {
  let api = ApiClient::new(transport.clone());
  Storefront::for_session(&api, claims("CUSTOMER"), Arc::new(fast_settings()))
}

pub fn admin_storefront(transport: &Arc<FakeTransport>) -> Storefront {
  let api = ApiClient::new(transport.clone());
  Storefront::for_session(&api, claims("ADMIN"), Arc::new(fast_settings()))
}

pub fn product_json(id: i64, price: f64, stock: u32) -> Value {
  json!({
    "id": id,
    "name": format!("Product {}", id),
    "description": "Tasty",
    "price": price,
    "stock": stock,
    "categoryId": 1
  })
}

/// `(product_id, price, quantity, stock)` lines with backend-computed totals.
pub fn cart_json(lines: &[(i64, f64, u32, u32)]) -> Value {
  let items: Vec<Value> = lines
    .iter()
    .map(|(id, price, quantity, stock)| {
      json!({
        "productId": id,
        "name": format!("Product {}", id),
        "price": price,
        "quantity": quantity,
        "subtotal": price * f64::from(*quantity),
        "stock": stock
      })
    })
    .collect();
  let total_items: u32 = lines.iter().map(|l| l.2).sum();
  let total_amount: f64 = lines.iter().map(|l| l.1 * f64::from(l.2)).sum();
  json!({ "items": items, "totalItems": total_items, "totalAmount": total_amount })
}

pub fn order_json(id: i64, status: &str, method: &str) -> Value {
  json!({
    "id": id,
    "orderNumber": format!("ORD-{:04}", id),
    "userId": 7,
    "status": status,
    "paymentMethod": method,
    "totalAmount": 7.5,
    "items": [{ "productId": 1, "name": "Product 1", "price": 2.5, "quantity": 3, "subtotal": 7.5 }],
    "createdAt": "2026-01-05T09:30:00Z"
  })
}

pub fn user_json(role: &str) -> Value {
  json!({ "id": 7, "name": "Ada", "email": "ada@example.com", "role": role })
}
