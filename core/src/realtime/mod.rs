// core/src/realtime/mod.rs

//! Server-push listener: one long-lived event stream per signed-in session,
//! turning backend events into cache invalidations and toasts.

mod sse;

pub use sse::{SseDecoder, SseFrame};

use crate::api::{ByteStream, EventSource};
use crate::cache::QueryKey;
use crate::error::Result;
use crate::models::OrderStatus;
use crate::shop::Storefront;
use futures_util::StreamExt;
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum PushEvent {
  StockUpdate {
    product_id: i64,
    stock: u32,
  },
  OrderUpdate {
    order_id: i64,
    status: OrderStatus,
    #[serde(default)]
    order_number: Option<String>,
  },
  Ping,
  #[serde(other)]
  Unknown,
}

impl PushEvent {
  pub fn parse(data: &str) -> Result<Self> {
    Ok(serde_json::from_str(data)?)
  }
}

/// Applies one pushed event to a session's storefront.
pub fn handle_event(shop: &Storefront, event: &PushEvent) {
  match event {
    PushEvent::StockUpdate { product_id, stock } => {
      debug!(product_id, stock, "Stock update received.");
      shop.catalog().apply_stock_update(*product_id, *stock);
    }
    PushEvent::OrderUpdate {
      order_id,
      status,
      order_number,
    } => {
      let number = order_number.clone().unwrap_or_else(|| format!("#{}", order_id));
      shop.notifier().info(format!("Order {} is now {}.", number, status));
      if shop.view().is_order_related() {
        let cache = shop.cache();
        cache.invalidate(&QueryKey::orders());
        cache.invalidate(&QueryKey::admin_orders());
      }
    }
    PushEvent::Ping | PushEvent::Unknown => {}
  }
}

/// Why a stream consumer returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
  /// The connection closed or failed; reconnect.
  Disconnected,
  /// The storefront is gone; stop listening.
  SessionClosed,
}

pub struct RealtimeListener {
  shop: Weak<Storefront>,
  source: Arc<dyn EventSource>,
  token: Arc<RwLock<String>>,
}

impl RealtimeListener {
  /// Holds the storefront weakly: dropping the session ends the listener.
  pub fn new(shop: &Arc<Storefront>, source: Arc<dyn EventSource>, token: impl Into<String>) -> Self {
    Self::with_shared_token(shop, source, Arc::new(RwLock::new(token.into())))
  }

  /// Like `new`, but every (re)connect reads the current value of `token`,
  /// so a session token re-signed while listening is picked up.
  pub fn with_shared_token(shop: &Arc<Storefront>, source: Arc<dyn EventSource>, token: Arc<RwLock<String>>) -> Self {
    RealtimeListener {
      shop: Arc::downgrade(shop),
      source,
      token,
    }
  }

  /// Drains one connection, dispatching every complete event.
  pub async fn consume(&self, mut stream: ByteStream) -> StreamEnd {
    let mut decoder = SseDecoder::new();
    while let Some(chunk) = stream.next().await {
      let bytes = match chunk {
        Ok(bytes) => bytes,
        Err(err) => {
          warn!(error = %err, "Event stream failed.");
          return StreamEnd::Disconnected;
        }
      };
      let Some(shop) = self.shop.upgrade() else {
        return StreamEnd::SessionClosed;
      };
      for frame in decoder.feed(&bytes) {
        match PushEvent::parse(&frame.data) {
          Ok(event) => handle_event(&shop, &event),
          Err(err) => warn!(error = %err, data = %frame.data, "Ignoring malformed event."),
        }
      }
    }
    debug!("Event stream closed by server.");
    StreamEnd::Disconnected
  }

  /// Connects, consumes, and reconnects after a fixed delay until the
  /// session ends or the backend rejects the token.
  #[instrument(name = "RealtimeListener::run", skip_all)]
  pub async fn run(self) {
    loop {
      let delay = match self.shop.upgrade() {
        Some(shop) => shop.settings().realtime_reconnect,
        None => return,
      };

      let token = self.token.read().clone();
      match self.source.connect(&token).await {
        Ok(stream) => {
          info!("Event stream connected.");
          if self.consume(stream).await == StreamEnd::SessionClosed {
            return;
          }
        }
        Err(err) if err.is_auth_failure() => {
          warn!(error = %err, "Event stream rejected the session, giving up.");
          return;
        }
        Err(err) => warn!(error = %err, "Event stream connect failed."),
      }

      tokio::time::sleep(delay).await;
    }
  }

  pub fn spawn(self) -> JoinHandle<()> {
    tokio::spawn(self.run())
  }
}
