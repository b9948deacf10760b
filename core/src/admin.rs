// core/src/admin.rs

//! Back-office order desk and reporting.

use crate::cache::QueryKey;
use crate::error::{Result, TuckshopError};
use crate::models::{AnalyticsOverview, Customer, Order, OrderStatus, QrPayload, SalesPoint};
use crate::shop::Storefront;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum CompletionOutcome {
  Completed { order: Order, attempts: u32 },
  /// A previous submission already completed it.
  AlreadyCompleted { order_id: i64 },
}

impl CompletionOutcome {
  pub fn order_id(&self) -> i64 {
    match self {
      CompletionOutcome::Completed { order, .. } => order.id,
      CompletionOutcome::AlreadyCompleted { order_id } => *order_id,
    }
  }
}

/// A scanned QR matched against its order, awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
  pub payload: QrPayload,
  pub order: Order,
}

pub struct AdminDesk<'a> {
  shop: &'a Storefront,
}

impl<'a> AdminDesk<'a> {
  pub(crate) fn new(shop: &'a Storefront) -> Self {
    AdminDesk { shop }
  }

  pub async fn orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
    let key = QueryKey::admin_orders().with(status.map_or_else(|| "all".to_string(), |s| s.to_string()));
    let api = self.shop.api();
    self.shop.cache().fetch(key, || api.admin_orders(status)).await
  }

  pub async fn order(&self, order_id: i64) -> Result<Order> {
    let api = self.shop.api();
    self
      .shop
      .cache()
      .fetch(QueryKey::admin_orders().with(order_id), || api.admin_order(order_id))
      .await
  }

  fn after_order_change(&self, order: Option<&Order>) {
    let cache = self.shop.cache();
    cache.invalidate(&QueryKey::admin_orders());
    cache.invalidate(&QueryKey::orders());
    cache.invalidate(&QueryKey::analytics());
    if let Some(order) = order {
      cache.set(QueryKey::admin_orders().with(order.id), order.clone());
    }
  }

  /// Marks an order collected. Safe to submit twice: a backend "already
  /// completed" answer counts as success. Transient failures are retried
  /// with a linearly growing delay. The order is checked first, so an
  /// unpaid PayNow order never reaches the backend.
  #[instrument(skip(self))]
  pub async fn complete_order(&self, order_id: i64) -> Result<CompletionOutcome> {
    let known = self.order(order_id).await?;
    if known.status == OrderStatus::Completed {
      return Ok(CompletionOutcome::AlreadyCompleted { order_id });
    }
    known.ensure_transition(OrderStatus::Completed)?;

    let settings = self.shop.settings();
    let attempts = settings.complete_attempts.max(1);
    let mut attempt = 1;
    let outcome = loop {
      match self.shop.api().complete_order(order_id).await {
        Ok(order) => break CompletionOutcome::Completed { order, attempts: attempt },
        Err(err) if err.is_already_completed() => {
          info!(order_id, "Order was already completed.");
          break CompletionOutcome::AlreadyCompleted { order_id };
        }
        Err(err) if err.is_transient() && attempt < attempts => {
          let delay = settings.complete_retry_base * attempt;
          warn!(order_id, attempt, error = %err, delay_ms = delay.as_millis() as u64, "Completion failed, retrying.");
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        Err(err) => {
          self.shop.notifier().error(err.toast_message());
          return Err(err);
        }
      }
    };

    match &outcome {
      CompletionOutcome::Completed { order, .. } => {
        self.after_order_change(Some(order));
        self
          .shop
          .notifier()
          .success(format!("Order {} completed.", order.display_number()));
      }
      CompletionOutcome::AlreadyCompleted { .. } => {
        self.after_order_change(None);
        self.shop.notifier().info("Order was already completed.");
      }
    }
    Ok(outcome)
  }

  #[instrument(skip(self))]
  pub async fn reject_order(&self, order_id: i64, reason: &str) -> Result<Order> {
    if reason.trim().is_empty() {
      return Err(TuckshopError::field("reason", "Give a reason for rejecting the order"));
    }
    let current = self.order(order_id).await?;
    current.ensure_transition(OrderStatus::Cancelled)?;

    let order = match self.shop.api().reject_order(order_id, reason.trim()).await {
      Ok(order) => order,
      Err(err) => {
        self.shop.notifier().error(err.toast_message());
        return Err(err);
      }
    };
    self.after_order_change(Some(&order));
    self.shop.cache().invalidate(&QueryKey::products());
    self
      .shop
      .notifier()
      .info(format!("Order {} rejected.", order.display_number()));
    Ok(order)
  }

  /// Decodes a scanned QR and returns the matching order for confirmation.
  #[instrument(skip(self, raw))]
  pub async fn scan(&self, raw: &str) -> Result<ScanResult> {
    let payload = QrPayload::decode(raw)?;
    let order_id = payload.order_id;
    if payload.is_expired_at(Utc::now()) {
      return Err(TuckshopError::QrExpired { order_id });
    }

    let order = self.shop.api().admin_order(order_id).await?;
    if order.payment_method != payload.payment_method {
      return Err(TuckshopError::InvalidQr(format!(
        "payment method {} does not match order {}",
        payload.payment_method,
        order.display_number()
      )));
    }
    if order.status == OrderStatus::Cancelled {
      return Err(TuckshopError::OrderCancelled { order_id });
    }
    if order.status != OrderStatus::Completed {
      order.ensure_transition(OrderStatus::Completed)?;
    }
    self.shop.cache().set(QueryKey::admin_orders().with(order_id), order.clone());
    info!(order_id, status = %order.status, "QR scanned.");
    Ok(ScanResult { payload, order })
  }

  pub async fn scan_and_complete(&self, raw: &str) -> Result<CompletionOutcome> {
    let scanned = self.scan(raw).await?;
    self.complete_order(scanned.order.id).await
  }

  pub async fn customers(&self) -> Result<Vec<Customer>> {
    let api = self.shop.api();
    self.shop.cache().fetch(QueryKey::customers(), || api.customers()).await
  }

  pub async fn analytics_overview(&self) -> Result<AnalyticsOverview> {
    let api = self.shop.api();
    self.shop.cache().fetch(QueryKey::analytics(), || api.analytics()).await
  }

  pub async fn sales(&self, range_days: u32) -> Result<Vec<SalesPoint>> {
    let range_days = range_days.clamp(1, 365);
    let api = self.shop.api();
    self
      .shop
      .cache()
      .fetch(QueryKey::analytics().with("sales").with(range_days), || api.sales(range_days))
      .await
  }
}
