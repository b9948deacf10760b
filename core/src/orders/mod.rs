// core/src/orders/mod.rs

//! Customer order operations: checkout, QR codes, payment polling, cancellation.

mod checkout;

pub use checkout::{checkout_flow, CheckoutCtx};

use crate::cache::QueryKey;
use crate::error::{Result, TuckshopError};
use crate::flow::Shared;
use crate::models::{CheckoutReceipt, Order, OrderStatus, PaymentMethod, PaymentQr};
use crate::shop::Storefront;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument, warn};

/// Gives a cash QR without an expiry the configured validity window, and
/// strips any expiry from PayNow pickup codes.
pub(crate) fn stamp_qr(mut qr: PaymentQr, method: PaymentMethod, ttl: Duration, now: DateTime<Utc>) -> PaymentQr {
  match method {
    PaymentMethod::Cash => {
      if qr.expires_at.is_none() {
        qr.expires_at = Some(now + ttl);
      }
    }
    PaymentMethod::Paynow => qr.expires_at = None,
  }
  qr
}

pub struct Orders<'a> {
  shop: &'a Storefront,
}

impl<'a> Orders<'a> {
  pub(crate) fn new(shop: &'a Storefront) -> Self {
    Orders { shop }
  }

  pub async fn list(&self) -> Result<Vec<Order>> {
    let api = self.shop.api();
    self.shop.cache().fetch(QueryKey::orders(), || api.orders()).await
  }

  pub async fn get(&self, order_id: i64) -> Result<Order> {
    let api = self.shop.api();
    self
      .shop
      .cache()
      .fetch(QueryKey::order(order_id), || api.order(order_id))
      .await
  }

  /// Cached order if any (fresh or not), otherwise fetched.
  async fn known(&self, order_id: i64) -> Result<Order> {
    match self.shop.cache().get::<Order>(&QueryKey::order(order_id)) {
      Some(order) => Ok(order),
      None => self.get(order_id).await,
    }
  }

  /// Converts the cart into an order and prepares the chosen payment path.
  #[instrument(skip(self))]
  pub async fn checkout(&self, payment_method: PaymentMethod) -> Result<CheckoutReceipt> {
    let flow = checkout_flow()?;
    let ctx = Shared::new(CheckoutCtx::new(self.shop, payment_method));
    if let Err(err) = flow.run(ctx.clone()).await {
      warn!(error = %err, "Checkout failed.");
      self.shop.notifier().error(err.toast_message());
      return Err(err);
    }
    ctx.into_inner().into_receipt()
  }

  /// The pickup/payment QR for an order. An expired cash QR is replaced
  /// transparently while the order is still pending.
  #[instrument(skip(self))]
  pub async fn order_qr(&self, order_id: i64) -> Result<PaymentQr> {
    let now = Utc::now();
    let key = QueryKey::order_qr(order_id);
    if let Some(qr) = self.shop.cache().get_fresh::<PaymentQr>(&key) {
      if !qr.is_expired_at(now) {
        return Ok(qr);
      }
    }

    let order = self.known(order_id).await?;
    if order.status == OrderStatus::Cancelled {
      return Err(TuckshopError::OrderCancelled { order_id });
    }

    let qr = self.shop.api().order_qr(order_id).await?;
    let qr = stamp_qr(qr, order.payment_method, self.shop.settings().cash_qr_ttl, now);
    if qr.is_expired_at(now) {
      if order.payment_method == PaymentMethod::Cash && order.status == OrderStatus::Pending {
        info!(order_id, "Cash QR expired, regenerating.");
        return self.regenerate_qr(order_id).await;
      }
      return Err(TuckshopError::QrExpired { order_id });
    }

    self.shop.cache().set(key, qr.clone());
    Ok(qr)
  }

  /// Forces a new cash QR. Only pending cash orders have one to replace.
  #[instrument(skip(self))]
  pub async fn regenerate_qr(&self, order_id: i64) -> Result<PaymentQr> {
    let order = self.known(order_id).await?;
    if order.payment_method != PaymentMethod::Cash || order.status != OrderStatus::Pending {
      return Err(TuckshopError::field(
        "order",
        "Only pending cash orders can get a new QR code",
      ));
    }

    let now = Utc::now();
    let qr = self.shop.api().regenerate_qr(order_id).await?;
    let qr = stamp_qr(qr, PaymentMethod::Cash, self.shop.settings().cash_qr_ttl, now);
    self.shop.cache().set(QueryKey::order_qr(order_id), qr.clone());
    self.shop.cache().update::<Order, _>(&QueryKey::order(order_id), |o| o.qr = Some(qr.clone()));
    Ok(qr)
  }

  /// Starts (or restarts) the PayNow session of a pending PayNow order,
  /// e.g. when checkout placed the order but could not reach the provider.
  #[instrument(skip(self))]
  pub async fn resume_paynow(&self, order_id: i64) -> Result<String> {
    let order = self.known(order_id).await?;
    if order.payment_method != PaymentMethod::Paynow || order.status != OrderStatus::Pending {
      return Err(TuckshopError::field("order", "Only pending PayNow orders can be paid online"));
    }
    let url = match self.shop.api().initiate_paynow(order_id).await {
      Ok(session) => session.payment_url,
      Err(err) => {
        self.shop.notifier().error(err.toast_message());
        return Err(err);
      }
    };
    self
      .shop
      .cache()
      .update::<Order, _>(&QueryKey::order(order_id), |o| o.payment_url = Some(url.clone()));
    Ok(url)
  }

  /// Polls the payment status until the order is paid, cancelled, or the
  /// configured number of checks runs out.
  #[instrument(skip(self))]
  pub async fn await_payment(&self, order_id: i64) -> Result<Order> {
    let settings = self.shop.settings();
    let attempts = settings.payment_poll_attempts.max(1);

    for attempt in 1..=attempts {
      match self.shop.api().payment_status(order_id).await {
        Ok(status) => match status.status {
          OrderStatus::Paid | OrderStatus::Completed => {
            info!(order_id, attempt, status = %status.status, "Payment confirmed.");
            let order = self.shop.api().order(order_id).await?;
            let cache = self.shop.cache();
            cache.set(QueryKey::order(order_id), order.clone());
            cache.invalidate(&QueryKey::orders());
            return Ok(order);
          }
          OrderStatus::Cancelled => {
            self.shop.cache().invalidate(&QueryKey::orders());
            return Err(TuckshopError::OrderCancelled { order_id });
          }
          OrderStatus::Pending => debug!(order_id, attempt, "Still awaiting payment."),
        },
        Err(err) if err.is_transient() => warn!(order_id, attempt, error = %err, "Payment poll failed."),
        Err(err) => return Err(err),
      }
      if attempt < attempts {
        tokio::time::sleep(settings.payment_poll_interval).await;
      }
    }

    Err(TuckshopError::PaymentTimeout { order_id, attempts })
  }

  #[instrument(skip(self))]
  pub async fn cancel_order(&self, order_id: i64) -> Result<Order> {
    let current = self.known(order_id).await?;
    current.ensure_transition(OrderStatus::Cancelled)?;

    let order = match self.shop.api().cancel_order(order_id).await {
      Ok(order) => order,
      Err(err) => {
        self.shop.notifier().error(err.toast_message());
        return Err(err);
      }
    };

    let cache = self.shop.cache();
    cache.invalidate(&QueryKey::orders());
    cache.invalidate(&QueryKey::admin_orders());
    cache.invalidate(&QueryKey::products());
    cache.invalidate(&QueryKey::analytics());
    cache.set(QueryKey::order(order_id), order.clone());
    info!(order_id, "Order cancelled.");
    self.shop.notifier().info(format!("Order {} cancelled.", order.display_number()));
    Ok(order)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn qr(expires_at: Option<DateTime<Utc>>) -> PaymentQr {
    PaymentQr {
      qr_code: "{}".into(),
      expires_at,
      is_used: false,
    }
  }

  #[test]
  fn cash_qr_without_expiry_gets_window() {
    let now = Utc::now();
    let stamped = stamp_qr(qr(None), PaymentMethod::Cash, Duration::minutes(15), now);
    assert_eq!(stamped.expires_at, Some(now + Duration::minutes(15)));
  }

  #[test]
  fn cash_qr_keeps_backend_expiry() {
    let now = Utc::now();
    let at = now + Duration::minutes(3);
    let stamped = stamp_qr(qr(Some(at)), PaymentMethod::Cash, Duration::minutes(15), now);
    assert_eq!(stamped.expires_at, Some(at));
  }

  #[test]
  fn paynow_qr_never_expires() {
    let now = Utc::now();
    let stamped = stamp_qr(qr(Some(now - Duration::hours(1))), PaymentMethod::Paynow, Duration::minutes(15), now);
    assert!(!stamped.is_expired_at(now));
  }
}
