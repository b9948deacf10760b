// core/src/orders/checkout.rs

use super::stamp_qr;
use crate::api::ApiClient;
use crate::cache::{QueryCache, QueryKey};
use crate::error::{Result, TuckshopError};
use crate::flow::{skip_if, Flow, FlowControl, Shared};
use crate::models::{Cart, CheckoutReceipt, Order, PaymentMethod, PaymentQr};
use crate::notify::Notifier;
use crate::shop::{ShopSettings, Storefront};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// State threaded through the checkout steps.
#[derive(Debug, Clone)]
pub struct CheckoutCtx {
  pub payment_method: PaymentMethod,
  pub cart: Option<Cart>,
  pub order: Option<Order>,
  pub qr: Option<PaymentQr>,
  pub payment_url: Option<String>,
  /// Set when the order exists but its payment step could not be prepared.
  pub payment_error: Option<String>,
  api: ApiClient,
  cache: Arc<QueryCache>,
  notifier: Notifier,
  settings: Arc<ShopSettings>,
}

impl CheckoutCtx {
  pub fn new(shop: &Storefront, payment_method: PaymentMethod) -> Self {
    CheckoutCtx {
      payment_method,
      cart: None,
      order: None,
      qr: None,
      payment_url: None,
      payment_error: None,
      api: shop.api().clone(),
      cache: shop.cache().clone(),
      notifier: shop.notifier().clone(),
      settings: shop.settings().clone(),
    }
  }

  fn order_id(&self) -> Result<i64> {
    self
      .order
      .as_ref()
      .map(|o| o.id)
      .ok_or_else(|| TuckshopError::Internal("no order created yet".to_string()))
  }

  pub fn into_receipt(self) -> Result<CheckoutReceipt> {
    let order = self
      .order
      .ok_or_else(|| TuckshopError::Internal("checkout finished without an order".to_string()))?;
    Ok(CheckoutReceipt {
      order,
      qr: self.qr,
      payment_url: self.payment_url,
      payment_error: self.payment_error,
    })
  }
}

/// validate_cart → create_order → prepare_cash_qr | initiate_paynow → settle_cart → announce
pub fn checkout_flow() -> Result<Flow<CheckoutCtx, TuckshopError>> {
  let mut flow = Flow::new(
    "checkout",
    &[
      ("validate_cart", false, None),
      ("create_order", false, None),
      (
        "prepare_cash_qr",
        false,
        skip_if(|ctx: &CheckoutCtx| ctx.payment_method != PaymentMethod::Cash),
      ),
      (
        "initiate_paynow",
        false,
        skip_if(|ctx: &CheckoutCtx| ctx.payment_method != PaymentMethod::Paynow),
      ),
      ("settle_cart", false, None),
      ("announce", true, None),
    ],
  );

  flow.on("validate_cart", |ctx: Shared<CheckoutCtx>| async move {
    let (api, cache) = {
      let c = ctx.read();
      (c.api.clone(), c.cache.clone())
    };
    let cart = cache.fetch(QueryKey::cart(), || api.cart()).await?;
    if cart.is_empty() {
      return Err(TuckshopError::field("cart", "Your cart is empty"));
    }
    for line in &cart.items {
      let available = match line.stock {
        Some(stock) => stock,
        None => {
          let product_id = line.product_id;
          cache.fetch(QueryKey::product(product_id), || api.product(product_id)).await?.stock
        }
      };
      if line.quantity > available {
        return Err(TuckshopError::InsufficientStock {
          product_id: line.product_id,
          requested: line.quantity,
          available,
        });
      }
    }
    debug!(lines = cart.items.len(), total = cart.total_amount, "Cart valid for checkout.");
    ctx.write().cart = Some(cart);
    Ok::<_, TuckshopError>(FlowControl::Continue)
  })?;

  flow.on("create_order", |ctx: Shared<CheckoutCtx>| async move {
    let (api, method) = {
      let c = ctx.read();
      (c.api.clone(), c.payment_method)
    };
    let order = api.checkout(method).await?;
    info!(order_id = order.id, payment_method = %method, total = order.total_amount, "Order created.");
    ctx.write().order = Some(order);
    Ok::<_, TuckshopError>(FlowControl::Continue)
  })?;

  // Once the order exists the cart must still be settled, so payment step
  // failures are recorded on the receipt instead of aborting the flow.
  flow.on("prepare_cash_qr", |ctx: Shared<CheckoutCtx>| async move {
    if let Err(err) = prepare_cash_qr(&ctx).await {
      defer_payment(&ctx, err);
    }
    Ok::<_, TuckshopError>(FlowControl::Continue)
  })?;

  flow.on("initiate_paynow", |ctx: Shared<CheckoutCtx>| async move {
    if let Err(err) = initiate_paynow(&ctx).await {
      defer_payment(&ctx, err);
    }
    Ok::<_, TuckshopError>(FlowControl::Continue)
  })?;

  flow.on("settle_cart", |ctx: Shared<CheckoutCtx>| async move {
    let c = ctx.read();
    let cache = &c.cache;
    cache.cancel(&QueryKey::cart());
    cache.set(QueryKey::cart(), Cart::empty());
    cache.invalidate(&QueryKey::cart());
    cache.invalidate(&QueryKey::orders());
    cache.invalidate(&QueryKey::admin_orders());
    cache.invalidate(&QueryKey::products());
    if let Some(order) = &c.order {
      cache.set(QueryKey::order(order.id), order.clone());
    }
    Ok::<_, TuckshopError>(FlowControl::Continue)
  })?;

  flow.on("announce", |ctx: Shared<CheckoutCtx>| async move {
    let c = ctx.read();
    if let (Some(order), Some(_)) = (&c.order, &c.payment_error) {
      c.notifier.error(format!(
        "Order {} placed, but payment could not be prepared. Open the order to try again.",
        order.display_number()
      ));
    } else if let Some(order) = &c.order {
      let message = match c.payment_method {
        PaymentMethod::Cash => format!("Order {} placed. Show the QR code at the counter.", order.display_number()),
        PaymentMethod::Paynow => format!("Order {} placed. Complete your PayNow payment.", order.display_number()),
      };
      c.notifier.success(message);
    }
    Ok::<_, TuckshopError>(FlowControl::Continue)
  })?;

  Ok(flow)
}

fn defer_payment(ctx: &Shared<CheckoutCtx>, err: TuckshopError) {
  let mut c = ctx.write();
  warn!(order_id = ?c.order.as_ref().map(|o| o.id), error = %err, "Payment step failed after order creation.");
  c.payment_error = Some(err.toast_message());
}

async fn prepare_cash_qr(ctx: &Shared<CheckoutCtx>) -> Result<()> {
  let now = Utc::now();
  let (api, cache, ttl, order_id, embedded) = {
    let c = ctx.read();
    (
      c.api.clone(),
      c.cache.clone(),
      c.settings.cash_qr_ttl,
      c.order_id()?,
      c.order.as_ref().and_then(|o| o.qr.clone()),
    )
  };

  let fresh = |qr: PaymentQr| stamp_qr(qr, PaymentMethod::Cash, ttl, now);
  let mut qr = match embedded {
    Some(qr) => fresh(qr),
    None => fresh(api.order_qr(order_id).await?),
  };
  if qr.is_expired_at(now) {
    qr = fresh(api.regenerate_qr(order_id).await?);
  }

  cache.set(QueryKey::order_qr(order_id), qr.clone());
  ctx.write().qr = Some(qr);
  Ok(())
}

async fn initiate_paynow(ctx: &Shared<CheckoutCtx>) -> Result<()> {
  let (api, order_id, embedded) = {
    let c = ctx.read();
    (
      c.api.clone(),
      c.order_id()?,
      c.order.as_ref().and_then(|o| o.payment_url.clone()),
    )
  };
  let url = match embedded {
    Some(url) => url,
    None => api.initiate_paynow(order_id).await?.payment_url,
  };
  debug!(order_id, "PayNow session ready.");
  ctx.write().payment_url = Some(url);
  Ok(())
}
