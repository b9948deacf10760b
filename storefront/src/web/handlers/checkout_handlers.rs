// storefront/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::web::extractors::CurrentSession;
use crate::web::responses::created;
use tuckshop::models::PaymentMethod;
use tuckshop::View;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
  pub payment_method: PaymentMethod,
}

/// Places the order for the current cart. Cash orders come back with their
/// pickup QR; PayNow orders with the hosted payment URL.
#[instrument(
    name = "handler::checkout",
    skip(session, payload),
    fields(user = %session.user(), payment_method = %payload.payment_method)
)]
pub async fn checkout_handler(
  session: CurrentSession,
  payload: web::Json<CheckoutPayload>,
) -> Result<HttpResponse, AppError> {
  session.shop.set_view(View::Checkout);
  let receipt = session.shop.orders().checkout(payload.payment_method).await?;
  info!(
    order_id = receipt.order.id,
    has_qr = receipt.qr.is_some(),
    has_payment_url = receipt.payment_url.is_some(),
    "Checkout completed."
  );
  Ok(created(&session, "Order placed.", receipt))
}
