// storefront/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::web::extractors::CurrentSession;
use crate::web::responses::ok;
use tuckshop::View;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartPayload {
  pub product_id: i64,
  #[serde(default = "one")]
  pub quantity: u32,
}

fn one() -> u32 {
  1
}

#[derive(Deserialize, Debug)]
pub struct QuantityPayload {
  pub quantity: u32,
}

#[instrument(name = "handler::get_cart", skip_all, fields(user = %session.user()))]
pub async fn get_cart_handler(session: CurrentSession) -> Result<HttpResponse, AppError> {
  session.shop.set_view(View::Cart);
  let cart = session.shop.cart().get().await?;
  Ok(ok(&session, "Cart fetched.", cart))
}

#[instrument(
    name = "handler::add_to_cart",
    skip(session, payload),
    fields(user = %session.user(), product_id = payload.product_id, quantity = payload.quantity)
)]
pub async fn add_to_cart_handler(
  session: CurrentSession,
  payload: web::Json<AddToCartPayload>,
) -> Result<HttpResponse, AppError> {
  let cart = session.shop.cart().add_item(payload.product_id, payload.quantity).await?;
  info!(items = cart.total_items, "Item added to cart.");
  Ok(ok(&session, "Item added to cart.", cart))
}

/// A quantity of zero removes the line.
#[instrument(
    name = "handler::update_cart_item",
    skip(session, path, payload),
    fields(user = %session.user(), product_id = %path.as_ref(), quantity = payload.quantity)
)]
pub async fn update_cart_item_handler(
  session: CurrentSession,
  path: web::Path<i64>,
  payload: web::Json<QuantityPayload>,
) -> Result<HttpResponse, AppError> {
  let cart = session.shop.cart().update_item(path.into_inner(), payload.quantity).await?;
  Ok(ok(&session, "Cart updated.", cart))
}

#[instrument(name = "handler::remove_cart_item", skip(session, path), fields(user = %session.user(), product_id = %path.as_ref()))]
pub async fn remove_cart_item_handler(session: CurrentSession, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
  let cart = session.shop.cart().remove_item(path.into_inner()).await?;
  Ok(ok(&session, "Item removed from cart.", cart))
}

#[instrument(name = "handler::clear_cart", skip_all, fields(user = %session.user()))]
pub async fn clear_cart_handler(session: CurrentSession) -> Result<HttpResponse, AppError> {
  let cart = session.shop.cart().clear().await?;
  Ok(ok(&session, "Cart cleared.", cart))
}
