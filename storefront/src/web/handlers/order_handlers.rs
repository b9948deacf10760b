// storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::web::extractors::CurrentSession;
use crate::web::responses::ok;
use tuckshop::View;

#[instrument(name = "handler::list_orders", skip_all, fields(user = %session.user()))]
pub async fn list_orders_handler(session: CurrentSession) -> Result<HttpResponse, AppError> {
  session.shop.set_view(View::Orders);
  let orders = session.shop.orders().list().await?;
  Ok(ok(&session, "Orders fetched.", orders))
}

#[instrument(name = "handler::get_order", skip(session, path), fields(user = %session.user(), order_id = %path.as_ref()))]
pub async fn get_order_handler(session: CurrentSession, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  session.shop.set_view(View::OrderDetail(order_id));
  let order = session.shop.orders().get(order_id).await?;
  Ok(ok(&session, "Order fetched.", order))
}

/// Cash pickup QR; an expired code is regenerated before it is returned.
#[instrument(name = "handler::order_qr", skip(session, path), fields(user = %session.user(), order_id = %path.as_ref()))]
pub async fn order_qr_handler(session: CurrentSession, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
  let qr = session.shop.orders().order_qr(path.into_inner()).await?;
  Ok(ok(&session, "QR code fetched.", qr))
}

#[instrument(name = "handler::regenerate_qr", skip(session, path), fields(user = %session.user(), order_id = %path.as_ref()))]
pub async fn regenerate_qr_handler(session: CurrentSession, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
  let qr = session.shop.orders().regenerate_qr(path.into_inner()).await?;
  Ok(ok(&session, "QR code regenerated.", qr))
}

/// Starts a new PayNow session for an order whose checkout could not.
#[instrument(name = "handler::resume_paynow", skip(session, path), fields(user = %session.user(), order_id = %path.as_ref()))]
pub async fn resume_paynow_handler(session: CurrentSession, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
  let url = session.shop.orders().resume_paynow(path.into_inner()).await?;
  Ok(ok(&session, "PayNow session ready.", serde_json::json!({ "paymentUrl": url })))
}

/// Long-polls the backend until the PayNow payment is confirmed.
#[instrument(name = "handler::payment_status", skip(session, path), fields(user = %session.user(), order_id = %path.as_ref()))]
pub async fn payment_status_handler(session: CurrentSession, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
  let order = session.shop.orders().await_payment(path.into_inner()).await?;
  info!(order_id = order.id, status = %order.status, "Payment confirmed.");
  Ok(ok(&session, "Payment confirmed.", order))
}

#[instrument(name = "handler::cancel_order", skip(session, path), fields(user = %session.user(), order_id = %path.as_ref()))]
pub async fn cancel_order_handler(session: CurrentSession, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
  let order = session.shop.orders().cancel_order(path.into_inner()).await?;
  Ok(ok(&session, "Order cancelled.", order))
}
