// storefront/src/web/handlers/admin_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::web::extractors::AdminSession;
use crate::web::responses::{created, ok};
use tuckshop::models::{CategoryDraft, OrderStatus, ProductDraft};
use tuckshop::{CompletionOutcome, View};

#[derive(Deserialize, Debug)]
pub struct OrdersQuery {
  #[serde(default)]
  pub status: Option<OrderStatus>,
}

#[derive(Deserialize, Debug)]
pub struct RejectPayload {
  #[serde(default)]
  pub reason: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ScanPayload {
  pub qr_code: String,
  /// Complete the order in the same request once the code checks out.
  #[serde(default)]
  pub complete: bool,
}

#[derive(Deserialize, Debug)]
pub struct StockPayload {
  pub stock: u32,
}

#[derive(Deserialize, Debug)]
pub struct SalesQuery {
  #[serde(default = "default_sales_days")]
  pub days: u32,
}

fn default_sales_days() -> u32 {
  7
}

// --- Orders ---

#[instrument(name = "handler::admin_orders", skip(admin, query), fields(user = %admin.user(), status = ?query.status))]
pub async fn list_orders_handler(
  admin: AdminSession,
  query: web::Query<OrdersQuery>,
) -> Result<HttpResponse, AppError> {
  admin.shop.set_view(View::AdminOrders);
  let orders = admin.shop.admin().orders(query.status).await?;
  Ok(ok(&admin, "Orders fetched.", orders))
}

#[instrument(name = "handler::admin_order", skip(admin, path), fields(user = %admin.user(), order_id = %path.as_ref()))]
pub async fn get_order_handler(admin: AdminSession, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  admin.shop.set_view(View::AdminOrderDetail(order_id));
  let order = admin.shop.admin().order(order_id).await?;
  Ok(ok(&admin, "Order fetched.", order))
}

#[instrument(name = "handler::complete_order", skip(admin, path), fields(user = %admin.user(), order_id = %path.as_ref()))]
pub async fn complete_order_handler(admin: AdminSession, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
  let outcome = admin.shop.admin().complete_order(path.into_inner()).await?;
  let message = match &outcome {
    CompletionOutcome::Completed { .. } => "Order completed.",
    CompletionOutcome::AlreadyCompleted { .. } => "Order was already completed.",
  };
  Ok(ok(&admin, message, outcome))
}

#[instrument(name = "handler::reject_order", skip(admin, path, payload), fields(user = %admin.user(), order_id = %path.as_ref()))]
pub async fn reject_order_handler(
  admin: AdminSession,
  path: web::Path<i64>,
  payload: web::Json<RejectPayload>,
) -> Result<HttpResponse, AppError> {
  let order = admin.shop.admin().reject_order(path.into_inner(), &payload.reason).await?;
  Ok(ok(&admin, "Order rejected.", order))
}

#[instrument(name = "handler::scan", skip(admin, payload), fields(user = %admin.user(), complete = payload.complete))]
pub async fn scan_handler(admin: AdminSession, payload: web::Json<ScanPayload>) -> Result<HttpResponse, AppError> {
  admin.shop.set_view(View::AdminScan);
  let desk = admin.shop.admin();
  if payload.complete {
    let outcome = desk.scan_and_complete(&payload.qr_code).await?;
    info!(order_id = outcome.order_id(), "Scanned order completed.");
    return Ok(ok(&admin, "Order completed.", outcome));
  }
  match desk.scan(&payload.qr_code).await {
    Ok(result) => Ok(ok(&admin, "QR code verified.", result)),
    Err(err) => {
      warn!(error = %err, "Scan rejected.");
      Err(err.into())
    }
  }
}

// --- Inventory ---

#[instrument(name = "handler::create_product", skip(admin, payload), fields(user = %admin.user(), name = %payload.name))]
pub async fn create_product_handler(
  admin: AdminSession,
  payload: web::Json<ProductDraft>,
) -> Result<HttpResponse, AppError> {
  admin.shop.set_view(View::AdminInventory);
  let product = admin.shop.catalog().create_product(&payload).await?;
  Ok(created(&admin, "Product created.", product))
}

#[instrument(name = "handler::update_product", skip(admin, path, payload), fields(user = %admin.user(), product_id = %path.as_ref()))]
pub async fn update_product_handler(
  admin: AdminSession,
  path: web::Path<i64>,
  payload: web::Json<ProductDraft>,
) -> Result<HttpResponse, AppError> {
  let product = admin.shop.catalog().update_product(path.into_inner(), &payload).await?;
  Ok(ok(&admin, "Product updated.", product))
}

#[instrument(name = "handler::delete_product", skip(admin, path), fields(user = %admin.user(), product_id = %path.as_ref()))]
pub async fn delete_product_handler(admin: AdminSession, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
  admin.shop.catalog().delete_product(path.into_inner()).await?;
  Ok(ok(&admin, "Product deleted.", ()))
}

#[instrument(name = "handler::set_stock", skip(admin, path, payload), fields(user = %admin.user(), product_id = %path.as_ref(), stock = payload.stock))]
pub async fn set_stock_handler(
  admin: AdminSession,
  path: web::Path<i64>,
  payload: web::Json<StockPayload>,
) -> Result<HttpResponse, AppError> {
  let product = admin.shop.catalog().set_stock(path.into_inner(), payload.stock).await?;
  Ok(ok(&admin, "Stock updated.", product))
}

#[instrument(name = "handler::create_category", skip(admin, payload), fields(user = %admin.user(), name = %payload.name))]
pub async fn create_category_handler(
  admin: AdminSession,
  payload: web::Json<CategoryDraft>,
) -> Result<HttpResponse, AppError> {
  admin.shop.set_view(View::AdminInventory);
  let category = admin.shop.catalog().create_category(&payload).await?;
  Ok(created(&admin, "Category created.", category))
}

#[instrument(name = "handler::update_category", skip(admin, path, payload), fields(user = %admin.user(), category_id = %path.as_ref()))]
pub async fn update_category_handler(
  admin: AdminSession,
  path: web::Path<i64>,
  payload: web::Json<CategoryDraft>,
) -> Result<HttpResponse, AppError> {
  let category = admin.shop.catalog().update_category(path.into_inner(), &payload).await?;
  Ok(ok(&admin, "Category updated.", category))
}

#[instrument(name = "handler::delete_category", skip(admin, path), fields(user = %admin.user(), category_id = %path.as_ref()))]
pub async fn delete_category_handler(admin: AdminSession, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
  admin.shop.catalog().delete_category(path.into_inner()).await?;
  Ok(ok(&admin, "Category deleted.", ()))
}

// --- Reporting ---

#[instrument(name = "handler::customers", skip_all, fields(user = %admin.user()))]
pub async fn customers_handler(admin: AdminSession) -> Result<HttpResponse, AppError> {
  admin.shop.set_view(View::AdminCustomers);
  let customers = admin.shop.admin().customers().await?;
  Ok(ok(&admin, "Customers fetched.", customers))
}

#[instrument(name = "handler::analytics", skip_all, fields(user = %admin.user()))]
pub async fn analytics_handler(admin: AdminSession) -> Result<HttpResponse, AppError> {
  admin.shop.set_view(View::AdminAnalytics);
  let overview = admin.shop.admin().analytics_overview().await?;
  Ok(ok(&admin, "Analytics fetched.", overview))
}

#[instrument(name = "handler::sales", skip(admin, query), fields(user = %admin.user(), days = query.days))]
pub async fn sales_handler(admin: AdminSession, query: web::Query<SalesQuery>) -> Result<HttpResponse, AppError> {
  admin.shop.set_view(View::AdminAnalytics);
  let points = admin.shop.admin().sales(query.days).await?;
  Ok(ok(&admin, "Sales fetched.", points))
}
