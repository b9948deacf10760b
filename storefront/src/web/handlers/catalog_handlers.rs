// storefront/src/web/handlers/catalog_handlers.rs

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::CurrentSession;
use crate::web::responses::reply;
use tuckshop::models::ProductFilter;
use tuckshop::{Storefront, View};

/// Signed-in users browse through their own storefront; everyone else shares the guest one.
fn browsing(app_state: &AppState, session: Option<&CurrentSession>) -> Arc<Storefront> {
  match session {
    Some(session) => {
      session.shop.set_view(View::Catalog);
      session.shop.clone()
    }
    None => app_state.sessions.guest(),
  }
}

#[instrument(name = "handler::list_products", skip(app_state, session, query), fields(filter = ?query))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  session: Option<CurrentSession>,
  query: web::Query<ProductFilter>,
) -> Result<HttpResponse, AppError> {
  let shop = browsing(&app_state, session.as_ref());
  let products = shop.catalog().products(&query).await?;
  info!(count = products.len(), "Products listed.");
  Ok(reply(StatusCode::OK, session.as_ref(), "Products fetched.", products))
}

#[instrument(name = "handler::get_product", skip(app_state, session, path), fields(product_id = %path.as_ref()))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  session: Option<CurrentSession>,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let shop = browsing(&app_state, session.as_ref());
  let product = shop.catalog().product(path.into_inner()).await?;
  Ok(reply(StatusCode::OK, session.as_ref(), "Product fetched.", product))
}

#[instrument(name = "handler::list_categories", skip_all)]
pub async fn list_categories_handler(
  app_state: web::Data<AppState>,
  session: Option<CurrentSession>,
) -> Result<HttpResponse, AppError> {
  let shop = browsing(&app_state, session.as_ref());
  let categories = shop.catalog().categories().await?;
  Ok(reply(StatusCode::OK, session.as_ref(), "Categories fetched.", categories))
}
