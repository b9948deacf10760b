// storefront/src/web/routes.rs

use crate::web::handlers::{
  admin_handlers, auth_handlers, cart_handlers, catalog_handlers, checkout_handlers, event_handlers, order_handlers,
};
use actix_web::web;
use tuckshop::api::Envelope;

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(Envelope::ok("ok", serde_json::json!({ "status": "ok" })))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      // Authentication
      .service(
        web::scope("/auth")
          .route("/login", web::post().to(auth_handlers::login_handler))
          .route("/register", web::post().to(auth_handlers::register_handler))
          .route("/logout", web::post().to(auth_handlers::logout_handler))
          .route("/refresh", web::post().to(auth_handlers::refresh_handler))
          .route("/me", web::get().to(auth_handlers::me_handler))
          .route("/profile", web::put().to(auth_handlers::update_profile_handler)),
      )
      // Catalog (anonymous browsing allowed)
      .service(
        web::scope("/products")
          .route("", web::get().to(catalog_handlers::list_products_handler))
          .route("/{product_id}", web::get().to(catalog_handlers::get_product_handler)),
      )
      .route("/categories", web::get().to(catalog_handlers::list_categories_handler))
      // Cart
      .service(
        web::scope("/cart")
          .route("", web::get().to(cart_handlers::get_cart_handler))
          .route("", web::delete().to(cart_handlers::clear_cart_handler))
          .route("/items", web::post().to(cart_handlers::add_to_cart_handler))
          .route("/items/{product_id}", web::put().to(cart_handlers::update_cart_item_handler))
          .route("/items/{product_id}", web::delete().to(cart_handlers::remove_cart_item_handler)),
      )
      .route("/checkout", web::post().to(checkout_handlers::checkout_handler))
      // Customer orders
      .service(
        web::scope("/orders")
          .route("", web::get().to(order_handlers::list_orders_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
          .route("/{order_id}/qr", web::get().to(order_handlers::order_qr_handler))
          .route("/{order_id}/qr/regenerate", web::post().to(order_handlers::regenerate_qr_handler))
          .route("/{order_id}/paynow", web::post().to(order_handlers::resume_paynow_handler))
          .route("/{order_id}/payment-status", web::get().to(order_handlers::payment_status_handler))
          .route("/{order_id}/cancel", web::patch().to(order_handlers::cancel_order_handler)),
      )
      // Admin desk
      .service(
        web::scope("/admin")
          .route("/orders", web::get().to(admin_handlers::list_orders_handler))
          .route("/orders/{order_id}", web::get().to(admin_handlers::get_order_handler))
          .route("/orders/{order_id}/complete", web::patch().to(admin_handlers::complete_order_handler))
          .route("/orders/{order_id}/reject", web::patch().to(admin_handlers::reject_order_handler))
          .route("/scan", web::post().to(admin_handlers::scan_handler))
          .route("/products", web::post().to(admin_handlers::create_product_handler))
          .route("/products/{product_id}", web::put().to(admin_handlers::update_product_handler))
          .route("/products/{product_id}", web::delete().to(admin_handlers::delete_product_handler))
          .route("/products/{product_id}/stock", web::patch().to(admin_handlers::set_stock_handler))
          .route("/categories", web::post().to(admin_handlers::create_category_handler))
          .route("/categories/{category_id}", web::put().to(admin_handlers::update_category_handler))
          .route("/categories/{category_id}", web::delete().to(admin_handlers::delete_category_handler))
          .route("/customers", web::get().to(admin_handlers::customers_handler))
          .route("/analytics", web::get().to(admin_handlers::analytics_handler))
          .route("/analytics/sales", web::get().to(admin_handlers::sales_handler)),
      )
      // Browser toast stream
      .route("/events", web::get().to(event_handlers::events_handler)),
  );
}
