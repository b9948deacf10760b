// core/src/api/mod.rs

//! Thin wrapper over the backend REST API. Every call goes through a
//! [`Transport`], so tests can script responses without a network.

mod envelope;
mod transport;

pub use envelope::{decode, Envelope};
pub use transport::{ApiRequest, ApiResponse, ByteStream, EventSource, HttpMethod, HttpTransport, Transport};

use crate::error::Result;
use crate::models::{
  AnalyticsOverview, AuthGrant, Cart, Category, CategoryDraft, Credentials, Customer, Order,
  OrderStatus, PaymentMethod, PaymentQr, PaymentStatus, PaynowSession, Product, ProductDraft, ProductFilter,
  ProfileUpdate, RegisterForm, SalesPoint, User,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Backend client bound to one (optional) access token.
#[derive(Clone)]
pub struct ApiClient {
  transport: Arc<dyn Transport>,
  token: Option<String>,
}

impl std::fmt::Debug for ApiClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ApiClient")
      .field("authenticated", &self.token.is_some())
      .finish()
  }
}

impl ApiClient {
  pub fn new(transport: Arc<dyn Transport>) -> Self {
    ApiClient { transport, token: None }
  }

  /// A copy of this client that sends `token` as its bearer credential.
  pub fn with_token(&self, token: impl Into<String>) -> Self {
    ApiClient {
      transport: self.transport.clone(),
      token: Some(token.into()),
    }
  }

  pub fn token(&self) -> Option<&str> {
    self.token.as_deref()
  }

  pub fn transport(&self) -> Arc<dyn Transport> {
    self.transport.clone()
  }

  async fn call<T: DeserializeOwned>(&self, mut request: ApiRequest) -> Result<T> {
    request.bearer = self.token.clone();
    debug!(method = %request.method, path = %request.path, "Calling backend.");
    let response = self.transport.send(request).await?;
    decode(response)
  }

  // --- auth ---

  #[instrument(skip(self, credentials), fields(email = %credentials.email))]
  pub async fn login(&self, credentials: &Credentials) -> Result<AuthGrant> {
    self
      .call(ApiRequest::new(HttpMethod::Post, "/auth/login").json(json!(credentials)))
      .await
  }

  #[instrument(skip(self, form), fields(email = %form.email))]
  pub async fn register(&self, form: &RegisterForm) -> Result<AuthGrant> {
    self
      .call(ApiRequest::new(HttpMethod::Post, "/auth/register").json(json!(form)))
      .await
  }

  pub async fn me(&self) -> Result<User> {
    self.call(ApiRequest::new(HttpMethod::Get, "/auth/me")).await
  }

  #[instrument(skip(self, update))]
  pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
    self
      .call(ApiRequest::new(HttpMethod::Put, "/auth/profile").json(json!(update)))
      .await
  }

  // --- catalog ---

  pub async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
    self
      .call(ApiRequest::new(HttpMethod::Get, "/products").query(filter.query_pairs()))
      .await
  }

  pub async fn product(&self, product_id: i64) -> Result<Product> {
    self
      .call(ApiRequest::new(HttpMethod::Get, format!("/products/{}", product_id)))
      .await
  }

  pub async fn categories(&self) -> Result<Vec<Category>> {
    self.call(ApiRequest::new(HttpMethod::Get, "/categories")).await
  }

  // --- cart ---

  pub async fn cart(&self) -> Result<Cart> {
    self.call(ApiRequest::new(HttpMethod::Get, "/cart")).await
  }

  #[instrument(skip(self))]
  pub async fn add_to_cart(&self, product_id: i64, quantity: u32) -> Result<Cart> {
    self
      .call(
        ApiRequest::new(HttpMethod::Post, "/cart/add").json(json!({ "productId": product_id, "quantity": quantity })),
      )
      .await
  }

  #[instrument(skip(self))]
  pub async fn update_cart_item(&self, product_id: i64, quantity: u32) -> Result<Cart> {
    self
      .call(
        ApiRequest::new(HttpMethod::Put, "/cart/update").json(json!({ "productId": product_id, "quantity": quantity })),
      )
      .await
  }

  #[instrument(skip(self))]
  pub async fn remove_from_cart(&self, product_id: i64) -> Result<Cart> {
    self
      .call(ApiRequest::new(HttpMethod::Delete, format!("/cart/remove/{}", product_id)))
      .await
  }

  pub async fn clear_cart(&self) -> Result<Cart> {
    self.call(ApiRequest::new(HttpMethod::Delete, "/cart/clear")).await
  }

  // --- orders ---

  /// Turns the server-side cart into an order. The backend may embed the
  /// cash QR or the PayNow URL in the returned order.
  #[instrument(skip(self))]
  pub async fn checkout(&self, payment_method: PaymentMethod) -> Result<Order> {
    self
      .call(ApiRequest::new(HttpMethod::Post, "/orders/checkout").json(json!({ "paymentMethod": payment_method })))
      .await
  }

  pub async fn orders(&self) -> Result<Vec<Order>> {
    self.call(ApiRequest::new(HttpMethod::Get, "/orders")).await
  }

  pub async fn order(&self, order_id: i64) -> Result<Order> {
    self
      .call(ApiRequest::new(HttpMethod::Get, format!("/orders/{}", order_id)))
      .await
  }

  pub async fn order_qr(&self, order_id: i64) -> Result<PaymentQr> {
    self
      .call(ApiRequest::new(HttpMethod::Get, format!("/orders/{}/qr", order_id)))
      .await
  }

  #[instrument(skip(self))]
  pub async fn regenerate_qr(&self, order_id: i64) -> Result<PaymentQr> {
    self
      .call(ApiRequest::new(HttpMethod::Post, format!("/orders/{}/qr/regenerate", order_id)))
      .await
  }

  #[instrument(skip(self))]
  pub async fn initiate_paynow(&self, order_id: i64) -> Result<PaynowSession> {
    self
      .call(ApiRequest::new(HttpMethod::Post, format!("/orders/{}/paynow", order_id)))
      .await
  }

  pub async fn payment_status(&self, order_id: i64) -> Result<PaymentStatus> {
    self
      .call(ApiRequest::new(HttpMethod::Get, format!("/orders/{}/payment-status", order_id)))
      .await
  }

  #[instrument(skip(self))]
  pub async fn cancel_order(&self, order_id: i64) -> Result<Order> {
    self
      .call(ApiRequest::new(HttpMethod::Patch, format!("/orders/{}/cancel", order_id)))
      .await
  }

  // --- admin ---

  pub async fn admin_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
    let query = status
      .map(|s| vec![("status".to_string(), s.to_string())])
      .unwrap_or_default();
    self
      .call(ApiRequest::new(HttpMethod::Get, "/admin/orders").query(query))
      .await
  }

  pub async fn admin_order(&self, order_id: i64) -> Result<Order> {
    self
      .call(ApiRequest::new(HttpMethod::Get, format!("/admin/orders/{}", order_id)))
      .await
  }

  #[instrument(skip(self))]
  pub async fn complete_order(&self, order_id: i64) -> Result<Order> {
    self
      .call(ApiRequest::new(HttpMethod::Patch, format!("/admin/orders/{}/complete", order_id)))
      .await
  }

  #[instrument(skip(self))]
  pub async fn reject_order(&self, order_id: i64, reason: &str) -> Result<Order> {
    self
      .call(
        ApiRequest::new(HttpMethod::Patch, format!("/admin/orders/{}/reject", order_id))
          .json(json!({ "reason": reason })),
      )
      .await
  }

  #[instrument(skip(self, draft), fields(name = %draft.name))]
  pub async fn create_product(&self, draft: &ProductDraft) -> Result<Product> {
    self
      .call(ApiRequest::new(HttpMethod::Post, "/admin/products").json(json!(draft)))
      .await
  }

  #[instrument(skip(self, draft))]
  pub async fn update_product(&self, product_id: i64, draft: &ProductDraft) -> Result<Product> {
    self
      .call(ApiRequest::new(HttpMethod::Put, format!("/admin/products/{}", product_id)).json(json!(draft)))
      .await
  }

  #[instrument(skip(self))]
  pub async fn delete_product(&self, product_id: i64) -> Result<()> {
    self
      .call(ApiRequest::new(HttpMethod::Delete, format!("/admin/products/{}", product_id)))
      .await
  }

  #[instrument(skip(self))]
  pub async fn set_stock(&self, product_id: i64, stock: u32) -> Result<Product> {
    self
      .call(
        ApiRequest::new(HttpMethod::Patch, format!("/admin/products/{}/stock", product_id))
          .json(json!({ "stock": stock })),
      )
      .await
  }

  #[instrument(skip(self, draft), fields(name = %draft.name))]
  pub async fn create_category(&self, draft: &CategoryDraft) -> Result<Category> {
    self
      .call(ApiRequest::new(HttpMethod::Post, "/admin/categories").json(json!(draft)))
      .await
  }

  #[instrument(skip(self, draft))]
  pub async fn update_category(&self, category_id: i64, draft: &CategoryDraft) -> Result<Category> {
    self
      .call(ApiRequest::new(HttpMethod::Put, format!("/admin/categories/{}", category_id)).json(json!(draft)))
      .await
  }

  #[instrument(skip(self))]
  pub async fn delete_category(&self, category_id: i64) -> Result<()> {
    self
      .call(ApiRequest::new(HttpMethod::Delete, format!("/admin/categories/{}", category_id)))
      .await
  }

  pub async fn customers(&self) -> Result<Vec<Customer>> {
    self.call(ApiRequest::new(HttpMethod::Get, "/admin/customers")).await
  }

  pub async fn analytics(&self) -> Result<AnalyticsOverview> {
    self.call(ApiRequest::new(HttpMethod::Get, "/admin/analytics")).await
  }

  pub async fn sales(&self, range_days: u32) -> Result<Vec<SalesPoint>> {
    self
      .call(
        ApiRequest::new(HttpMethod::Get, "/admin/analytics/sales")
          .query(vec![("days".to_string(), range_days.to_string())]),
      )
      .await
  }
}
