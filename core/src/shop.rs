// core/src/shop.rs

//! The per-session context every operation runs against.

use crate::admin::AdminDesk;
use crate::api::ApiClient;
use crate::cache::{QueryCache, StalePolicy};
use crate::cart::CartStore;
use crate::catalog::Catalog;
use crate::notify::Notifier;
use crate::orders::Orders;
use crate::session::SessionClaims;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Tunables for one storefront. Environment-agnostic; the server fills it from config.
#[derive(Debug, Clone)]
pub struct ShopSettings {
  pub cash_qr_ttl: chrono::Duration,
  pub payment_poll_interval: Duration,
  pub payment_poll_attempts: u32,
  pub complete_attempts: u32,
  pub complete_retry_base: Duration,
  pub realtime_reconnect: Duration,
  pub toast_capacity: usize,
  pub stale: StalePolicy,
}

impl Default for ShopSettings {
  fn default() -> Self {
    ShopSettings {
      cash_qr_ttl: chrono::Duration::minutes(15),
      payment_poll_interval: Duration::from_secs(3),
      payment_poll_attempts: 40,
      complete_attempts: 3,
      complete_retry_base: Duration::from_millis(500),
      realtime_reconnect: Duration::from_secs(5),
      toast_capacity: 64,
      stale: StalePolicy::default(),
    }
  }
}

/// What the user is currently looking at. Decides whether order events
/// refresh order queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "view", content = "id")]
pub enum View {
  #[default]
  Catalog,
  Cart,
  Checkout,
  Orders,
  OrderDetail(i64),
  Profile,
  AdminOrders,
  AdminOrderDetail(i64),
  AdminScan,
  AdminInventory,
  AdminCustomers,
  AdminAnalytics,
}

impl View {
  pub fn is_order_related(self) -> bool {
    matches!(
      self,
      View::Checkout
        | View::Orders
        | View::OrderDetail(_)
        | View::AdminOrders
        | View::AdminOrderDetail(_)
        | View::AdminScan
    )
  }
}

/// One signed-in (or anonymous) user's view of the shop: an API client bound
/// to their token, their query cache, and their toast channel.
pub struct Storefront {
  api: ApiClient,
  cache: Arc<QueryCache>,
  notifier: Notifier,
  settings: Arc<ShopSettings>,
  session: Option<SessionClaims>,
  view: RwLock<View>,
}

impl std::fmt::Debug for Storefront {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Storefront")
      .field("user", &self.session.as_ref().map(|c| c.sub.as_str()))
      .field("view", &*self.view.read())
      .finish()
  }
}

impl Storefront {
  pub fn new(api: ApiClient, settings: Arc<ShopSettings>) -> Self {
    Storefront {
      api,
      cache: Arc::new(QueryCache::new(settings.stale.clone())),
      notifier: Notifier::new(settings.toast_capacity),
      settings,
      session: None,
      view: RwLock::new(View::default()),
    }
  }

  /// A storefront for a verified session; the API client carries its backend token.
  pub fn for_session(api: &ApiClient, claims: SessionClaims, settings: Arc<ShopSettings>) -> Self {
    let mut shop = Storefront::new(api.with_token(claims.api_token.clone()), settings);
    shop.session = Some(claims);
    shop
  }

  pub fn api(&self) -> &ApiClient {
    &self.api
  }

  pub fn cache(&self) -> &Arc<QueryCache> {
    &self.cache
  }

  pub fn notifier(&self) -> &Notifier {
    &self.notifier
  }

  pub fn settings(&self) -> &Arc<ShopSettings> {
    &self.settings
  }

  pub fn session(&self) -> Option<&SessionClaims> {
    self.session.as_ref()
  }

  pub fn view(&self) -> View {
    *self.view.read()
  }

  pub fn set_view(&self, view: View) {
    debug!(?view, "View changed.");
    *self.view.write() = view;
  }

  pub fn catalog(&self) -> Catalog<'_> {
    Catalog::new(self)
  }

  pub fn cart(&self) -> CartStore<'_> {
    CartStore::new(self)
  }

  pub fn orders(&self) -> Orders<'_> {
    Orders::new(self)
  }

  pub fn admin(&self) -> AdminDesk<'_> {
    AdminDesk::new(self)
  }
}
