// storefront/src/services/session_registry.rs

//! Keeps one `Storefront` per signed-in session so its cache, toasts and
//! event listener survive across requests. Entries are keyed by the session
//! id of the token, so each device of a user gets its own, and are evicted
//! once the token expires or the session goes idle.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};
use tuckshop::models::Cart;
use tuckshop::{ApiClient, EventSource, QueryKey, RealtimeListener, SessionClaims, ShopSettings, SignedSession, Storefront};

struct SessionEntry {
  shop: Arc<Storefront>,
  listener: Option<JoinHandle<()>>,
  /// Signed session token the event listener connects with.
  token: Arc<RwLock<String>>,
  expires_at: AtomicI64,
  last_seen: AtomicI64,
}

impl SessionEntry {
  /// The entry was opened for the same backend token.
  fn matches(&self, claims: &SessionClaims) -> bool {
    self
      .shop
      .session()
      .is_some_and(|current| current.api_token == claims.api_token)
  }

  /// Records a request made with `session`, adopting a re-signed token.
  fn touch(&self, session: &SignedSession, now: i64) {
    self.last_seen.store(now, Ordering::Relaxed);
    self.expires_at.fetch_max(session.claims.exp, Ordering::Relaxed);
    if *self.token.read() != session.token {
      *self.token.write() = session.token.clone();
    }
  }

  fn is_expired(&self, now: i64, idle_secs: i64) -> bool {
    self.expires_at.load(Ordering::Relaxed) <= now || self.last_seen.load(Ordering::Relaxed) + idle_secs <= now
  }

  fn close(self) {
    if let Some(listener) = self.listener {
      listener.abort();
    }
  }
}

pub struct SessionRegistry {
  api: ApiClient,
  settings: Arc<ShopSettings>,
  events: Option<Arc<dyn EventSource>>,
  idle_secs: i64,
  guest: Arc<Storefront>,
  entries: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
  /// `events` is `None` when server push is disabled. Sessions without a
  /// request for `idle_secs` are dropped by `sweep`.
  pub fn new(
    api: ApiClient,
    settings: Arc<ShopSettings>,
    events: Option<Arc<dyn EventSource>>,
    idle_secs: i64,
  ) -> Self {
    let guest = Arc::new(Storefront::new(api.clone(), settings.clone()));
    SessionRegistry {
      api,
      settings,
      events,
      idle_secs,
      guest,
      entries: RwLock::new(HashMap::new()),
    }
  }

  /// Shared storefront for anonymous catalog browsing.
  pub fn guest(&self) -> Arc<Storefront> {
    self.guest.clone()
  }

  #[cfg(test)]
  pub(crate) fn len(&self) -> usize {
    self.entries.read().len()
  }

  /// Returns the session's storefront, opening a fresh one when none exists
  /// or the backend token changed since it was opened.
  pub fn get_or_create(&self, session: &SignedSession) -> Arc<Storefront> {
    let now = Utc::now().timestamp();
    let claims = &session.claims;
    if let Some(entry) = self.entries.read().get(&claims.sid) {
      if entry.matches(claims) {
        entry.touch(session, now);
        return entry.shop.clone();
      }
    }

    let mut entries = self.entries.write();
    if let Some(entry) = entries.get(&claims.sid) {
      if entry.matches(claims) {
        entry.touch(session, now);
        return entry.shop.clone();
      }
    }

    let shop = Arc::new(Storefront::for_session(&self.api, claims.clone(), self.settings.clone()));
    let token = Arc::new(RwLock::new(session.token.clone()));
    let listener = self
      .events
      .as_ref()
      .map(|events| RealtimeListener::with_shared_token(&shop, events.clone(), token.clone()).spawn());
    let entry = SessionEntry {
      shop: shop.clone(),
      listener,
      token,
      expires_at: AtomicI64::new(claims.exp),
      last_seen: AtomicI64::new(now),
    };
    if let Some(previous) = entries.insert(claims.sid.clone(), entry) {
      debug!(user = %claims.sub, session = %claims.sid, "Replacing outdated session storefront.");
      previous.close();
    }
    info!(user = %claims.sub, session = %claims.sid, sessions = entries.len(), "Session storefront opened.");
    shop
  }

  /// Opens a fresh storefront for `session`, e.g. right after sign-in or a
  /// profile change, seeding `cart` when one is known.
  #[instrument(name = "SessionRegistry::open", skip(self, session, cart), fields(user = %session.claims.sub))]
  pub fn open(&self, session: &SignedSession, cart: Option<Cart>) -> Arc<Storefront> {
    self.remove(&session.claims.sid);
    let shop = self.get_or_create(session);
    if let Some(cart) = cart {
      shop.cache().set(QueryKey::cart(), cart);
    }
    shop
  }

  /// Drops the session's storefront and stops its event listener.
  pub fn remove(&self, sid: &str) -> bool {
    match self.entries.write().remove(sid) {
      Some(entry) => {
        entry.close();
        info!(session = %sid, "Session storefront closed.");
        true
      }
      None => false,
    }
  }

  /// Evicts sessions whose token expired or that saw no request for the
  /// idle timeout. Returns how many were dropped.
  pub fn sweep(&self, now: i64) -> usize {
    let mut entries = self.entries.write();
    let expired: Vec<String> = entries
      .iter()
      .filter(|(_, entry)| entry.is_expired(now, self.idle_secs))
      .map(|(sid, _)| sid.clone())
      .collect();
    for sid in &expired {
      if let Some(entry) = entries.remove(sid) {
        entry.close();
      }
    }
    if !expired.is_empty() {
      info!(evicted = expired.len(), remaining = entries.len(), "Evicted idle sessions.");
    }
    expired.len()
  }
}
