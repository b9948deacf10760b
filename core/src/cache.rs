// core/src/cache.rs

//! Request-keyed cache of backend responses.
//!
//! Entries are type-erased and looked up by [`QueryKey`]. Each key family has
//! its own stale time ([`StalePolicy`]). Optimistic mutations snapshot the
//! entry, apply a local change, and either keep the server's answer or roll
//! back. A per-key generation counter lets a mutation cancel in-flight
//! refetches so their (older) responses are discarded instead of clobbering
//! the optimistic value.

use crate::error::Result;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Hierarchical cache key such as `products/categoryId=3` or `admin/orders/42`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
  pub fn new<I, S>(parts: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    QueryKey(parts.into_iter().map(Into::into).collect())
  }

  pub fn root(root: &str) -> Self {
    QueryKey(vec![root.to_string()])
  }

  pub fn with(mut self, part: impl ToString) -> Self {
    self.0.push(part.to_string());
    self
  }

  pub fn parts(&self) -> &[String] {
    &self.0
  }

  /// Whether `self` equals `prefix` or lies underneath it.
  pub fn starts_with(&self, prefix: &QueryKey) -> bool {
    self.0.len() >= prefix.0.len() && self.0.iter().zip(&prefix.0).all(|(a, b)| a == b)
  }

  pub fn products() -> Self {
    QueryKey::root("products")
  }

  pub fn product(product_id: i64) -> Self {
    QueryKey::root("products").with("id").with(product_id)
  }

  pub fn categories() -> Self {
    QueryKey::root("categories")
  }

  pub fn cart() -> Self {
    QueryKey::root("cart")
  }

  pub fn orders() -> Self {
    QueryKey::root("orders")
  }

  pub fn order(order_id: i64) -> Self {
    QueryKey::root("orders").with(order_id)
  }

  pub fn order_qr(order_id: i64) -> Self {
    QueryKey::root("orders").with(order_id).with("qr")
  }

  pub fn admin_orders() -> Self {
    QueryKey::new(["admin", "orders"])
  }

  pub fn customers() -> Self {
    QueryKey::new(["admin", "customers"])
  }

  pub fn analytics() -> Self {
    QueryKey::new(["admin", "analytics"])
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0.join("/"))
  }
}

/// How long each key family stays fresh.
#[derive(Debug, Clone)]
pub struct StalePolicy {
  pub catalog: Duration,
  pub cart: Duration,
  pub orders: Duration,
  pub admin: Duration,
  pub analytics: Duration,
}

impl Default for StalePolicy {
  fn default() -> Self {
    StalePolicy {
      catalog: Duration::from_secs(5 * 60),
      cart: Duration::from_secs(60),
      orders: Duration::from_secs(30),
      admin: Duration::from_secs(10),
      analytics: Duration::from_secs(5 * 60),
    }
  }
}

impl StalePolicy {
  pub fn stale_time(&self, key: &QueryKey) -> Duration {
    let parts = key.parts();
    match (parts.first().map(String::as_str), parts.get(1).map(String::as_str)) {
      (Some("products"), _) | (Some("categories"), _) => self.catalog,
      (Some("cart"), _) => self.cart,
      (Some("orders"), _) => self.orders,
      (Some("admin"), Some("customers")) | (Some("admin"), Some("analytics")) => self.analytics,
      _ => self.admin,
    }
  }
}

#[derive(Clone)]
struct Entry {
  value: Arc<dyn Any + Send + Sync>,
  fetched_at: Instant,
  invalidated: bool,
}

/// A saved entry (or its absence) to roll back to.
#[derive(Clone)]
pub struct Snapshot {
  key: QueryKey,
  entry: Option<Entry>,
}

impl Snapshot {
  pub fn key(&self) -> &QueryKey {
    &self.key
  }
}

#[derive(Default)]
struct Inner {
  entries: HashMap<QueryKey, Entry>,
  generations: HashMap<QueryKey, u64>,
}

pub struct QueryCache {
  inner: Mutex<Inner>,
  policy: StalePolicy,
}

impl fmt::Debug for QueryCache {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueryCache")
      .field("entries", &self.len())
      .field("policy", &self.policy)
      .finish()
  }
}

impl Default for QueryCache {
  fn default() -> Self {
    QueryCache::new(StalePolicy::default())
  }
}

impl QueryCache {
  pub fn new(policy: StalePolicy) -> Self {
    QueryCache {
      inner: Mutex::new(Inner::default()),
      policy,
    }
  }

  pub fn policy(&self) -> &StalePolicy {
    &self.policy
  }

  pub fn len(&self) -> usize {
    self.inner.lock().entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// The cached value regardless of freshness.
  pub fn get<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
    let inner = self.inner.lock();
    inner.entries.get(key)?.value.downcast_ref::<T>().cloned()
  }

  /// The cached value only while it is fresh and not invalidated.
  pub fn get_fresh<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
    let stale_time = self.policy.stale_time(key);
    let inner = self.inner.lock();
    let entry = inner.entries.get(key)?;
    if entry.invalidated || entry.fetched_at.elapsed() >= stale_time {
      return None;
    }
    entry.value.downcast_ref::<T>().cloned()
  }

  pub fn is_stale(&self, key: &QueryKey) -> bool {
    let stale_time = self.policy.stale_time(key);
    let inner = self.inner.lock();
    inner
      .entries
      .get(key)
      .map_or(true, |e| e.invalidated || e.fetched_at.elapsed() >= stale_time)
  }

  pub fn set<T: Send + Sync + 'static>(&self, key: QueryKey, value: T) {
    trace!(key = %key, "Cache set.");
    self.inner.lock().entries.insert(
      key,
      Entry {
        value: Arc::new(value),
        fetched_at: Instant::now(),
        invalidated: false,
      },
    );
  }

  /// Generation of `key`, recorded when a fetch starts.
  pub fn generation(&self, key: &QueryKey) -> u64 {
    *self.inner.lock().generations.entry(key.clone()).or_insert(0)
  }

  /// Stores `value` only if no cancellation happened since `generation` was read.
  pub fn commit<T: Send + Sync + 'static>(&self, key: QueryKey, generation: u64, value: T) -> bool {
    let mut inner = self.inner.lock();
    if inner.generations.get(&key).copied().unwrap_or(0) != generation {
      debug!(key = %key, "Discarding response from a cancelled fetch.");
      return false;
    }
    inner.entries.insert(
      key,
      Entry {
        value: Arc::new(value),
        fetched_at: Instant::now(),
        invalidated: false,
      },
    );
    true
  }

  /// Cancels in-flight fetches for every key under `prefix`.
  pub fn cancel(&self, prefix: &QueryKey) {
    let mut inner = self.inner.lock();
    inner.generations.entry(prefix.clone()).or_insert(0);
    for (key, generation) in inner.generations.iter_mut() {
      if key.starts_with(prefix) {
        *generation += 1;
      }
    }
  }

  /// Returns the fresh cached value, or runs `fetcher` and caches its result.
  pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    if let Some(hit) = self.get_fresh::<T>(&key) {
      trace!(key = %key, "Cache hit.");
      return Ok(hit);
    }
    let generation = self.generation(&key);
    let value = fetcher().await?;
    self.commit(key, generation, value.clone());
    Ok(value)
  }

  pub fn snapshot(&self, key: &QueryKey) -> Snapshot {
    Snapshot {
      key: key.clone(),
      entry: self.inner.lock().entries.get(key).cloned(),
    }
  }

  pub fn restore(&self, snapshot: Snapshot) {
    debug!(key = %snapshot.key, "Restoring cache snapshot.");
    let mut inner = self.inner.lock();
    match snapshot.entry {
      Some(entry) => {
        inner.entries.insert(snapshot.key, entry);
      }
      None => {
        inner.entries.remove(&snapshot.key);
      }
    }
  }

  /// Patches the cached value in place. Returns whether an entry of type `T` existed.
  pub fn update<T, F>(&self, key: &QueryKey, f: F) -> bool
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce(&mut T),
  {
    let mut inner = self.inner.lock();
    let Some(entry) = inner.entries.get_mut(key) else {
      return false;
    };
    let Some(current) = entry.value.downcast_ref::<T>() else {
      return false;
    };
    let mut next = current.clone();
    f(&mut next);
    entry.value = Arc::new(next);
    true
  }

  /// Patches every entry of type `T` under `prefix`. Returns how many changed.
  pub fn update_all<T, F>(&self, prefix: &QueryKey, mut f: F) -> usize
  where
    T: Clone + Send + Sync + 'static,
    F: FnMut(&mut T),
  {
    let mut inner = self.inner.lock();
    let mut patched = 0;
    for (key, entry) in inner.entries.iter_mut() {
      if !key.starts_with(prefix) {
        continue;
      }
      if let Some(current) = entry.value.downcast_ref::<T>() {
        let mut next = current.clone();
        f(&mut next);
        entry.value = Arc::new(next);
        patched += 1;
      }
    }
    patched
  }

  /// Marks every entry under `prefix` stale so the next read refetches.
  /// Fetches already in flight for those keys are cancelled: their
  /// responses predate the change and must not land as fresh.
  pub fn invalidate(&self, prefix: &QueryKey) -> usize {
    let mut inner = self.inner.lock();
    for (key, generation) in inner.generations.iter_mut() {
      if key.starts_with(prefix) {
        *generation += 1;
      }
    }
    let mut count = 0;
    for (key, entry) in inner.entries.iter_mut() {
      if key.starts_with(prefix) {
        entry.invalidated = true;
        count += 1;
      }
    }
    debug!(prefix = %prefix, count, "Invalidated queries.");
    count
  }

  pub fn clear(&self) {
    let mut inner = self.inner.lock();
    inner.entries.clear();
    for generation in inner.generations.values_mut() {
      *generation += 1;
    }
  }

  /// Optimistic mutation of the entry at `key`.
  ///
  /// Cancels in-flight fetches, snapshots the entry, applies `optimistic` to
  /// the cached value (when one exists), then awaits `request`. On success the
  /// server's value replaces the optimistic one; on failure the snapshot is
  /// restored and the error returned.
  pub async fn mutate<T, A, Fut>(&self, key: QueryKey, optimistic: A, request: Fut) -> Result<T>
  where
    T: Clone + Send + Sync + 'static,
    A: FnOnce(&mut T),
    Fut: Future<Output = Result<T>>,
  {
    self.cancel(&key);
    let snapshot = self.snapshot(&key);
    let applied = self.update::<T, _>(&key, optimistic);
    trace!(key = %key, applied, "Applied optimistic update.");

    match request.await {
      Ok(value) => {
        self.set(key, value.clone());
        Ok(value)
      }
      Err(err) => {
        self.restore(snapshot);
        Err(err)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::TuckshopError;

  #[test]
  fn prefix_matching() {
    let key = QueryKey::order(5);
    assert!(key.starts_with(&QueryKey::orders()));
    assert!(key.starts_with(&key));
    assert!(!QueryKey::orders().starts_with(&key));
    assert!(!QueryKey::admin_orders().starts_with(&QueryKey::orders()));
    assert_eq!(QueryKey::order_qr(5).to_string(), "orders/5/qr");
  }

  #[test]
  fn stale_times_follow_key_family() {
    let policy = StalePolicy::default();
    assert_eq!(policy.stale_time(&QueryKey::product(1)), policy.catalog);
    assert_eq!(policy.stale_time(&QueryKey::categories()), policy.catalog);
    assert_eq!(policy.stale_time(&QueryKey::admin_orders().with(3)), policy.admin);
    assert_eq!(policy.stale_time(&QueryKey::analytics().with("sales")), policy.analytics);
  }

  #[test]
  fn invalidate_marks_stale_but_keeps_value() {
    let cache = QueryCache::default();
    cache.set(QueryKey::products().with("search=pie"), vec![1, 2]);
    cache.set(QueryKey::cart(), 9u32);
    assert_eq!(cache.invalidate(&QueryKey::products()), 1);
    assert!(cache.is_stale(&QueryKey::products().with("search=pie")));
    assert_eq!(cache.get::<Vec<i32>>(&QueryKey::products().with("search=pie")), Some(vec![1, 2]));
    assert_eq!(cache.get_fresh::<u32>(&QueryKey::cart()), Some(9));
  }

  #[test]
  fn commit_after_cancel_is_discarded() {
    let cache = QueryCache::default();
    let generation = cache.generation(&QueryKey::cart());
    cache.cancel(&QueryKey::cart());
    assert!(!cache.commit(QueryKey::cart(), generation, 1u32));
    assert!(cache.get::<u32>(&QueryKey::cart()).is_none());
  }

  #[test]
  fn invalidate_cancels_in_flight_fetches_under_prefix() {
    let cache = QueryCache::default();
    let product = QueryKey::product(4);
    let cart = QueryKey::cart();
    let product_generation = cache.generation(&product);
    let cart_generation = cache.generation(&cart);
    cache.invalidate(&QueryKey::products());
    assert!(!cache.commit(product.clone(), product_generation, 10u32));
    assert!(cache.get::<u32>(&product).is_none());
    assert!(cache.commit(cart, cart_generation, 1u32));
  }

  #[test]
  fn wrong_type_is_a_miss() {
    let cache = QueryCache::default();
    cache.set(QueryKey::cart(), "text".to_string());
    assert!(cache.get::<u32>(&QueryKey::cart()).is_none());
  }

  #[tokio::test]
  async fn fetch_uses_fresh_entry() {
    let cache = QueryCache::default();
    cache.set(QueryKey::categories(), 3u32);
    let value = cache
      .fetch(QueryKey::categories(), || async { Ok::<u32, TuckshopError>(4) })
      .await
      .unwrap();
    assert_eq!(value, 3);
  }

  #[tokio::test]
  async fn fetch_refetches_when_stale() {
    let cache = QueryCache::new(StalePolicy {
      catalog: Duration::ZERO,
      ..StalePolicy::default()
    });
    cache.set(QueryKey::categories(), 3u32);
    let value = cache
      .fetch(QueryKey::categories(), || async { Ok::<u32, TuckshopError>(4) })
      .await
      .unwrap();
    assert_eq!(value, 4);
  }

  #[tokio::test]
  async fn failed_mutation_rolls_back() {
    let cache = QueryCache::default();
    cache.set(QueryKey::cart(), vec![1u32]);
    let result = cache
      .mutate(QueryKey::cart(), |items: &mut Vec<u32>| items.push(2), async {
        Err::<Vec<u32>, _>(TuckshopError::Unavailable("down".into()))
      })
      .await;
    assert!(result.is_err());
    assert_eq!(cache.get::<Vec<u32>>(&QueryKey::cart()), Some(vec![1]));
  }

  #[tokio::test]
  async fn successful_mutation_keeps_server_value() {
    let cache = QueryCache::default();
    cache.set(QueryKey::cart(), vec![1u32]);
    let value = cache
      .mutate(QueryKey::cart(), |items: &mut Vec<u32>| items.push(2), async {
        Ok::<_, TuckshopError>(vec![1u32, 2, 3])
      })
      .await
      .unwrap();
    assert_eq!(value, vec![1, 2, 3]);
    assert_eq!(cache.get::<Vec<u32>>(&QueryKey::cart()), Some(vec![1, 2, 3]));
  }
}
