// core/src/cart.rs

//! Cart mutations with optimistic mirroring of lines and totals.

use crate::cache::QueryKey;
use crate::error::{Result, TuckshopError};
use crate::models::Cart;
use crate::shop::Storefront;
use crate::validation::validate_quantity;
use std::future::Future;
use tracing::{debug, instrument, warn};

pub struct CartStore<'a> {
  shop: &'a Storefront,
}

impl<'a> CartStore<'a> {
  pub(crate) fn new(shop: &'a Storefront) -> Self {
    CartStore { shop }
  }

  pub async fn get(&self) -> Result<Cart> {
    let api = self.shop.api();
    self.shop.cache().fetch(QueryKey::cart(), || api.cart()).await
  }

  /// The cached cart even if stale; fetched only when nothing is cached.
  async fn current(&self) -> Result<Cart> {
    match self.shop.cache().get::<Cart>(&QueryKey::cart()) {
      Some(cart) => Ok(cart),
      None => self.get().await,
    }
  }

  fn reject_stock(&self, product_id: i64, requested: u32, available: u32) -> TuckshopError {
    let err = TuckshopError::InsufficientStock {
      product_id,
      requested,
      available,
    };
    self.shop.notifier().error(err.toast_message());
    err
  }

  #[instrument(skip(self))]
  pub async fn add_item(&self, product_id: i64, quantity: u32) -> Result<Cart> {
    validate_quantity(quantity)?;
    let cart = self.current().await?;
    let existing = cart.quantity_of(product_id);
    let requested = existing + quantity;

    let cart = match cart.line(product_id) {
      Some(line) => {
        let available = match line.stock {
          Some(stock) => stock,
          None => self.shop.catalog().product(product_id).await?.stock,
        };
        if requested > available {
          return Err(self.reject_stock(product_id, requested, available));
        }
        self
          .dispatch(
            move |c: &mut Cart| {
              c.set_quantity(product_id, requested);
            },
            self.shop.api().add_to_cart(product_id, quantity),
          )
          .await?
      }
      None => {
        let product = self.shop.catalog().product(product_id).await?;
        if requested > product.stock {
          return Err(self.reject_stock(product_id, requested, product.stock));
        }
        self
          .dispatch(
            move |c: &mut Cart| c.add(&product, quantity),
            self.shop.api().add_to_cart(product_id, quantity),
          )
          .await?
      }
    };
    self.shop.notifier().success("Added to cart.");
    Ok(cart)
  }

  /// Sets a line's quantity. Zero removes the line.
  #[instrument(skip(self))]
  pub async fn update_item(&self, product_id: i64, quantity: u32) -> Result<Cart> {
    if quantity == 0 {
      return self.remove_item(product_id).await;
    }
    let cart = self.current().await?;
    let available = match cart.line(product_id).and_then(|line| line.stock) {
      Some(stock) => stock,
      None => self.shop.catalog().product(product_id).await?.stock,
    };
    if quantity > available {
      return Err(self.reject_stock(product_id, quantity, available));
    }
    self
      .dispatch(
        move |c: &mut Cart| {
          c.set_quantity(product_id, quantity);
        },
        self.shop.api().update_cart_item(product_id, quantity),
      )
      .await
  }

  #[instrument(skip(self))]
  pub async fn remove_item(&self, product_id: i64) -> Result<Cart> {
    self
      .dispatch(
        move |c: &mut Cart| {
          c.remove(product_id);
        },
        self.shop.api().remove_from_cart(product_id),
      )
      .await
  }

  #[instrument(skip(self))]
  pub async fn clear(&self) -> Result<Cart> {
    self.dispatch(Cart::clear, self.shop.api().clear_cart()).await
  }

  /// Runs one optimistic cart mutation; on failure the previous cart is back
  /// in the cache and the user sees an error toast.
  async fn dispatch<A, Fut>(&self, apply: A, request: Fut) -> Result<Cart>
  where
    A: FnOnce(&mut Cart),
    Fut: Future<Output = Result<Cart>>,
  {
    match self.shop.cache().mutate(QueryKey::cart(), apply, request).await {
      Ok(cart) => {
        debug!(total_items = cart.total_items, total_amount = cart.total_amount, "Cart reconciled.");
        Ok(cart)
      }
      Err(err) => {
        warn!(error = %err, "Cart mutation failed, rolled back.");
        self.shop.notifier().error(err.toast_message());
        Err(err)
      }
    }
  }
}
