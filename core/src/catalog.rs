// core/src/catalog.rs

use crate::cache::QueryKey;
use crate::error::Result;
use crate::models::{Cart, Category, CategoryDraft, Product, ProductDraft, ProductFilter};
use crate::shop::Storefront;
use crate::validation::{validate_category, validate_product};
use tracing::{info, instrument};

/// Product and category queries, plus the admin inventory mutations.
pub struct Catalog<'a> {
  shop: &'a Storefront,
}

impl<'a> Catalog<'a> {
  pub(crate) fn new(shop: &'a Storefront) -> Self {
    Catalog { shop }
  }

  pub async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
    let key = QueryKey::new(std::iter::once("products".to_string()).chain(filter.key_parts()));
    let api = self.shop.api();
    self.shop.cache().fetch(key, || api.products(filter)).await
  }

  pub async fn product(&self, product_id: i64) -> Result<Product> {
    let api = self.shop.api();
    self
      .shop
      .cache()
      .fetch(QueryKey::product(product_id), || api.product(product_id))
      .await
  }

  pub async fn categories(&self) -> Result<Vec<Category>> {
    let api = self.shop.api();
    self.shop.cache().fetch(QueryKey::categories(), || api.categories()).await
  }

  /// Applies a pushed stock level to every cached copy of the product, then
  /// marks product queries stale.
  pub fn apply_stock_update(&self, product_id: i64, stock: u32) {
    let cache = self.shop.cache();
    cache.update::<Product, _>(&QueryKey::product(product_id), |p| p.set_stock(stock));
    cache.update_all::<Vec<Product>, _>(&QueryKey::products(), |list| {
      for product in list.iter_mut().filter(|p| p.id == product_id) {
        product.set_stock(stock);
      }
    });
    cache.update::<Cart, _>(&QueryKey::cart(), |cart| {
      for line in cart.items.iter_mut().filter(|l| l.product_id == product_id) {
        line.stock = Some(stock);
      }
    });
    cache.invalidate(&QueryKey::products());
  }

  fn after_inventory_change(&self) {
    let cache = self.shop.cache();
    cache.invalidate(&QueryKey::products());
    cache.invalidate(&QueryKey::categories());
    cache.invalidate(&QueryKey::analytics());
  }

  #[instrument(skip(self, draft), fields(name = %draft.name))]
  pub async fn create_product(&self, draft: &ProductDraft) -> Result<Product> {
    validate_product(draft)?;
    let product = self.shop.api().create_product(draft).await?;
    info!(product_id = product.id, "Product created.");
    self.after_inventory_change();
    self.shop.notifier().success(format!("{} added to the catalog.", product.name));
    Ok(product)
  }

  #[instrument(skip(self, draft))]
  pub async fn update_product(&self, product_id: i64, draft: &ProductDraft) -> Result<Product> {
    validate_product(draft)?;
    let product = self.shop.api().update_product(product_id, draft).await?;
    self.shop.cache().set(QueryKey::product(product_id), product.clone());
    self.after_inventory_change();
    Ok(product)
  }

  #[instrument(skip(self))]
  pub async fn delete_product(&self, product_id: i64) -> Result<()> {
    self.shop.api().delete_product(product_id).await?;
    info!(product_id, "Product deleted.");
    self.after_inventory_change();
    Ok(())
  }

  #[instrument(skip(self))]
  pub async fn set_stock(&self, product_id: i64, stock: u32) -> Result<Product> {
    let product = self.shop.api().set_stock(product_id, stock).await?;
    self.apply_stock_update(product_id, product.stock);
    self.shop.cache().invalidate(&QueryKey::analytics());
    Ok(product)
  }

  #[instrument(skip(self, draft), fields(name = %draft.name))]
  pub async fn create_category(&self, draft: &CategoryDraft) -> Result<Category> {
    validate_category(draft)?;
    let category = self.shop.api().create_category(draft).await?;
    self.shop.cache().invalidate(&QueryKey::categories());
    Ok(category)
  }

  #[instrument(skip(self, draft))]
  pub async fn update_category(&self, category_id: i64, draft: &CategoryDraft) -> Result<Category> {
    validate_category(draft)?;
    let category = self.shop.api().update_category(category_id, draft).await?;
    self.shop.cache().invalidate(&QueryKey::categories());
    self.shop.cache().invalidate(&QueryKey::products());
    Ok(category)
  }

  #[instrument(skip(self))]
  pub async fn delete_category(&self, category_id: i64) -> Result<()> {
    self.shop.api().delete_category(category_id).await?;
    self.shop.cache().invalidate(&QueryKey::categories());
    self.shop.cache().invalidate(&QueryKey::products());
    Ok(())
  }
}
