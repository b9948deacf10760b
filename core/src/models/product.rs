// core/src/models/product.rs

use super::category::CategorySummary;
use serde::{Deserialize, Serialize};

/// At or below this many units a product is `LOW`.
pub const LOW_STOCK_THRESHOLD: u32 = 5;
/// At or below this many units (and above `LOW_STOCK_THRESHOLD`) a product is `MEDIUM`.
pub const MEDIUM_STOCK_THRESHOLD: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StockLevel {
  Low,
  Medium,
  High,
}

impl StockLevel {
  pub fn from_stock(stock: u32) -> Self {
    if stock <= LOW_STOCK_THRESHOLD {
      StockLevel::Low
    } else if stock <= MEDIUM_STOCK_THRESHOLD {
      StockLevel::Medium
    } else {
      StockLevel::High
    }
  }
}

/// A catalog product. `stock_level` is always derived from `stock`,
/// whatever the backend sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ProductWire")]
pub struct Product {
  pub id: i64,
  pub name: String,
  pub description: Option<String>,
  pub price: f64,
  pub stock: u32,
  pub image_url: Option<String>,
  pub category_id: Option<i64>,
  pub category: Option<CategorySummary>,
  pub stock_level: StockLevel,
}

impl Product {
  pub fn set_stock(&mut self, stock: u32) {
    self.stock = stock;
    self.stock_level = StockLevel::from_stock(stock);
  }

  pub fn in_stock(&self) -> bool {
    self.stock > 0
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductWire {
  id: i64,
  name: String,
  #[serde(default)]
  description: Option<String>,
  price: f64,
  #[serde(default)]
  stock: u32,
  #[serde(default)]
  image_url: Option<String>,
  #[serde(default)]
  category_id: Option<i64>,
  #[serde(default)]
  category: Option<CategorySummary>,
}

impl From<ProductWire> for Product {
  fn from(wire: ProductWire) -> Self {
    Product {
      id: wire.id,
      name: wire.name,
      description: wire.description,
      price: wire.price,
      stock: wire.stock,
      image_url: wire.image_url,
      category_id: wire.category_id.or_else(|| wire.category.as_ref().map(|c| c.id)),
      category: wire.category,
      stock_level: StockLevel::from_stock(wire.stock),
    }
  }
}

/// Catalog listing filter; empty fields are omitted from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
  #[serde(default)]
  pub category_id: Option<i64>,
  #[serde(default)]
  pub search: Option<String>,
}

impl ProductFilter {
  pub fn query_pairs(&self) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Some(id) = self.category_id {
      pairs.push(("categoryId".to_string(), id.to_string()));
    }
    if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
      pairs.push(("search".to_string(), search.to_string()));
    }
    pairs
  }

  /// Parts appended to the products cache key.
  pub fn key_parts(&self) -> Vec<String> {
    self
      .query_pairs()
      .into_iter()
      .map(|(k, v)| format!("{}={}", k, v))
      .collect()
  }
}

/// Admin create/update payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub price: f64,
  pub stock: i64,
  pub category_id: i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image_url: Option<String>,
}
