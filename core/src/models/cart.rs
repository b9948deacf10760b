// core/src/models/cart.rs

use super::{round_money, Product};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
  pub product_id: i64,
  pub name: String,
  pub price: f64,
  pub quantity: u32,
  #[serde(default)]
  pub subtotal: f64,
  /// Units on the shelf when the line was last synced. Absent when the
  /// backend left it out; callers then ask the catalog.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stock: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image_url: Option<String>,
}

impl CartItem {
  pub fn from_product(product: &Product, quantity: u32) -> Self {
    CartItem {
      product_id: product.id,
      name: product.name.clone(),
      price: product.price,
      quantity,
      subtotal: round_money(product.price * f64::from(quantity)),
      stock: Some(product.stock),
      image_url: product.image_url.clone(),
    }
  }
}

/// A user's cart. Totals are derived from the line items and recomputed
/// after every mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
  #[serde(default, alias = "cartItems")]
  pub items: Vec<CartItem>,
  #[serde(default)]
  pub total_items: u32,
  #[serde(default)]
  pub total_amount: f64,
}

impl Cart {
  pub fn empty() -> Self {
    Cart::default()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn line(&self, product_id: i64) -> Option<&CartItem> {
    self.items.iter().find(|item| item.product_id == product_id)
  }

  pub fn quantity_of(&self, product_id: i64) -> u32 {
    self.line(product_id).map_or(0, |item| item.quantity)
  }

  pub fn recompute(&mut self) {
    for item in &mut self.items {
      item.subtotal = round_money(item.price * f64::from(item.quantity));
    }
    self.total_items = self.items.iter().map(|item| item.quantity).sum();
    self.total_amount = round_money(self.items.iter().map(|item| item.subtotal).sum());
  }

  /// Adds `quantity` units of `product`, merging with an existing line.
  pub fn add(&mut self, product: &Product, quantity: u32) {
    match self.items.iter_mut().find(|item| item.product_id == product.id) {
      Some(item) => {
        item.quantity += quantity;
        item.price = product.price;
        item.stock = Some(product.stock);
      }
      None => self.items.push(CartItem::from_product(product, quantity)),
    }
    self.recompute();
  }

  /// Sets a line's quantity; zero removes it. Returns false when the line is absent.
  pub fn set_quantity(&mut self, product_id: i64, quantity: u32) -> bool {
    if quantity == 0 {
      return self.remove(product_id);
    }
    let found = match self.items.iter_mut().find(|item| item.product_id == product_id) {
      Some(item) => {
        item.quantity = quantity;
        true
      }
      None => false,
    };
    self.recompute();
    found
  }

  pub fn remove(&mut self, product_id: i64) -> bool {
    let before = self.items.len();
    self.items.retain(|item| item.product_id != product_id);
    self.recompute();
    self.items.len() != before
  }

  pub fn clear(&mut self) {
    self.items.clear();
    self.recompute();
  }
}
