// core/src/models/mod.rs

//! Wire types exchanged with the backend. All use camelCase JSON.

pub mod admin;
pub mod cart;
pub mod category;
pub mod order;
pub mod product;
pub mod user;

pub use admin::{AnalyticsOverview, Customer, SalesPoint};
pub use cart::{Cart, CartItem};
pub use category::{Category, CategoryDraft, CategorySummary};
pub use order::{
  CheckoutReceipt, Order, OrderCustomer, OrderItem, OrderStatus, PaymentMethod, PaymentQr, PaymentStatus,
  PaynowSession, QrPayload,
};
pub use product::{Product, ProductDraft, ProductFilter, StockLevel};
pub use user::{AuthGrant, Credentials, ProfileUpdate, RegisterForm, Role, User};

/// Rounds a money amount to whole cents.
pub fn round_money(amount: f64) -> f64 {
  (amount * 100.0).round() / 100.0
}
