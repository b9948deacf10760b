// core/src/models/order.rs

use crate::error::{Result, TuckshopError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
  Cash,
  Paynow,
}

impl fmt::Display for PaymentMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PaymentMethod::Cash => write!(f, "CASH"),
      PaymentMethod::Paynow => write!(f, "PAYNOW"),
    }
  }
}

/// Order lifecycle.
///
/// ```text
/// PENDING ──► PAID ──► COMPLETED
///    │          │
///    ├──────────┴──► CANCELLED
///    └─────────────► COMPLETED   (cash, scanned at the counter)
/// ```
///
/// A PayNow order has to be PAID before it can be collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
  Pending,
  Paid,
  Completed,
  Cancelled,
}

impl OrderStatus {
  pub fn is_terminal(self) -> bool {
    matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
  }

  /// Whether `self -> next` is a legal move for an order paid by `method`.
  /// `COMPLETED -> COMPLETED` is accepted so repeated completions stay
  /// harmless.
  pub fn can_transition_to(self, method: PaymentMethod, next: OrderStatus) -> bool {
    use OrderStatus::*;
    match (self, next) {
      (Pending, Completed) => method == PaymentMethod::Cash,
      (Pending, Paid) | (Paid, Completed) | (Pending, Cancelled) | (Paid, Cancelled) | (Completed, Completed) => true,
      _ => false,
    }
  }

  pub fn ensure_transition(self, method: PaymentMethod, order_id: i64, next: OrderStatus) -> Result<()> {
    if self.can_transition_to(method, next) {
      Ok(())
    } else {
      Err(TuckshopError::InvalidTransition {
        order_id,
        from: self,
        to: next,
      })
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      OrderStatus::Pending => "PENDING",
      OrderStatus::Paid => "PAID",
      OrderStatus::Completed => "COMPLETED",
      OrderStatus::Cancelled => "CANCELLED",
    };
    write!(f, "{}", label)
  }
}

/// Immutable line copied from the cart at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
  pub product_id: i64,
  pub name: String,
  pub price: f64,
  pub quantity: u32,
  #[serde(default)]
  pub subtotal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQr {
  pub qr_code: String,
  #[serde(default)]
  pub expires_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub is_used: bool,
}

impl PaymentQr {
  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    self.expires_at.map_or(false, |at| at <= now)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCustomer {
  pub id: i64,
  pub name: String,
  pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: i64,
  #[serde(default)]
  pub order_number: Option<String>,
  #[serde(default)]
  pub user_id: Option<i64>,
  pub status: OrderStatus,
  #[serde(alias = "paymentType")]
  pub payment_method: PaymentMethod,
  pub total_amount: f64,
  #[serde(default, alias = "orderItems")]
  pub items: Vec<OrderItem>,
  #[serde(default, alias = "paymentQR", skip_serializing_if = "Option::is_none")]
  pub qr: Option<PaymentQr>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub payment_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub customer: Option<OrderCustomer>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub updated_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub paid_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
  pub fn display_number(&self) -> String {
    self.order_number.clone().unwrap_or_else(|| format!("#{}", self.id))
  }

  pub fn ensure_transition(&self, next: OrderStatus) -> Result<()> {
    self.status.ensure_transition(self.payment_method, self.id, next)
  }
}

/// What the customer sees right after checkout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
  pub order: Order,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub qr: Option<PaymentQr>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub payment_url: Option<String>,
  /// The order was placed but its QR or PayNow session is not ready yet.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub payment_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaynowSession {
  #[serde(alias = "url", alias = "checkoutUrl")]
  pub payment_url: String,
}

/// Result of the lightweight payment poll endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatus {
  pub order_id: i64,
  pub status: OrderStatus,
  #[serde(alias = "paymentType")]
  pub payment_method: PaymentMethod,
  #[serde(default)]
  pub paid_at: Option<DateTime<Utc>>,
}

/// The content of an order QR code as scanned at the counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
  pub order_id: i64,
  #[serde(default)]
  pub order_number: Option<String>,
  #[serde(alias = "paymentType")]
  pub payment_method: PaymentMethod,
  #[serde(default)]
  pub total_amount: f64,
  #[serde(default)]
  pub expires_at: Option<DateTime<Utc>>,
}

impl QrPayload {
  pub fn decode(raw: &str) -> Result<Self> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
      return Err(TuckshopError::InvalidQr("empty payload".to_string()));
    }
    serde_json::from_str(trimmed).map_err(|e| TuckshopError::InvalidQr(e.to_string()))
  }

  pub fn encode(&self) -> Result<String> {
    Ok(serde_json::to_string(self)?)
  }

  /// Cash codes carry an expiry; PayNow pickup codes never expire.
  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    self.payment_method == PaymentMethod::Cash && self.expires_at.map_or(false, |at| at <= now)
  }
}
