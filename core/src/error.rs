// core/src/error.rs
use crate::flow::FlowError;
use crate::models::OrderStatus;
use std::collections::BTreeMap;
use thiserror::Error;

/// Field name to user-facing message, produced by form validation.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum TuckshopError {
  #[error("Validation failed: {}", summarize(.0))]
  Validation(FieldErrors),

  #[error("Only {available} left in stock for product {product_id} (requested {requested})")]
  InsufficientStock {
    product_id: i64,
    requested: u32,
    available: u32,
  },

  #[error("Unauthorized: {0}")]
  Unauthorized(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Not found: {0}")]
  NotFound(String),

  /// `message` is the backend's human readable text, `detail` its separate
  /// `error` field when that says something else.
  #[error("API error ({status}): {message}")]
  Api {
    status: u16,
    message: String,
    detail: Option<String>,
  },

  #[error("Order {order_id} cannot move from {from} to {to}")]
  InvalidTransition {
    order_id: i64,
    from: OrderStatus,
    to: OrderStatus,
  },

  #[error("QR code for order {order_id} has expired")]
  QrExpired { order_id: i64 },

  #[error("Invalid QR code: {0}")]
  InvalidQr(String),

  #[error("Order {order_id} was cancelled")]
  OrderCancelled { order_id: i64 },

  #[error("Payment for order {order_id} not confirmed after {attempts} checks")]
  PaymentTimeout { order_id: i64, attempts: u32 },

  #[error("Backend unavailable: {0}")]
  Unavailable(String),

  #[error("Transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("Malformed response: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("Session error: {0}")]
  Session(String),

  #[error(transparent)]
  Flow(#[from] FlowError),

  #[error("Configuration error: {0}")]
  Config(String),

  #[error("Internal error: {0}")]
  Internal(String),
}

fn summarize(fields: &FieldErrors) -> String {
  fields
    .iter()
    .map(|(field, msg)| format!("{}: {}", field, msg))
    .collect::<Vec<_>>()
    .join("; ")
}

impl TuckshopError {
  /// A validation error for a single field.
  pub fn field(name: &str, message: impl Into<String>) -> Self {
    let mut fields = FieldErrors::new();
    fields.insert(name.to_string(), message.into());
    TuckshopError::Validation(fields)
  }

  /// The backend rejected a completion because the order is already completed.
  /// Admin completion treats this as success.
  pub fn is_already_completed(&self) -> bool {
    match self {
      TuckshopError::Api { message, detail, .. } => std::iter::once(message)
        .chain(detail)
        .any(|text| text.to_ascii_lowercase().contains("already completed")),
      _ => false,
    }
  }

  /// Worth retrying: network failures, rate limiting and 5xx responses.
  pub fn is_transient(&self) -> bool {
    match self {
      TuckshopError::Unavailable(_) => true,
      TuckshopError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
      TuckshopError::Api { status, .. } => *status >= 500 || *status == 429,
      _ => false,
    }
  }

  /// The session is no longer valid and the user must sign in again.
  pub fn is_auth_failure(&self) -> bool {
    matches!(self, TuckshopError::Unauthorized(_))
  }

  /// Message suitable for a toast notification.
  pub fn toast_message(&self) -> String {
    match self {
      TuckshopError::Validation(fields) => fields
        .values()
        .next()
        .cloned()
        .unwrap_or_else(|| "Please check the highlighted fields.".to_string()),
      TuckshopError::InsufficientStock { available, .. } => {
        format!("Only {} left in stock.", available)
      }
      TuckshopError::Unauthorized(_) => "Your session has expired. Please sign in again.".to_string(),
      TuckshopError::Forbidden(_) => "You do not have access to this action.".to_string(),
      TuckshopError::NotFound(what) => format!("{} could not be found.", what),
      TuckshopError::Api { message, .. } => message.clone(),
      TuckshopError::InvalidTransition { to, .. } => format!("This order can no longer be marked {}.", to),
      TuckshopError::QrExpired { .. } => "This QR code has expired. Generate a new one.".to_string(),
      TuckshopError::InvalidQr(_) => "That QR code is not a valid order code.".to_string(),
      TuckshopError::OrderCancelled { .. } => "This order was cancelled.".to_string(),
      TuckshopError::PaymentTimeout { .. } => "Payment has not been confirmed yet.".to_string(),
      TuckshopError::Unavailable(_) | TuckshopError::Transport(_) => {
        "Could not reach the shop. Please try again.".to_string()
      }
      _ => "Something went wrong. Please try again.".to_string(),
    }
  }
}

pub type Result<T, E = TuckshopError> = std::result::Result<T, E>;
