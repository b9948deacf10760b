// storefront/src/errors.rs

use crate::web::responses::{removal_cookie, LOGIN_PATH};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use tuckshop::{FieldErrors, TuckshopError};

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {message}")]
  Validation { message: String, fields: FieldErrors },

  #[error("Bad Request: {0}")]
  BadRequest(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Upstream Error: {0}")]
  Upstream(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<TuckshopError> for AppError {
  fn from(err: TuckshopError) -> Self {
    let message = err.toast_message();
    match err {
      TuckshopError::Validation(fields) => AppError::Validation { message, fields },
      TuckshopError::InsufficientStock { .. }
      | TuckshopError::QrExpired { .. }
      | TuckshopError::InvalidQr(_)
      | TuckshopError::OrderCancelled { .. } => AppError::BadRequest(message),
      TuckshopError::Unauthorized(detail) | TuckshopError::Session(detail) => AppError::Auth(detail),
      TuckshopError::Forbidden(_) => AppError::Forbidden(message),
      TuckshopError::NotFound(_) => AppError::NotFound(message),
      TuckshopError::InvalidTransition { .. } => AppError::Conflict(message),
      TuckshopError::Api { status, message, .. } if (400..500).contains(&status) => AppError::BadRequest(message),
      TuckshopError::Api { .. }
      | TuckshopError::Unavailable(_)
      | TuckshopError::Transport(_)
      | TuckshopError::Decode(_)
      | TuckshopError::PaymentTimeout { .. } => AppError::Upstream(message),
      TuckshopError::Config(detail) => AppError::Config(detail),
      other => AppError::Internal(other.to_string()),
    }
  }
}

// Handlers and bootstrap code may bubble up opaque failures.
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<TuckshopError>() {
      Ok(shop_err) => AppError::from(shop_err),
      Err(err) => AppError::Internal(format!("{:#}", err)),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation { .. } | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
      AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, "Responding with error");
    }

    let mut builder = HttpResponse::build(status);
    match self {
      AppError::Validation { message, fields } => builder.json(json!({
        "success": false,
        "message": message,
        "error": "validation",
        "fields": fields,
      })),
      AppError::Auth(detail) => builder.cookie(removal_cookie()).json(json!({
        "success": false,
        "message": "Your session has expired. Please sign in again.",
        "error": detail,
        "redirect": LOGIN_PATH,
      })),
      AppError::Config(_) | AppError::Internal(_) => builder.json(json!({
        "success": false,
        "message": "An internal error occurred",
      })),
      AppError::BadRequest(m)
      | AppError::Forbidden(m)
      | AppError::NotFound(m)
      | AppError::Conflict(m)
      | AppError::Upstream(m) => builder.json(json!({ "success": false, "message": m })),
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
