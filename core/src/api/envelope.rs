// core/src/api/envelope.rs

use super::transport::ApiResponse;
use crate::error::{Result, TuckshopError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{ success, message, data, error? }`, the backend's response convention.
/// The storefront server answers browsers in the same shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
  #[serde(default)]
  pub success: bool,
  #[serde(default)]
  pub message: String,
  pub data: Option<T>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl<T> Envelope<T> {
  pub fn ok(message: impl Into<String>, data: T) -> Self {
    Envelope {
      success: true,
      message: message.into(),
      data: Some(data),
      error: None,
    }
  }

  pub fn failure(message: impl Into<String>, error: Option<String>) -> Self {
    Envelope {
      success: false,
      message: message.into(),
      data: None,
      error,
    }
  }
}

/// Maps a raw backend response onto `T`, turning HTTP status and
/// `success: false` into the matching `TuckshopError`.
pub fn decode<T: DeserializeOwned>(response: ApiResponse) -> Result<T> {
  let ApiResponse { status, body } = response;

  let envelope: Envelope<Value> = match body {
    Value::Object(_) => serde_json::from_value(body)?,
    Value::String(text) => Envelope::failure(text, None),
    Value::Null => Envelope::failure(String::new(), None),
    other => Envelope::ok("", other),
  };

  let detail = envelope.error.clone().filter(|e| !e.is_empty());
  let reason = || {
    if envelope.message.is_empty() {
      detail.clone().unwrap_or_default()
    } else {
      envelope.message.clone()
    }
  };

  match status {
    401 => return Err(TuckshopError::Unauthorized(reason())),
    403 => return Err(TuckshopError::Forbidden(reason())),
    404 => return Err(TuckshopError::NotFound(reason())),
    _ => {}
  }

  if status >= 400 || (!envelope.success && status != 204) {
    let message = reason();
    return Err(TuckshopError::Api {
      status,
      detail: detail.filter(|d| *d != message),
      message: if message.is_empty() { format!("request failed with status {}", status) } else { message },
    });
  }

  let data = envelope.data.unwrap_or(Value::Null);
  Ok(serde_json::from_value(data)?)
}
