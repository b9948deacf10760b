// core/src/notify.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
  Info,
  Success,
  Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
  pub id: Uuid,
  pub level: ToastLevel,
  pub message: String,
  pub at: DateTime<Utc>,
}

impl Toast {
  pub fn new(level: ToastLevel, message: impl Into<String>) -> Self {
    Toast {
      id: Uuid::new_v4(),
      level,
      message: message.into(),
      at: Utc::now(),
    }
  }
}

/// Fan-out of user-facing notifications for one session.
/// Toasts sent while nobody listens are dropped.
#[derive(Debug, Clone)]
pub struct Notifier {
  sender: broadcast::Sender<Toast>,
}

impl Notifier {
  pub fn new(capacity: usize) -> Self {
    let (sender, _) = broadcast::channel(capacity.max(1));
    Notifier { sender }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
    self.sender.subscribe()
  }

  pub fn push(&self, toast: Toast) {
    debug!(level = ?toast.level, message = %toast.message, "Toast.");
    // No receivers is fine.
    let _ = self.sender.send(toast);
  }

  pub fn info(&self, message: impl Into<String>) {
    self.push(Toast::new(ToastLevel::Info, message));
  }

  pub fn success(&self, message: impl Into<String>) {
    self.push(Toast::new(ToastLevel::Success, message));
  }

  pub fn error(&self, message: impl Into<String>) {
    self.push(Toast::new(ToastLevel::Error, message));
  }
}

impl Default for Notifier {
  fn default() -> Self {
    Notifier::new(64)
  }
}
