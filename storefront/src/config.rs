// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tuckshop::{SessionSigner, ShopSettings};

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub api_base_url: String,

  // Session cookie
  pub session_secret: String,
  pub session_ttl_secs: i64,
  pub session_refresh_secs: i64,
  pub session_idle_secs: i64,
  pub session_sweep_secs: u64,
  pub cookie_secure: bool,

  // Payment paths
  pub cash_qr_ttl_secs: i64,
  pub payment_poll_interval_ms: u64,
  pub payment_poll_attempts: u32,
  pub complete_retry_base_ms: u64,

  pub request_timeout_secs: u64,

  // Server push
  pub realtime_enabled: bool,
  pub realtime_reconnect_secs: u64,
}

fn parse<T>(name: &str, raw: Option<String>, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match raw {
    Some(value) => value
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e))),
    None => Ok(default),
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source; `from_env` passes the process environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let server_host = get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parse("SERVER_PORT", get("SERVER_PORT"), 8080u16)?;
    let api_base_url = get("API_BASE_URL").unwrap_or_else(|| "http://127.0.0.1:5000/api".to_string());

    let session_secret = get("SESSION_SECRET")
      .ok_or_else(|| AppError::Config("Missing environment variable 'SESSION_SECRET'".to_string()))?;
    if session_secret.len() < 16 {
      return Err(AppError::Config("SESSION_SECRET must be at least 16 characters".to_string()));
    }

    let config = Self {
      server_host,
      server_port,
      api_base_url,
      session_secret,
      session_ttl_secs: parse("SESSION_TTL_SECS", get("SESSION_TTL_SECS"), 7 * 24 * 3600)?,
      session_refresh_secs: parse("SESSION_REFRESH_SECS", get("SESSION_REFRESH_SECS"), 24 * 3600)?,
      session_idle_secs: parse("SESSION_IDLE_SECS", get("SESSION_IDLE_SECS"), 30 * 60)?,
      session_sweep_secs: parse("SESSION_SWEEP_SECS", get("SESSION_SWEEP_SECS"), 60)?,
      cookie_secure: parse("COOKIE_SECURE", get("COOKIE_SECURE"), false)?,
      cash_qr_ttl_secs: parse("CASH_QR_TTL_SECS", get("CASH_QR_TTL_SECS"), 15 * 60)?,
      payment_poll_interval_ms: parse("PAYMENT_POLL_INTERVAL_MS", get("PAYMENT_POLL_INTERVAL_MS"), 3000)?,
      payment_poll_attempts: parse("PAYMENT_POLL_ATTEMPTS", get("PAYMENT_POLL_ATTEMPTS"), 40)?,
      complete_retry_base_ms: parse("COMPLETE_RETRY_BASE_MS", get("COMPLETE_RETRY_BASE_MS"), 500)?,
      request_timeout_secs: parse("REQUEST_TIMEOUT_SECS", get("REQUEST_TIMEOUT_SECS"), 15)?,
      realtime_enabled: parse("REALTIME_ENABLED", get("REALTIME_ENABLED"), true)?,
      realtime_reconnect_secs: parse("REALTIME_RECONNECT_SECS", get("REALTIME_RECONNECT_SECS"), 5)?,
    };

    if config.session_refresh_secs >= config.session_ttl_secs {
      return Err(AppError::Config(
        "SESSION_REFRESH_SECS must be shorter than SESSION_TTL_SECS".to_string(),
      ));
    }

    tracing::info!(api_base_url = %config.api_base_url, "Application configuration loaded successfully.");
    Ok(config)
  }

  pub fn shop_settings(&self) -> ShopSettings {
    ShopSettings {
      cash_qr_ttl: chrono::Duration::seconds(self.cash_qr_ttl_secs),
      payment_poll_interval: Duration::from_millis(self.payment_poll_interval_ms),
      payment_poll_attempts: self.payment_poll_attempts,
      complete_retry_base: Duration::from_millis(self.complete_retry_base_ms),
      realtime_reconnect: Duration::from_secs(self.realtime_reconnect_secs),
      ..ShopSettings::default()
    }
  }

  pub fn session_signer(&self) -> Result<SessionSigner> {
    Ok(SessionSigner::new(
      self.session_secret.as_bytes(),
      chrono::Duration::seconds(self.session_ttl_secs),
      chrono::Duration::seconds(self.session_refresh_secs),
    )?)
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }

  pub fn session_sweep_interval(&self) -> Duration {
    Duration::from_secs(self.session_sweep_secs.max(1))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |name| map.get(name).cloned()
  }

  #[test]
  fn defaults_apply_when_only_secret_is_set() {
    let config = AppConfig::from_lookup(lookup(&[("SESSION_SECRET", "0123456789abcdef")])).unwrap();
    assert_eq!(config.server_port, 8080);
    assert_eq!(config.cash_qr_ttl_secs, 900);
    assert!(config.realtime_enabled);
    assert_eq!(config.session_idle_secs, 1800);
    assert_eq!(config.shop_settings().complete_attempts, 3);
  }

  #[test]
  fn missing_or_short_secret_is_rejected() {
    assert!(matches!(AppConfig::from_lookup(lookup(&[])), Err(AppError::Config(_))));
    assert!(matches!(
      AppConfig::from_lookup(lookup(&[("SESSION_SECRET", "short")])),
      Err(AppError::Config(_))
    ));
  }

  #[test]
  fn malformed_numbers_name_the_variable() {
    let err = AppConfig::from_lookup(lookup(&[
      ("SESSION_SECRET", "0123456789abcdef"),
      ("SERVER_PORT", "eighty"),
    ]))
    .unwrap_err();
    assert!(err.to_string().contains("SERVER_PORT"));
  }
}
