// core/src/session.rs

//! HMAC-SHA256 signed session tokens. The backend authenticates the user;
//! the storefront wraps the result in its own token so it can trust the
//! role and identity carried by a browser cookie.

use crate::error::{Result, TuckshopError};
use crate::models::{Role, User};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
  /// User id.
  pub sub: String,
  /// Sign-in id, kept across refreshes. Two devices of one user differ here.
  pub sid: String,
  pub role: Role,
  pub name: String,
  pub email: String,
  /// Backend access token forwarded as the bearer credential.
  pub api_token: String,
  pub iat: i64,
  pub exp: i64,
}

impl SessionClaims {
  pub fn user_id(&self) -> Result<i64> {
    self
      .sub
      .parse()
      .map_err(|_| TuckshopError::Session(format!("malformed subject '{}'", self.sub)))
  }

  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }

  pub fn expires_at(&self) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(self.exp, 0)
  }
}

/// A freshly issued token together with what it encodes.
#[derive(Debug, Clone)]
pub struct SignedSession {
  pub token: String,
  pub claims: SessionClaims,
}

#[derive(Clone)]
pub struct SessionSigner {
  encoding: EncodingKey,
  decoding: DecodingKey,
  ttl: Duration,
  refresh_window: Duration,
}

impl std::fmt::Debug for SessionSigner {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SessionSigner")
      .field("ttl", &self.ttl)
      .field("refresh_window", &self.refresh_window)
      .finish_non_exhaustive()
  }
}

impl SessionSigner {
  pub fn new(secret: &[u8], ttl: Duration, refresh_window: Duration) -> Result<Self> {
    if secret.is_empty() {
      return Err(TuckshopError::Config("session secret must not be empty".to_string()));
    }
    Ok(SessionSigner {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      ttl,
      refresh_window,
    })
  }

  pub fn issue(&self, user: &User, api_token: &str) -> Result<SignedSession> {
    self.issue_at(user, api_token, Utc::now())
  }

  pub fn issue_at(&self, user: &User, api_token: &str, now: DateTime<Utc>) -> Result<SignedSession> {
    let claims = SessionClaims {
      sub: user.id.to_string(),
      sid: Uuid::new_v4().to_string(),
      role: user.role,
      name: user.name.clone(),
      email: user.email.clone(),
      api_token: api_token.to_string(),
      iat: now.timestamp(),
      exp: (now + self.ttl).timestamp(),
    };
    self.sign(claims)
  }

  fn sign(&self, claims: SessionClaims) -> Result<SignedSession> {
    let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(|e| TuckshopError::Session(format!("signing failed: {}", e)))?;
    debug!(user_id = %claims.sub, exp = claims.exp, "Issued session token.");
    Ok(SignedSession { token, claims })
  }

  /// Checks signature and expiry. Any failure means the user must sign in again.
  pub fn verify(&self, token: &str) -> Result<SessionClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    decode::<SessionClaims>(token, &self.decoding, &validation)
      .map(|data| data.claims)
      .map_err(|e| {
        warn!(error = %e, "Rejected session token.");
        TuckshopError::Unauthorized(format!("invalid session: {}", e))
      })
  }

  pub fn needs_refresh(&self, claims: &SessionClaims, now: DateTime<Utc>) -> bool {
    claims.exp - now.timestamp() <= self.refresh_window.num_seconds()
  }

  /// Re-issues `claims` with a new expiry when inside the refresh window.
  /// Returns `None` when the current token is still comfortably valid.
  pub fn refresh(&self, claims: &SessionClaims, now: DateTime<Utc>) -> Result<Option<SignedSession>> {
    if claims.exp <= now.timestamp() {
      return Err(TuckshopError::Unauthorized("session expired".to_string()));
    }
    if !self.needs_refresh(claims, now) {
      return Ok(None);
    }
    self.reissue(claims, now).map(Some)
  }

  /// Signs `claims` again with a fresh lifetime, e.g. after a profile change.
  pub fn reissue(&self, claims: &SessionClaims, now: DateTime<Utc>) -> Result<SignedSession> {
    let mut next = claims.clone();
    next.iat = now.timestamp();
    next.exp = (now + self.ttl).timestamp();
    self.sign(next)
  }
}
