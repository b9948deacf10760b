// storefront/src/web/extractors.rs

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::responses::{session_cookie, SESSION_COOKIE};
use actix_web::cookie::Cookie;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use chrono::Utc;
use futures_util::future::{ready, Ready};
use std::sync::Arc;
use tracing::{debug, warn};
use tuckshop::{SessionClaims, SignedSession, Storefront};

/// A verified session and the user's storefront.
///
/// The token comes from the session cookie, or from an
/// `Authorization: Bearer` header for non-browser clients. Tokens inside the
/// refresh window are re-signed and the new cookie rides on the response.
pub struct CurrentSession {
  pub claims: SessionClaims,
  pub shop: Arc<Storefront>,
  pub refreshed_cookie: Option<Cookie<'static>>,
}

impl CurrentSession {
  pub fn user(&self) -> &str {
    &self.claims.sub
  }

  /// Id of this sign-in; each device of a user has its own.
  pub fn session_id(&self) -> &str {
    &self.claims.sid
  }
}

fn session_token(req: &HttpRequest) -> Option<String> {
  if let Some(cookie) = req.cookie(SESSION_COOKIE) {
    if !cookie.value().is_empty() {
      return Some(cookie.value().to_string());
    }
  }
  req
    .headers()
    .get(AUTHORIZATION)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| value.strip_prefix("Bearer "))
    .map(|token| token.trim().to_string())
    .filter(|token| !token.is_empty())
}

fn extract(req: &HttpRequest) -> Result<CurrentSession, AppError> {
  let state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("application state is not configured".to_string()))?;

  let token = session_token(req).ok_or_else(|| AppError::Auth("not signed in".to_string()))?;
  let claims = state.signer.verify(&token)?;

  let refreshed = state.signer.refresh(&claims, Utc::now())?;
  let (session, refreshed_cookie) = match refreshed {
    Some(session) => {
      debug!(user = %session.claims.sub, "Session re-signed inside refresh window.");
      let cookie = session_cookie(&session, state.config.cookie_secure);
      (session, Some(cookie))
    }
    None => (SignedSession { token, claims }, None),
  };

  let shop = state.sessions.get_or_create(&session);
  Ok(CurrentSession {
    claims: session.claims,
    shop,
    refreshed_cookie,
  })
}

impl FromRequest for CurrentSession {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(extract(req))
  }
}

/// A session whose user holds the admin role.
pub struct AdminSession(pub CurrentSession);

impl std::ops::Deref for AdminSession {
  type Target = CurrentSession;

  fn deref(&self) -> &CurrentSession {
    &self.0
  }
}

impl FromRequest for AdminSession {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(extract(req).and_then(|session| {
      if session.claims.is_admin() {
        Ok(AdminSession(session))
      } else {
        warn!(user = %session.claims.sub, path = %req.path(), "Non-admin hit an admin route.");
        Err(AppError::Forbidden("Admin access required.".to_string()))
      }
    }))
  }
}
