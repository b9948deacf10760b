// storefront/src/web/responses.rs

use crate::web::extractors::CurrentSession;
use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use chrono::Utc;
use serde::Serialize;
use tuckshop::api::Envelope;
use tuckshop::SignedSession;

pub const SESSION_COOKIE: &str = "tuckshop_session";

/// Where the browser is sent when its session is no longer valid.
pub const LOGIN_PATH: &str = "/login";

/// The signed session as an HttpOnly cookie living as long as the token.
pub fn session_cookie(session: &SignedSession, secure: bool) -> Cookie<'static> {
  let max_age = (session.claims.exp - Utc::now().timestamp()).max(0);
  Cookie::build(SESSION_COOKIE, session.token.clone())
    .path("/")
    .http_only(true)
    .secure(secure)
    .same_site(SameSite::Lax)
    .max_age(CookieDuration::seconds(max_age))
    .finish()
}

pub fn removal_cookie() -> Cookie<'static> {
  Cookie::build(SESSION_COOKIE, "")
    .path("/")
    .http_only(true)
    .max_age(CookieDuration::ZERO)
    .finish()
}

/// Envelope response; attaches the refreshed session cookie when the
/// extractor re-signed the token on the way in.
pub fn reply<T: Serialize>(
  status: StatusCode,
  session: Option<&CurrentSession>,
  message: &str,
  data: T,
) -> HttpResponse {
  let mut builder = HttpResponse::build(status);
  if let Some(cookie) = session.and_then(|s| s.refreshed_cookie.clone()) {
    builder.cookie(cookie);
  }
  builder.json(Envelope::ok(message, data))
}

pub fn ok<T: Serialize>(session: &CurrentSession, message: &str, data: T) -> HttpResponse {
  reply(StatusCode::OK, Some(session), message, data)
}

pub fn created<T: Serialize>(session: &CurrentSession, message: &str, data: T) -> HttpResponse {
  reply(StatusCode::CREATED, Some(session), message, data)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tuckshop::models::Role;
  use tuckshop::SessionClaims;

  #[test]
  fn session_cookie_is_http_only_and_scoped_to_root() {
    let session = SignedSession {
      token: "signed".to_string(),
      claims: SessionClaims {
        sub: "1".to_string(),
        sid: "s1".to_string(),
        role: Role::Customer,
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        api_token: "backend".to_string(),
        iat: Utc::now().timestamp(),
        exp: Utc::now().timestamp() + 3600,
      },
    };
    let cookie = session_cookie(&session, true);
    assert_eq!(cookie.name(), SESSION_COOKIE);
    assert_eq!(cookie.value(), "signed");
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.path(), Some("/"));
    assert!(cookie.max_age().is_some_and(|age| age.whole_seconds() > 3500));
  }

  #[test]
  fn removal_cookie_expires_immediately() {
    let cookie = removal_cookie();
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(CookieDuration::ZERO));
  }
}
