// storefront/src/web/handlers/auth_handlers.rs

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::CurrentSession;
use crate::web::responses::{self, removal_cookie, session_cookie};
use tuckshop::api::Envelope;
use tuckshop::models::{Cart, Credentials, ProfileUpdate, RegisterForm, User};
use tuckshop::{Authenticated, QueryKey, SignedSession, View};

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionBody {
  pub user: User,
  /// Same value as the cookie, for clients that send a bearer header instead.
  pub token: String,
  pub expires_at: i64,
}

impl SessionBody {
  fn new(user: User, session: &SignedSession) -> Self {
    SessionBody {
      user,
      token: session.token.clone(),
      expires_at: session.claims.exp,
    }
  }
}

fn signed_in(app_state: &AppState, status: StatusCode, message: &str, auth: Authenticated) -> HttpResponse {
  app_state.sessions.open(&auth.session, auth.cart);
  let cookie = session_cookie(&auth.session, app_state.config.cookie_secure);
  HttpResponse::build(status)
    .cookie(cookie)
    .json(Envelope::ok(message, SessionBody::new(auth.user, &auth.session)))
}

#[instrument(name = "handler::login", skip(app_state, payload), fields(email = %payload.email))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<Credentials>,
) -> Result<HttpResponse, AppError> {
  let auth = app_state.authenticator.sign_in(payload.into_inner()).await?;
  info!(user = %auth.user.id, role = %auth.user.role, "User signed in.");
  Ok(signed_in(&app_state, StatusCode::OK, "Signed in.", auth))
}

#[instrument(name = "handler::register", skip(app_state, payload), fields(email = %payload.email))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<RegisterForm>,
) -> Result<HttpResponse, AppError> {
  let auth = app_state.authenticator.register(payload.into_inner()).await?;
  info!(user = %auth.user.id, "Account created.");
  Ok(signed_in(&app_state, StatusCode::CREATED, "Account created.", auth))
}

/// Always succeeds; clears whatever session the browser holds.
#[instrument(name = "handler::logout", skip_all)]
pub async fn logout_handler(app_state: web::Data<AppState>, session: Option<CurrentSession>) -> HttpResponse {
  if let Some(session) = session {
    app_state.sessions.remove(session.session_id());
    info!(user = %session.user(), "User signed out.");
  }
  HttpResponse::Ok()
    .cookie(removal_cookie())
    .json(Envelope::ok("Signed out.", ()))
}

#[instrument(name = "handler::refresh", skip_all, fields(user = %session.user()))]
pub async fn refresh_handler(
  app_state: web::Data<AppState>,
  session: CurrentSession,
) -> Result<HttpResponse, AppError> {
  let renewed = app_state.signer.reissue(&session.claims, Utc::now())?;
  let user = session.shop.api().me().await?;
  app_state.sessions.get_or_create(&renewed);
  Ok(
    HttpResponse::Ok()
      .cookie(session_cookie(&renewed, app_state.config.cookie_secure))
      .json(Envelope::ok("Session refreshed.", SessionBody::new(user, &renewed))),
  )
}

#[instrument(name = "handler::me", skip_all, fields(user = %session.user()))]
pub async fn me_handler(session: CurrentSession) -> Result<HttpResponse, AppError> {
  let user = session.shop.api().me().await?;
  Ok(responses::ok(&session, "Current user.", user))
}

#[instrument(name = "handler::update_profile", skip_all, fields(user = %session.user()))]
pub async fn update_profile_handler(
  app_state: web::Data<AppState>,
  session: CurrentSession,
  payload: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, AppError> {
  session.shop.set_view(View::Profile);
  let (user, renewed) = app_state
    .authenticator
    .update_profile(&session.shop, &payload.into_inner())
    .await?;
  // Reopen under the new claims so later requests see the new name and email.
  let cart = session.shop.cache().get::<Cart>(&QueryKey::cart());
  app_state.sessions.open(&renewed, cart);
  Ok(
    HttpResponse::Ok()
      .cookie(session_cookie(&renewed, app_state.config.cookie_secure))
      .json(Envelope::ok("Profile updated.", SessionBody::new(user, &renewed))),
  )
}
