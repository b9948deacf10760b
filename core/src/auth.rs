// core/src/auth.rs

//! Sign-in, registration and profile changes. Credentials are checked by the
//! backend; on success the user gets a signed storefront session.

use crate::api::ApiClient;
use crate::error::{Result, TuckshopError};
use crate::flow::{Flow, FlowControl, Shared};
use crate::models::{AuthGrant, Cart, Credentials, ProfileUpdate, RegisterForm, User};
use crate::session::{SessionSigner, SignedSession};
use crate::shop::Storefront;
use crate::validation::{validate_credentials, validate_profile, validate_registration};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// A successful sign-in or registration.
#[derive(Debug, Clone)]
pub struct Authenticated {
  pub user: User,
  pub session: SignedSession,
  /// The user's cart, fetched while signing in so the first page is warm.
  pub cart: Option<Cart>,
}

#[derive(Clone)]
struct AuthCtx {
  api: ApiClient,
  signer: Arc<SessionSigner>,
  credentials: Option<Credentials>,
  form: Option<RegisterForm>,
  grant: Option<AuthGrant>,
  session: Option<SignedSession>,
  cart: Option<Cart>,
}

impl AuthCtx {
  fn new(api: ApiClient, signer: Arc<SessionSigner>) -> Self {
    AuthCtx {
      api,
      signer,
      credentials: None,
      form: None,
      grant: None,
      session: None,
      cart: None,
    }
  }

  fn finish(self) -> Result<Authenticated> {
    match (self.grant, self.session) {
      (Some(grant), Some(session)) => Ok(Authenticated {
        user: grant.user,
        session,
        cart: self.cart,
      }),
      _ => Err(TuckshopError::Internal("authentication finished without a session".to_string())),
    }
  }
}

async fn issue_session(ctx: Shared<AuthCtx>) -> Result<FlowControl> {
  let session = {
    let c = ctx.read();
    let grant = c
      .grant
      .as_ref()
      .ok_or_else(|| TuckshopError::Internal("no backend grant".to_string()))?;
    c.signer.issue(&grant.user, &grant.token)?
  };
  info!(user_id = %session.claims.sub, role = %session.claims.role, "Session issued.");
  ctx.write().session = Some(session);
  Ok(FlowControl::Continue)
}

fn sign_in_flow() -> Result<Flow<AuthCtx, TuckshopError>> {
  let mut flow = Flow::new(
    "sign_in",
    &[
      ("validate", false, None),
      ("authenticate", false, None),
      ("issue_session", false, None),
      ("warm_cart", true, None),
    ],
  );

  flow.on("validate", |ctx: Shared<AuthCtx>| async move {
    let c = ctx.read();
    let credentials = c
      .credentials
      .as_ref()
      .ok_or_else(|| TuckshopError::Internal("sign-in without credentials".to_string()))?;
    validate_credentials(credentials)?;
    Ok::<_, TuckshopError>(FlowControl::Continue)
  })?;

  flow.on("authenticate", |ctx: Shared<AuthCtx>| async move {
    let (api, credentials) = {
      let c = ctx.read();
      (c.api.clone(), c.credentials.clone())
    };
    let credentials = credentials.ok_or_else(|| TuckshopError::Internal("sign-in without credentials".to_string()))?;
    let grant = api.login(&credentials).await?;
    ctx.write().grant = Some(grant);
    Ok::<_, TuckshopError>(FlowControl::Continue)
  })?;

  flow.on("issue_session", issue_session)?;

  flow.on("warm_cart", |ctx: Shared<AuthCtx>| async move {
    let api = {
      let c = ctx.read();
      match &c.grant {
        Some(grant) => c.api.with_token(grant.token.clone()),
        None => return Ok(FlowControl::Continue),
      }
    };
    let cart = api.cart().await?;
    ctx.write().cart = Some(cart);
    Ok::<_, TuckshopError>(FlowControl::Continue)
  })?;

  Ok(flow)
}

fn register_flow() -> Result<Flow<AuthCtx, TuckshopError>> {
  let mut flow = Flow::new(
    "register",
    &[
      ("validate", false, None),
      ("create_account", false, None),
      ("issue_session", false, None),
    ],
  );

  flow.on("validate", |ctx: Shared<AuthCtx>| async move {
    let c = ctx.read();
    let form = c
      .form
      .as_ref()
      .ok_or_else(|| TuckshopError::Internal("registration without a form".to_string()))?;
    validate_registration(form)?;
    Ok::<_, TuckshopError>(FlowControl::Continue)
  })?;

  flow.on("create_account", |ctx: Shared<AuthCtx>| async move {
    let (api, form) = {
      let c = ctx.read();
      (c.api.clone(), c.form.clone())
    };
    let form = form.ok_or_else(|| TuckshopError::Internal("registration without a form".to_string()))?;
    let grant = api.register(&form).await?;
    info!(user_id = grant.user.id, "Account created.");
    ctx.write().grant = Some(grant);
    Ok::<_, TuckshopError>(FlowControl::Continue)
  })?;

  flow.on("issue_session", issue_session)?;

  Ok(flow)
}

/// Runs the sign-in and registration flows against an unauthenticated client.
pub struct Authenticator {
  api: ApiClient,
  signer: Arc<SessionSigner>,
  sign_in: Flow<AuthCtx, TuckshopError>,
  register: Flow<AuthCtx, TuckshopError>,
}

impl Authenticator {
  pub fn new(api: ApiClient, signer: Arc<SessionSigner>) -> Result<Self> {
    Ok(Authenticator {
      api,
      signer,
      sign_in: sign_in_flow()?,
      register: register_flow()?,
    })
  }

  pub fn signer(&self) -> &Arc<SessionSigner> {
    &self.signer
  }

  #[instrument(skip(self, credentials), fields(email = %credentials.email))]
  pub async fn sign_in(&self, credentials: Credentials) -> Result<Authenticated> {
    let mut ctx = AuthCtx::new(self.api.clone(), self.signer.clone());
    ctx.credentials = Some(Credentials {
      email: credentials.email.trim().to_string(),
      password: credentials.password,
    });
    let state = Shared::new(ctx);
    self.sign_in.run(state.clone()).await.map_err(|err| {
      warn!(error = %err, "Sign-in failed.");
      err
    })?;
    state.into_inner().finish()
  }

  #[instrument(skip(self, form), fields(email = %form.email))]
  pub async fn register(&self, form: RegisterForm) -> Result<Authenticated> {
    let mut ctx = AuthCtx::new(self.api.clone(), self.signer.clone());
    ctx.form = Some(RegisterForm {
      name: form.name.trim().to_string(),
      email: form.email.trim().to_string(),
      ..form
    });
    let state = Shared::new(ctx);
    self.register.run(state.clone()).await?;
    state.into_inner().finish()
  }

  /// Validates and applies a profile change, then re-signs the session so it
  /// carries the new name and email.
  #[instrument(skip(self, shop, update))]
  pub async fn update_profile(&self, shop: &Storefront, update: &ProfileUpdate) -> Result<(User, SignedSession)> {
    validate_profile(update)?;
    let claims = shop
      .session()
      .ok_or_else(|| TuckshopError::Unauthorized("not signed in".to_string()))?;
    let user = shop.api().update_profile(update).await?;

    let mut next = claims.clone();
    next.name = user.name.clone();
    next.email = user.email.clone();
    let session = self.signer.reissue(&next, Utc::now())?;
    shop.notifier().success("Profile updated.");
    Ok((user, session))
  }
}
