// storefront/src/state.rs
use crate::config::AppConfig;
use crate::services::SessionRegistry;
use std::sync::Arc;
use tuckshop::{ApiClient, Authenticator, EventSource, SessionSigner};

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub signer: Arc<SessionSigner>,
  pub authenticator: Arc<Authenticator>,
  pub sessions: Arc<SessionRegistry>,
}

impl AppState {
  pub fn new(config: AppConfig, api: ApiClient, events: Arc<dyn EventSource>) -> crate::errors::Result<Self> {
    let config = Arc::new(config);
    let settings = Arc::new(config.shop_settings());
    let signer = Arc::new(config.session_signer()?);
    let authenticator = Arc::new(Authenticator::new(api.clone(), signer.clone())?);
    let realtime = config.realtime_enabled.then_some(events);
    // Per-session clients derive from the unauthenticated one.
    let sessions = Arc::new(SessionRegistry::new(api, settings, realtime, config.session_idle_secs));
    Ok(AppState {
      config,
      signer,
      authenticator,
      sessions,
    })
  }
}
