// storefront/src/main.rs

mod config;
mod errors;
mod services;
mod state;
mod web;

use crate::config::AppConfig;
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tuckshop::{ApiClient, EventSource, HttpTransport};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting tuckshop storefront server...");

  let app_config = AppConfig::from_env().context("Failed to load application configuration")?;

  let transport = Arc::new(
    HttpTransport::new(&app_config.api_base_url, app_config.request_timeout())
      .context("Failed to build the backend HTTP client")?,
  );
  let api = ApiClient::new(transport.clone());
  let events: Arc<dyn EventSource> = transport;
  tracing::info!(backend = %app_config.api_base_url, realtime = app_config.realtime_enabled, "Backend client ready.");

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  let app_state = AppState::new(app_config, api, events).context("Failed to initialise application state")?;

  let sessions = app_state.sessions.clone();
  let sweep_every = app_state.config.session_sweep_interval();
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(sweep_every);
    loop {
      ticker.tick().await;
      sessions.sweep(chrono::Utc::now().timestamp());
    }
  });

  tracing::info!("Attempting to bind server to {}...", server_address);
  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("Failed to bind {}", server_address))?
  .run()
  .await
  .context("Server terminated with an error")
}
