//! Codesplain · Code Explainer Backend
//!
//! - Axum HTTP API
//! - Optional model integration (via environment variables)
//! - PostgREST-style row store + GoTrue-style identity endpoint
//!
//! Important env variables:
//!   PORT            : u16 (default 3000)
//!   OPENAI_API_KEY  : enables model integration if present
//!   OPENAI_BASE_URL : default "https://api.openai.com/v1"
//!   OPENAI_MODEL    : default "gpt-4o-mini"
//!   STORE_URL       : default "http://localhost:54321"
//!   STORE_SERVICE_KEY  : service-role key for the store and identity endpoints
//!   CODESPLAIN_CONFIG_PATH : path to TOML config (prompt overrides)
//!   LOG_LEVEL       : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT      : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing::{info, instrument};

use codesplain_backend::config::AppConfig;
use codesplain_backend::routes::build_router;
use codesplain_backend::state::AppState;
use codesplain_backend::telemetry;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let cfg = AppConfig::from_env();
  let state = Arc::new(AppState::new(&cfg)?);
  let app = build_router(state);

  let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "codesplain_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  match tokio::signal::ctrl_c().await {
    Ok(()) => info!(target: "codesplain_backend", "Shutdown signal received"),
    Err(e) => {
      tracing::error!(target: "codesplain_backend", error = %e, "Failed to install Ctrl+C handler");
      std::future::pending::<()>().await;
    }
  }
}
