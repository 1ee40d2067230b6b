//! Inkroom Relay Server
//!
//! Relays canvas snapshots between clients in the same canvas room and serves
//! the canvas REST API.
//!
//! ## Protocol
//!
//! One JSON object per WebSocket text frame:
//! ```json
//! { "type": "joinCanvas", "canvasId": "…" }
//! { "type": "drawingUpdate", "canvasId": "…", "elements": [ … ] }
//! { "type": "leaveCanvas", "canvasId": "…" }
//! ```
//! The server answers with `loadCanvas`, `receiveDrawingUpdate`,
//! `unauthorized` or `error`.

mod auth;
mod config;
mod error;
mod routes;
mod state;
mod ws;

use config::{ServerConfig, TOKENS_ENV};
use state::AppState;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkroom_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    if config.tokens.is_empty() {
        warn!("No tokens configured; set {} to let clients in", TOKENS_ENV);
    }
    let state = Arc::new(AppState::new(config.tokens));
    let app = routes::router(state);

    info!("Inkroom relay server listening on {}", config.addr);
    info!("WebSocket endpoint: ws://{}/ws", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
