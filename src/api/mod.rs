//! HTTP command surface for the player.
//!
//! Lets a transcript view, a hotkey or plain `curl` drive playback:
//! play/pause, mute, seeking by stitched time, by fragment or by transcript
//! segment, and swapping in a new fragment list.

pub mod error;
pub mod routes;

use crate::config::ApiConfig;
use crate::player::PlayerHandle;
use anyhow::{Context, Result};
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tracing::info;

pub use routes::playback::PlaybackState;

pub struct ApiServer {
    host: String,
    port: u16,
    playback_state: PlaybackState,
}

impl ApiServer {
    pub fn new(player: PlayerHandle, config: &ApiConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            playback_state: PlaybackState { player },
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(service_info))
            .merge(routes::playback::router(self.playback_state.clone()))
    }

    pub async fn start(self) -> Result<()> {
        let app = self.router();
        let address = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .with_context(|| format!("Failed to bind API server to {}", address))?;

        info!("API server listening on http://{}", address);
        info!("Endpoints:");
        info!("  GET  /               - Service info");
        info!("  GET  /status         - Playback status");
        info!("  POST /toggle         - Play/pause");
        info!("  POST /mute           - Toggle mute");
        info!("  POST /seek           - Seek on the stitched timeline");
        info!("  POST /seek/fragment  - Seek inside a fragment");
        info!("  POST /seek/segment   - Seek to a transcript segment");
        info!("  PUT  /fragments      - Replace the fragment list");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "service": "segue",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}
