use crate::api::ApiServer;
use crate::config::Config;
use crate::fragment::FragmentSet;
use crate::media::{ClockEngine, WavProbe};
use crate::player::{self, PlayerHandle};
use crate::playback::{PlaybackObserver, TransportController};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Logs fragment switches as they happen.
struct FragmentLogger;

impl PlaybackObserver for FragmentLogger {
    fn on_fragment_change(&self, index: usize) {
        info!("Now on fragment {}", index);
    }

    fn on_virtual_time_update(&self, time: f64) {
        debug!("Position {:.3}s", time);
    }
}

/// Run the player and its HTTP surface until Ctrl-C.
pub async fn run_service(fragments: FragmentSet, port: Option<u16>) -> Result<()> {
    info!("Starting segue player");

    let config = Config::load()?;
    let (player, player_task) = start_player(&config, fragments)?;

    let mut api_server = ApiServer::new(player.clone(), &config.api);
    if let Some(port) = port {
        api_server = api_server.with_port(port);
    }
    let api_port = port.unwrap_or(config.api.port);
    tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            error!("API server failed: {:#}", e);
        }
    });

    info!("segue is ready!");
    info!(
        "Try: curl -X POST http://{}:{}/toggle",
        config.api.host, api_port
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");

    player.shutdown().await?;
    player_task.await.context("Player task panicked")?;

    Ok(())
}

fn start_player(
    config: &Config,
    fragments: FragmentSet,
) -> Result<(PlayerHandle, tokio::task::JoinHandle<()>)> {
    let probe = Arc::new(WavProbe::new(config.source.request_timeout())?);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let engine = ClockEngine::spawn(probe, config.playback.tick_interval(), events_tx);

    let mut controller =
        TransportController::new(engine, fragments, config.playback.retry_policy());
    controller.add_observer(Box::new(FragmentLogger));
    if config.playback.start_muted {
        controller.set_muted(true);
    }

    Ok(player::spawn(controller, events_rx))
}
