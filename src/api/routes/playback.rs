//! Transport control endpoints.
//!
//! - `GET  /status`         current playback snapshot
//! - `POST /toggle`         play/pause
//! - `POST /mute`           mute toggle
//! - `POST /seek`           seek on the stitched timeline
//! - `POST /seek/fragment`  seek inside one fragment
//! - `POST /seek/segment`   seek to a transcript segment
//! - `PUT  /fragments`      replace the fragment set

use crate::api::error::{validate_time, ApiError, ApiResult};
use crate::fragment::{Fragment, FragmentSet};
use crate::player::PlayerHandle;
use crate::playback::PlaybackSnapshot;
use crate::transcript::{self, TranscriptSegment};
use axum::{
    extract::State,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, info};

/// Time given to the player to apply a command before its status is read back.
const SETTLE_DELAY: Duration = Duration::from_millis(50);

#[derive(Clone)]
pub struct PlaybackState {
    pub player: PlayerHandle,
}

#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    pub time: f64,
}

#[derive(Debug, Deserialize)]
pub struct FragmentSeekRequest {
    pub index: usize,
    pub time: f64,
}

#[derive(Debug, Deserialize)]
pub struct FragmentsRequest {
    pub fragments: Vec<Fragment>,
}

pub fn router(state: PlaybackState) -> Router {
    Router::new()
        .route("/status", get(playback_status))
        .route("/toggle", post(toggle_play))
        .route("/mute", post(toggle_mute))
        .route("/seek", post(seek))
        .route("/seek/fragment", post(seek_fragment))
        .route("/seek/segment", post(seek_segment))
        .route("/fragments", put(replace_fragments))
        .with_state(state)
}

async fn playback_status(State(state): State<PlaybackState>) -> Json<PlaybackSnapshot> {
    Json(state.player.status().await)
}

async fn toggle_play(State(state): State<PlaybackState>) -> ApiResult<Json<Value>> {
    info!("Toggle play command received via API");
    state.player.toggle_play().await.map_err(log_send_failure)?;

    let status = settled_status(&state).await;
    Ok(Json(json!({
        "success": true,
        "phase": status.phase.as_str(),
        "is_playing": status.is_playing,
        "message": format!("Transport {}", status.phase.as_str()),
    })))
}

async fn toggle_mute(State(state): State<PlaybackState>) -> ApiResult<Json<Value>> {
    state.player.toggle_mute().await.map_err(log_send_failure)?;

    let status = settled_status(&state).await;
    Ok(Json(json!({
        "success": true,
        "is_muted": status.is_muted,
    })))
}

async fn seek(
    State(state): State<PlaybackState>,
    Json(req): Json<SeekRequest>,
) -> ApiResult<Json<Value>> {
    let time = validate_time("time", req.time)?;
    info!("Seek to {:.3}s received via API", time);

    state
        .player
        .seek_to_virtual_time(time)
        .await
        .map_err(log_send_failure)?;
    Ok(seek_response(settled_status(&state).await))
}

async fn seek_fragment(
    State(state): State<PlaybackState>,
    Json(req): Json<FragmentSeekRequest>,
) -> ApiResult<Json<Value>> {
    let time = validate_time("time", req.time)?;
    let fragment_count = state.player.status().await.fragment_count;
    if req.index >= fragment_count {
        return Err(ApiError::bad_request(format!(
            "Fragment {} out of range ({} fragments)",
            req.index, fragment_count
        )));
    }
    info!("Seek to fragment {} at {:.3}s received via API", req.index, time);

    state
        .player
        .seek_to_fragment(req.index, time)
        .await
        .map_err(log_send_failure)?;
    Ok(seek_response(settled_status(&state).await))
}

async fn seek_segment(
    State(state): State<PlaybackState>,
    Json(segment): Json<TranscriptSegment>,
) -> ApiResult<Json<Value>> {
    validate_time("start", segment.start)?;
    if let Some(fragment_start) = segment.fragment_start {
        validate_time("fragment_start", fragment_start)?;
    }

    let target = transcript::seek_target(&segment);
    info!("Transcript seek to {:?} ({:?})", target, segment.text);

    state.player.seek(target).await.map_err(log_send_failure)?;
    Ok(seek_response(settled_status(&state).await))
}

async fn replace_fragments(
    State(state): State<PlaybackState>,
    Json(req): Json<FragmentsRequest>,
) -> ApiResult<Json<Value>> {
    let fragments =
        FragmentSet::validated(req.fragments).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let count = fragments.len();

    state
        .player
        .replace_fragments(fragments)
        .await
        .map_err(log_send_failure)?;

    let status = settled_status(&state).await;
    Ok(Json(json!({
        "success": true,
        "fragment_count": count,
        "phase": status.phase.as_str(),
    })))
}

async fn settled_status(state: &PlaybackState) -> PlaybackSnapshot {
    tokio::time::sleep(SETTLE_DELAY).await;
    state.player.status().await
}

fn seek_response(status: PlaybackSnapshot) -> Json<Value> {
    Json(json!({
        "success": true,
        "phase": status.phase.as_str(),
        "current_fragment_index": status.current_fragment_index,
        "virtual_current_time": status.virtual_current_time,
        "pending_seek": status.pending_seek,
    }))
}

fn log_send_failure(err: anyhow::Error) -> ApiError {
    error!("Failed to send player command: {}", err);
    err.into()
}
