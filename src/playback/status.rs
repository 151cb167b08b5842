//! Transport phases and the derived playback snapshot.

use serde::{Deserialize, Serialize};

/// Phase of the transport state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportPhase {
    /// No fragments to play.
    Idle,
    /// A fragment is loading, or playback is stalled on buffering.
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    /// The active fragment failed; a reload is scheduled.
    Error,
}

impl TransportPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Ended => "ended",
            Self::Error => "error",
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading | Self::Error)
    }
}

/// A seek waiting for its fragment's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingSeek {
    pub index: usize,
    pub time: f64,
}

/// Everything a scrub bar or status endpoint renders, computed on demand
/// from the ledger and the cursor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub phase: TransportPhase,
    pub virtual_current_time: f64,
    pub total_virtual_duration: f64,
    pub current_fragment_index: usize,
    pub fragment_count: usize,
    pub physical_time: f64,
    pub is_playing: bool,
    pub is_loading: bool,
    pub is_muted: bool,
    /// Show a "preparing audio" hint instead of an error.
    pub is_preparing: bool,
    pub error_streak: u32,
    pub fragment_boundaries: Vec<f64>,
    pub pending_seek: Option<PendingSeek>,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            phase: TransportPhase::Idle,
            virtual_current_time: 0.0,
            total_virtual_duration: 0.0,
            current_fragment_index: 0,
            fragment_count: 0,
            physical_time: 0.0,
            is_playing: false,
            is_loading: false,
            is_muted: false,
            is_preparing: false,
            error_streak: 0,
            fragment_boundaries: Vec::new(),
            pending_seek: None,
        }
    }
}
