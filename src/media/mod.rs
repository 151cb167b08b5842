//! Media engine abstraction.
//!
//! The playback cursor drives exactly one engine. Engines are push-driven:
//! every state change comes back as an [`EngineEvent`] on a channel, tagged
//! with the [`LoadId`] of the load that produced it.

pub mod clock_engine;
pub mod probe;

use serde::Serialize;
use thiserror::Error;

pub use clock_engine::ClockEngine;
pub use probe::{SourceProbe, WavProbe};

/// Identity of one `load_source` call.
///
/// Each load gets a fresh id so events from a superseded load can be told
/// apart from events for the fragment that is loaded now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LoadId(pub u64);

impl LoadId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Lifecycle events reported by a media engine.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    MetadataReady { duration: f64 },
    CanPlay,
    Buffering,
    PlaybackStarted,
    Paused,
    TimeUpdate { time: f64 },
    Ended,
    Failed { reason: String },
}

impl MediaEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MetadataReady { .. } => "metadata_ready",
            Self::CanPlay => "can_play",
            Self::Buffering => "buffering",
            Self::PlaybackStarted => "playback_started",
            Self::Paused => "paused",
            Self::TimeUpdate { .. } => "time_update",
            Self::Ended => "ended",
            Self::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    pub load: LoadId,
    pub event: MediaEvent,
}

impl EngineEvent {
    pub fn new(load: LoadId, event: MediaEvent) -> Self {
        Self { load, event }
    }
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("playback rejected: {0}")]
    PlayRejected(String),
    #[error("source not available yet: {0}")]
    NotFound(String),
    #[error("failed to fetch {locator}: {reason}")]
    Fetch { locator: String, reason: String },
    #[error("cannot decode {locator}: {reason}")]
    Decode { locator: String, reason: String },
    #[error("media engine is no longer running")]
    EngineClosed,
}

/// The single streaming media resource behind the playback cursor.
///
/// Commands return immediately; their outcome arrives as events. Only
/// `play` can be refused synchronously (autoplay policies and the like).
pub trait MediaEngine: Send {
    fn load_source(&mut self, load: LoadId, locator: &str);

    fn play(&mut self) -> Result<(), MediaError>;

    fn pause(&mut self);

    fn set_physical_time(&mut self, time: f64);

    fn set_muted(&mut self, muted: bool);

    /// Stop all work and detach from the event channel.
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_id_next() {
        let first = LoadId::default();
        assert_eq!(first.next(), LoadId(1));
        assert!(first.next().next() > first.next());
    }

    #[test]
    fn test_media_event_as_str() {
        assert_eq!(MediaEvent::MetadataReady { duration: 1.0 }.as_str(), "metadata_ready");
        assert_eq!(MediaEvent::CanPlay.as_str(), "can_play");
        assert_eq!(MediaEvent::Ended.as_str(), "ended");
        assert_eq!(
            MediaEvent::Failed {
                reason: "x".to_string()
            }
            .as_str(),
            "failed"
        );
    }

    #[test]
    fn test_media_error_messages() {
        let err = MediaError::Fetch {
            locator: "https://rec.example/1.wav".to_string(),
            reason: "timed out".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to fetch https://rec.example/1.wav: timed out"
        );
        assert_eq!(
            MediaError::EngineClosed.to_string(),
            "media engine is no longer running"
        );
    }
}
