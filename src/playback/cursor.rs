//! The physical playback cursor.
//!
//! Owns the media engine outright. Only the transport controller holds a
//! cursor, so every command that reaches the engine goes through here.

use tracing::debug;

use crate::media::{LoadId, MediaEngine, MediaError};
use crate::timeline::mapper::clamp_time;

pub struct PlaybackCursor<E: MediaEngine> {
    engine: E,
    current_index: usize,
    physical_time: f64,
    physical_duration: Option<f64>,
    muted: bool,
    error_streak: u32,
    load: Option<LoadId>,
    last_load: LoadId,
    released: bool,
}

impl<E: MediaEngine> PlaybackCursor<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            current_index: 0,
            physical_time: 0.0,
            physical_duration: None,
            muted: false,
            error_streak: 0,
            load: None,
            last_load: LoadId::default(),
            released: false,
        }
    }

    /// Load fragment `index` from `locator`, replacing whatever was loaded.
    pub fn load(&mut self, index: usize, locator: &str) -> LoadId {
        let load = self.last_load.next();
        self.last_load = load;
        self.load = Some(load);
        self.current_index = index;
        self.physical_time = 0.0;
        self.physical_duration = None;
        debug!("Cursor loading fragment {} as {:?}", index, load);
        self.engine.load_source(load, locator);
        load
    }

    /// Forget the loaded source; events from earlier loads become stale.
    pub fn unload(&mut self) {
        self.engine.pause();
        self.load = None;
        self.current_index = 0;
        self.physical_time = 0.0;
        self.physical_duration = None;
    }

    pub fn is_current(&self, load: LoadId) -> bool {
        self.load == Some(load)
    }

    pub fn play(&mut self) -> Result<(), MediaError> {
        self.engine.play()
    }

    pub fn pause(&mut self) {
        self.engine.pause();
    }

    /// Move the engine to `time`, clamped to the loaded fragment's length.
    pub fn seek(&mut self, time: f64) {
        let mut time = clamp_time(time);
        if let Some(duration) = self.physical_duration {
            time = time.min(duration);
        }
        self.physical_time = time;
        self.engine.set_physical_time(time);
    }

    /// Show `time` as the position while a seek waits for metadata.
    pub fn set_pending_time(&mut self, time: f64) {
        self.physical_time = clamp_time(time);
    }

    pub fn observe_time(&mut self, time: f64) {
        self.physical_time = clamp_time(time);
    }

    pub fn observe_duration(&mut self, duration: f64) {
        if duration.is_finite() && duration > 0.0 {
            self.physical_duration = Some(duration);
        }
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.engine.set_muted(muted);
    }

    pub fn record_failure(&mut self) -> u32 {
        self.error_streak += 1;
        self.error_streak
    }

    pub fn reset_errors(&mut self) {
        self.error_streak = 0;
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn physical_time(&self) -> f64 {
        self.physical_time
    }

    pub fn physical_duration(&self) -> Option<f64> {
        self.physical_duration
    }

    /// Whether the position sits at the end of the loaded fragment.
    pub fn at_end(&self) -> bool {
        self.physical_duration
            .is_some_and(|duration| self.physical_time >= duration)
    }

    pub fn has_metadata(&self) -> bool {
        self.physical_duration.is_some()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn error_streak(&self) -> u32 {
        self.error_streak
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Release the media resource. Safe to call more than once.
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.load = None;
            self.engine.release();
        }
    }
}

impl<E: MediaEngine> Drop for PlaybackCursor<E> {
    fn drop(&mut self) {
        self.release();
    }
}
