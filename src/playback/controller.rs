//! Transport state machine.
//!
//! Reacts to caller commands and engine events, one at a time:
//! `Idle → Loading → Ready ⇄ Playing ⇄ Paused`, with `Error` reachable from
//! anywhere and `Ended` after the last fragment finishes.
//!
//! Switching fragments never blocks. The target position is parked in a
//! single pending-seek slot and applied when the new fragment reports its
//! metadata; a newer seek simply overwrites the slot.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::fragment::FragmentSet;
use crate::media::{EngineEvent, MediaEngine, MediaEvent};
use crate::timeline::{self, DurationLedger};

use super::commands::{PlaybackObserver, SeekCommands};
use super::cursor::PlaybackCursor;
use super::status::{PendingSeek, PlaybackSnapshot, TransportPhase};

/// Reload policy for failed streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    /// `None` keeps retrying for as long as the player lives.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(2000),
            max_attempts: None,
        }
    }
}

pub struct TransportController<E: MediaEngine> {
    fragments: FragmentSet,
    ledger: DurationLedger,
    cursor: PlaybackCursor<E>,
    phase: TransportPhase,
    pending_seek: Option<PendingSeek>,
    /// Start playing as soon as the loading fragment becomes playable.
    resume_on_ready: bool,
    /// Land in `Paused` rather than `Ready` once loading finishes.
    pause_on_ready: bool,
    retry: RetryPolicy,
    retry_at: Option<Instant>,
    observers: Vec<Box<dyn PlaybackObserver>>,
}

impl<E: MediaEngine> TransportController<E> {
    /// Take ownership of `engine` and start loading the first fragment.
    pub fn new(engine: E, fragments: FragmentSet, retry: RetryPolicy) -> Self {
        let mut controller = Self {
            ledger: DurationLedger::seeded(&fragments),
            fragments,
            cursor: PlaybackCursor::new(engine),
            phase: TransportPhase::Idle,
            pending_seek: None,
            resume_on_ready: false,
            pause_on_ready: false,
            retry,
            retry_at: None,
            observers: Vec::new(),
        };
        if let Some(source) = controller.fragments.source(0).map(str::to_owned) {
            controller.cursor.load(0, &source);
            controller.phase = TransportPhase::Loading;
        }
        controller
    }

    pub fn add_observer(&mut self, observer: Box<dyn PlaybackObserver>) {
        self.observers.push(observer);
    }

    /// Replace the fragment set, starting over at fragment 0, time 0.
    pub fn set_fragments(&mut self, fragments: FragmentSet) {
        info!("Fragment set replaced ({} fragments)", fragments.len());
        self.cancel_retry();
        self.pending_seek = None;
        self.resume_on_ready = false;
        self.pause_on_ready = false;
        self.cursor.reset_errors();
        self.ledger.seed(&fragments);
        self.fragments = fragments;

        match self.fragments.source(0).map(str::to_owned) {
            Some(source) => {
                self.cursor.load(0, &source);
                self.phase = TransportPhase::Loading;
                self.notify_fragment_change();
                self.notify_time();
            }
            None => {
                self.cursor.unload();
                self.phase = TransportPhase::Idle;
            }
        }
    }

    /// Play/pause toggle. Returns the phase after the toggle.
    pub fn toggle_play(&mut self) -> TransportPhase {
        match self.phase {
            TransportPhase::Ready | TransportPhase::Paused => self.start_playback(),
            TransportPhase::Playing => self.pause(),
            TransportPhase::Loading | TransportPhase::Error => {
                if self.resume_on_ready {
                    info!("Toggle while loading: holding paused");
                    self.resume_on_ready = false;
                    self.pause_on_ready = true;
                    self.cursor.pause();
                } else {
                    warn!(
                        "Toggle ignored while {}: nothing to pause",
                        self.phase.as_str()
                    );
                }
            }
            TransportPhase::Ended => {
                info!("Toggle after end: restarting from the beginning");
                self.resume_on_ready = true;
                self.seek_to_fragment(0, 0.0);
            }
            TransportPhase::Idle => debug!("Toggle ignored: no fragments"),
        }
        self.phase
    }

    pub fn toggle_mute(&mut self) -> bool {
        let muted = !self.cursor.is_muted();
        self.cursor.set_muted(muted);
        muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.cursor.set_muted(muted);
    }

    /// Feed one engine event into the state machine.
    pub fn handle_event(&mut self, event: EngineEvent) {
        if !self.cursor.is_current(event.load) {
            debug!(
                "Dropping stale {} for {:?}",
                event.event.as_str(),
                event.load
            );
            return;
        }

        match event.event {
            MediaEvent::MetadataReady { duration } => self.on_metadata(duration),
            MediaEvent::CanPlay => self.on_playable(),
            MediaEvent::Buffering => {
                if self.phase == TransportPhase::Playing {
                    debug!("Buffering fragment {}", self.cursor.current_index());
                    self.phase = TransportPhase::Loading;
                    self.resume_on_ready = true;
                }
            }
            MediaEvent::PlaybackStarted => {
                self.cancel_retry();
                self.cursor.reset_errors();
                self.resume_on_ready = false;
                self.phase = TransportPhase::Playing;
            }
            MediaEvent::Paused => {
                if self.phase == TransportPhase::Playing {
                    self.phase = TransportPhase::Paused;
                }
            }
            MediaEvent::TimeUpdate { time } => {
                if self.pending_seek.is_some() {
                    return;
                }
                self.cursor.observe_time(time);
                self.notify_time();
            }
            MediaEvent::Ended => self.on_fragment_ended(),
            MediaEvent::Failed { reason } => self.on_failure(&reason),
        }
    }

    /// When the scheduled reload is due, if one is.
    pub fn retry_deadline(&self) -> Option<Instant> {
        self.retry_at
    }

    /// Run the scheduled reload of the current fragment.
    pub fn retry_elapsed(&mut self) {
        if self.retry_at.take().is_none() {
            return;
        }

        let index = self.cursor.current_index();
        let Some(source) = self.fragments.source(index).map(str::to_owned) else {
            return;
        };

        let resume_at = self
            .pending_seek
            .filter(|pending| pending.index == index)
            .map_or(self.cursor.physical_time(), |pending| pending.time);

        info!(
            "Reloading fragment {} after failure (streak {})",
            index,
            self.cursor.error_streak()
        );
        self.cursor.load(index, &source);
        self.pending_seek = (resume_at > 0.0).then_some(PendingSeek {
            index,
            time: resume_at,
        });
        self.cursor.set_pending_time(resume_at);
        self.phase = TransportPhase::Loading;
    }

    /// Current derived state. Recomputed from the ledger and cursor on every
    /// call.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            phase: self.phase,
            virtual_current_time: self.virtual_current_time(),
            total_virtual_duration: self.total_virtual_duration(),
            current_fragment_index: self.cursor.current_index(),
            fragment_count: self.fragments.len(),
            physical_time: self.cursor.physical_time(),
            is_playing: self.phase == TransportPhase::Playing,
            is_loading: self.phase.is_loading(),
            is_muted: self.cursor.is_muted(),
            is_preparing: self.cursor.error_streak() > 0,
            error_streak: self.cursor.error_streak(),
            fragment_boundaries: self.ledger.boundaries(),
            pending_seek: self.pending_seek,
        }
    }

    pub fn virtual_current_time(&self) -> f64 {
        timeline::to_virtual(
            &self.ledger,
            self.cursor.current_index(),
            self.cursor.physical_time(),
        )
    }

    pub fn total_virtual_duration(&self) -> f64 {
        self.ledger.total_duration()
    }

    pub fn phase(&self) -> TransportPhase {
        self.phase
    }

    pub fn current_fragment_index(&self) -> usize {
        self.cursor.current_index()
    }

    pub fn ledger(&self) -> &DurationLedger {
        &self.ledger
    }

    pub fn fragments(&self) -> &FragmentSet {
        &self.fragments
    }

    pub fn cursor(&self) -> &PlaybackCursor<E> {
        &self.cursor
    }

    /// Tear down: cancel the retry timer and release the media resource.
    pub fn shutdown(&mut self) {
        self.cancel_retry();
        self.pending_seek = None;
        self.resume_on_ready = false;
        self.pause_on_ready = false;
        self.cursor.release();
        info!("Transport shut down");
    }

    fn start_playback(&mut self) {
        self.pause_on_ready = false;
        if self.cursor.at_end() {
            // A seek onto a boundary lands at the end of the earlier fragment.
            debug!(
                "Fragment {} is at its end; moving on",
                self.cursor.current_index()
            );
            self.advance(true);
            return;
        }

        match self.cursor.play() {
            Ok(()) => {
                self.resume_on_ready = false;
                self.phase = TransportPhase::Playing;
            }
            Err(e) => {
                let streak = self.cursor.record_failure();
                warn!("Playback start rejected (streak {}): {}", streak, e);
            }
        }
    }

    fn pause(&mut self) {
        self.cursor.pause();
        self.resume_on_ready = false;
        self.phase = TransportPhase::Paused;
    }

    /// Load fragment `index` and park `time` until its metadata arrives.
    fn switch_fragment(&mut self, index: usize, time: f64, resume: bool) {
        let Some(source) = self.fragments.source(index).map(str::to_owned) else {
            return;
        };

        if let Some(previous) = self.pending_seek {
            debug!(
                "Seek to fragment {} replaces pending seek to fragment {}",
                index, previous.index
            );
        }

        self.cancel_retry();
        self.cursor.load(index, &source);
        self.cursor.set_pending_time(time);
        self.pending_seek = Some(PendingSeek { index, time });
        self.resume_on_ready = resume;
        if resume {
            self.pause_on_ready = false;
        }
        self.phase = TransportPhase::Loading;
        self.notify_fragment_change();
        self.notify_time();
    }

    fn on_metadata(&mut self, duration: f64) {
        let index = self.cursor.current_index();
        if self.ledger.record(index, duration) {
            debug!("Fragment {} duration is {:.3}s", index, duration);
        }
        self.cursor.observe_duration(duration);
        self.cancel_retry();

        if let Some(pending) = self.pending_seek.take() {
            if pending.index == index {
                self.cursor.seek(pending.time);
            } else {
                debug!(
                    "Discarding pending seek for fragment {} (fragment {} loaded)",
                    pending.index, index
                );
            }
        }

        if matches!(
            self.phase,
            TransportPhase::Loading | TransportPhase::Error | TransportPhase::Idle
        ) {
            self.phase = self.settled_phase();
        }

        if self.resume_on_ready {
            self.start_playback();
        }
        self.notify_time();
    }

    fn on_playable(&mut self) {
        self.cancel_retry();
        self.cursor.reset_errors();

        if self.phase.is_loading() {
            self.phase = self.settled_phase();
        }
        if self.resume_on_ready && self.pending_seek.is_none() {
            self.start_playback();
        }
    }

    /// Phase once a load finishes: `Paused` if a toggle asked for it.
    fn settled_phase(&mut self) -> TransportPhase {
        if std::mem::take(&mut self.pause_on_ready) {
            TransportPhase::Paused
        } else {
            TransportPhase::Ready
        }
    }

    fn on_fragment_ended(&mut self) {
        let was_playing = self.phase == TransportPhase::Playing || self.resume_on_ready;
        self.advance(was_playing);
    }

    /// Move past the current fragment: on to the next one at time 0, or to
    /// `Ended` after the last.
    fn advance(&mut self, resume: bool) {
        let next = self.cursor.current_index() + 1;

        if next < self.fragments.len() {
            info!("Fragment {} ended, advancing to {}", next - 1, next);
            self.switch_fragment(next, 0.0, resume);
            return;
        }

        if let Some(duration) = self.cursor.physical_duration() {
            self.cursor.observe_time(duration);
        }
        self.resume_on_ready = false;
        self.phase = TransportPhase::Ended;
        info!("Playback reached the end of the recording");
        self.notify_time();
    }

    fn on_failure(&mut self, reason: &str) {
        let streak = self.cursor.record_failure();
        warn!(
            "Fragment {} failed (streak {}): {}",
            self.cursor.current_index(),
            streak,
            reason
        );

        if self.phase == TransportPhase::Playing {
            self.resume_on_ready = true;
        }
        self.phase = TransportPhase::Error;

        if let Some(max) = self.retry.max_attempts {
            if streak > max {
                warn!("Giving up on automatic reloads after {} attempts", max);
                self.retry_at = None;
                return;
            }
        }

        if self.retry_at.is_none() {
            self.retry_at = Some(Instant::now() + self.retry.delay);
            debug!("Reload scheduled in {:?}", self.retry.delay);
        }
    }

    fn cancel_retry(&mut self) {
        if self.retry_at.take().is_some() {
            debug!("Cancelled scheduled reload");
        }
    }

    fn notify_time(&self) {
        let time = self.virtual_current_time();
        for observer in &self.observers {
            observer.on_virtual_time_update(time);
        }
    }

    fn notify_fragment_change(&self) {
        let index = self.cursor.current_index();
        for observer in &self.observers {
            observer.on_fragment_change(index);
        }
    }
}

impl<E: MediaEngine> SeekCommands for TransportController<E> {
    fn seek_to_fragment(&mut self, index: usize, time: f64) {
        if index >= self.fragments.len() {
            debug!(
                "Ignoring seek to fragment {} ({} fragments)",
                index,
                self.fragments.len()
            );
            return;
        }

        if index != self.cursor.current_index() {
            let resume = self.phase == TransportPhase::Playing || self.resume_on_ready;
            self.switch_fragment(index, time, resume);
            return;
        }

        if !self.cursor.has_metadata() {
            // Same fragment, still loading: wait for its metadata.
            self.pending_seek = Some(PendingSeek { index, time });
            self.cursor.set_pending_time(time);
            self.notify_time();
            return;
        }

        self.cursor.seek(time);
        self.notify_time();
        if matches!(
            self.phase,
            TransportPhase::Ready | TransportPhase::Paused | TransportPhase::Ended
        ) {
            self.start_playback();
        }
    }

    fn seek_to_virtual_time(&mut self, time: f64) {
        match timeline::to_fragment_local(&self.ledger, time) {
            Some(position) => self.seek_to_fragment(position.index, position.local_time),
            None => debug!("Ignoring seek to {}: no fragments", time),
        }
    }
}
