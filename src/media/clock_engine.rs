//! Headless media engine.
//!
//! Runs as an actor task: the [`ClockEngine`] handle forwards commands over
//! a channel, the task probes sources, keeps a wall clock for the loaded
//! fragment and reports everything back as [`EngineEvent`]s. It produces no
//! audio; it is the engine the service runs against when the embedding UI
//! owns the actual output device.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{EngineEvent, LoadId, MediaEngine, MediaError, MediaEvent, SourceProbe};

#[derive(Debug)]
enum ClockCommand {
    Load { load: LoadId, locator: String },
    Play,
    Pause,
    Seek(f64),
    Mute(bool),
}

pub struct ClockEngine {
    commands: mpsc::UnboundedSender<ClockCommand>,
    task: Option<JoinHandle<()>>,
}

impl ClockEngine {
    /// Start the engine task. Must be called inside a tokio runtime.
    pub fn spawn(
        probe: Arc<dyn SourceProbe>,
        tick: Duration,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_clock(rx, events, probe, tick));
        Self {
            commands,
            task: Some(task),
        }
    }

    fn send(&self, command: ClockCommand) -> Result<(), MediaError> {
        self.commands
            .send(command)
            .map_err(|_| MediaError::EngineClosed)
    }
}

impl MediaEngine for ClockEngine {
    fn load_source(&mut self, load: LoadId, locator: &str) {
        if self
            .send(ClockCommand::Load {
                load,
                locator: locator.to_string(),
            })
            .is_err()
        {
            warn!("Clock engine stopped; dropping load of {}", locator);
        }
    }

    fn play(&mut self) -> Result<(), MediaError> {
        self.send(ClockCommand::Play)
    }

    fn pause(&mut self) {
        let _ = self.send(ClockCommand::Pause);
    }

    fn set_physical_time(&mut self, time: f64) {
        let _ = self.send(ClockCommand::Seek(time));
    }

    fn set_muted(&mut self, muted: bool) {
        let _ = self.send(ClockCommand::Mute(muted));
    }

    fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Clock engine released");
        }
    }
}

impl Drop for ClockEngine {
    fn drop(&mut self) {
        self.release();
    }
}

/// Clock state for the loaded fragment.
#[derive(Debug, Default)]
struct Clock {
    load: LoadId,
    duration: Option<f64>,
    position: f64,
    /// Set while playing: when `position` was last brought up to date.
    running_since: Option<Instant>,
    play_requested: bool,
    muted: bool,
}

impl Clock {
    fn is_playing(&self) -> bool {
        self.running_since.is_some()
    }

    /// Fold elapsed wall time into `position`, clamped to the duration.
    fn settle(&mut self, now: Instant) {
        if let Some(since) = self.running_since {
            self.position += now.duration_since(since).as_secs_f64();
            self.running_since = Some(now);
        }
        if let Some(duration) = self.duration {
            self.position = self.position.min(duration);
        }
    }

    fn at_end(&self) -> bool {
        self.duration.is_some_and(|d| self.position >= d)
    }
}

struct ProbeResult {
    load: LoadId,
    result: Result<f64, MediaError>,
}

async fn run_clock(
    mut commands: mpsc::UnboundedReceiver<ClockCommand>,
    events: mpsc::UnboundedSender<EngineEvent>,
    probe: Arc<dyn SourceProbe>,
    tick: Duration,
) {
    let (probed_tx, mut probed_rx) = mpsc::unbounded_channel::<ProbeResult>();
    let mut probing: Option<JoinHandle<()>> = None;
    let mut clock = Clock::default();
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let emit = |load: LoadId, event: MediaEvent| {
        let _ = events.send(EngineEvent::new(load, event));
    };

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                let now = Instant::now();
                match command {
                    ClockCommand::Load { load, locator } => {
                        if let Some(task) = probing.take() {
                            task.abort();
                        }
                        let muted = clock.muted;
                        clock = Clock { load, muted, ..Clock::default() };
                        info!("Loading source {} ({:?})", locator, load);

                        let probe = Arc::clone(&probe);
                        let probed_tx = probed_tx.clone();
                        probing = Some(tokio::spawn(async move {
                            let result = probe.probe(&locator).await;
                            let _ = probed_tx.send(ProbeResult { load, result });
                        }));
                    }
                    ClockCommand::Play => {
                        if clock.duration.is_none() {
                            debug!("Play requested before metadata; queued");
                            clock.play_requested = true;
                        } else if clock.at_end() {
                            // Nothing left to play; the owner decides what comes next.
                            clock.running_since = None;
                            emit(clock.load, MediaEvent::Ended);
                        } else if !clock.is_playing() {
                            clock.running_since = Some(now);
                            emit(clock.load, MediaEvent::PlaybackStarted);
                        }
                    }
                    ClockCommand::Pause => {
                        clock.play_requested = false;
                        if clock.is_playing() {
                            clock.settle(now);
                            clock.running_since = None;
                            emit(clock.load, MediaEvent::Paused);
                        }
                    }
                    ClockCommand::Seek(time) => {
                        clock.settle(now);
                        clock.position = time.max(0.0);
                        clock.settle(now);
                        emit(clock.load, MediaEvent::TimeUpdate { time: clock.position });
                    }
                    ClockCommand::Mute(muted) => {
                        clock.muted = muted;
                        debug!("Clock engine muted={}", muted);
                    }
                }
            }
            Some(ProbeResult { load, result }) = probed_rx.recv() => {
                if load != clock.load {
                    debug!("Discarding probe result for superseded {:?}", load);
                    continue;
                }
                probing = None;
                match result {
                    Ok(duration) => {
                        clock.duration = Some(duration);
                        emit(load, MediaEvent::MetadataReady { duration });
                        emit(load, MediaEvent::CanPlay);
                        if std::mem::take(&mut clock.play_requested) {
                            clock.running_since = Some(Instant::now());
                            emit(load, MediaEvent::PlaybackStarted);
                        }
                    }
                    Err(e) => {
                        warn!("Source for {:?} failed: {}", load, e);
                        emit(load, MediaEvent::Failed { reason: e.to_string() });
                    }
                }
            }
            _ = ticker.tick(), if clock.is_playing() => {
                clock.settle(Instant::now());
                emit(clock.load, MediaEvent::TimeUpdate { time: clock.position });
                if clock.at_end() {
                    clock.running_since = None;
                    emit(clock.load, MediaEvent::Ended);
                }
            }
        }
    }

    if let Some(task) = probing {
        task.abort();
    }
}
