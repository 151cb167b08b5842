//! Player service.
//!
//! One task owns the transport controller and is the only place it is
//! touched. Callers talk to it through a [`PlayerHandle`]; engine events and
//! the reload timer arrive on the same loop, so every mutation happens one
//! at a time.

use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::fragment::FragmentSet;
use crate::media::{EngineEvent, MediaEngine};
use crate::playback::{PlaybackSnapshot, SeekCommands, SeekTarget, TransportController};

#[derive(Debug, Clone)]
pub enum PlayerCommand {
    TogglePlay,
    ToggleMute,
    Seek(SeekTarget),
    ReplaceFragments(FragmentSet),
    Shutdown,
}

/// Latest published playback state, read back through [`PlayerHandle::status`].
#[derive(Clone, Default)]
struct PlayerStatusHandle {
    inner: Arc<Mutex<PlaybackSnapshot>>,
}

impl PlayerStatusHandle {
    async fn get(&self) -> PlaybackSnapshot {
        self.inner.lock().await.clone()
    }

    async fn set(&self, snapshot: PlaybackSnapshot) {
        *self.inner.lock().await = snapshot;
    }
}

/// Cloneable command surface for a running player.
#[derive(Clone)]
pub struct PlayerHandle {
    tx: mpsc::Sender<PlayerCommand>,
    status: PlayerStatusHandle,
}

impl PlayerHandle {
    pub async fn toggle_play(&self) -> Result<()> {
        self.send(PlayerCommand::TogglePlay).await
    }

    pub async fn toggle_mute(&self) -> Result<()> {
        self.send(PlayerCommand::ToggleMute).await
    }

    pub async fn seek_to_virtual_time(&self, time: f64) -> Result<()> {
        self.seek(SeekTarget::Virtual { time }).await
    }

    pub async fn seek_to_fragment(&self, index: usize, time: f64) -> Result<()> {
        self.seek(SeekTarget::Fragment { index, time }).await
    }

    pub async fn seek(&self, target: SeekTarget) -> Result<()> {
        self.send(PlayerCommand::Seek(target)).await
    }

    pub async fn replace_fragments(&self, fragments: FragmentSet) -> Result<()> {
        self.send(PlayerCommand::ReplaceFragments(fragments)).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(PlayerCommand::Shutdown).await
    }

    pub async fn status(&self) -> PlaybackSnapshot {
        self.status.get().await
    }

    async fn send(&self, command: PlayerCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| anyhow!("Player is no longer running"))
    }
}

/// Start the player task. It runs until [`PlayerHandle::shutdown`] or until
/// every handle is dropped, then releases the media engine.
pub fn spawn<E>(
    controller: TransportController<E>,
    events: mpsc::UnboundedReceiver<EngineEvent>,
) -> (PlayerHandle, JoinHandle<()>)
where
    E: MediaEngine + 'static,
{
    let (tx, rx) = mpsc::channel(32);
    let status = PlayerStatusHandle::default();
    let handle = PlayerHandle {
        tx,
        status: status.clone(),
    };
    let task = tokio::spawn(run_player(controller, rx, events, status));
    (handle, task)
}

async fn run_player<E: MediaEngine>(
    mut controller: TransportController<E>,
    mut commands: mpsc::Receiver<PlayerCommand>,
    mut events: mpsc::UnboundedReceiver<EngineEvent>,
    status: PlayerStatusHandle,
) {
    info!(
        "Player running with {} fragment(s)",
        controller.fragments().len()
    );
    status.set(controller.snapshot()).await;

    loop {
        let deadline = controller.retry_deadline();
        tokio::select! {
            command = commands.recv() => match command {
                Some(PlayerCommand::Shutdown) | None => break,
                Some(command) => apply(&mut controller, command),
            },
            Some(event) = events.recv() => controller.handle_event(event),
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                controller.retry_elapsed();
            }
        }
        status.set(controller.snapshot()).await;
    }

    controller.shutdown();
    status.set(controller.snapshot()).await;
    info!("Player stopped");
}

fn apply<E: MediaEngine>(controller: &mut TransportController<E>, command: PlayerCommand) {
    debug!("Player command: {:?}", command);
    match command {
        PlayerCommand::TogglePlay => {
            let phase = controller.toggle_play();
            info!("Transport is {}", phase.as_str());
        }
        PlayerCommand::ToggleMute => {
            let muted = controller.toggle_mute();
            info!("Muted: {}", muted);
        }
        PlayerCommand::Seek(target) => controller.seek(target),
        PlayerCommand::ReplaceFragments(fragments) => controller.set_fragments(fragments),
        PlayerCommand::Shutdown => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Fragment;
    use crate::media::{LoadId, MediaError, MediaEvent};
    use crate::playback::{RetryPolicy, TransportPhase};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// Engine that answers every load by replaying a scripted outcome.
    struct EchoEngine {
        events: mpsc::UnboundedSender<EngineEvent>,
        outcomes: Arc<StdMutex<Vec<Option<f64>>>>,
        loads: Arc<StdMutex<Vec<LoadId>>>,
        released: Arc<StdMutex<bool>>,
        load: LoadId,
    }

    impl MediaEngine for EchoEngine {
        fn load_source(&mut self, load: LoadId, _locator: &str) {
            self.load = load;
            self.loads.lock().unwrap().push(load);
            let outcome = {
                let mut outcomes = self.outcomes.lock().unwrap();
                if outcomes.is_empty() {
                    Some(10.0)
                } else {
                    outcomes.remove(0)
                }
            };
            let events = match outcome {
                Some(duration) => vec![MediaEvent::MetadataReady { duration }, MediaEvent::CanPlay],
                None => vec![MediaEvent::Failed {
                    reason: "not ready".to_string(),
                }],
            };
            for event in events {
                let _ = self.events.send(EngineEvent::new(load, event));
            }
        }

        fn play(&mut self) -> Result<(), MediaError> {
            let _ = self
                .events
                .send(EngineEvent::new(self.load, MediaEvent::PlaybackStarted));
            Ok(())
        }

        fn pause(&mut self) {}

        fn set_physical_time(&mut self, time: f64) {
            let _ = self
                .events
                .send(EngineEvent::new(self.load, MediaEvent::TimeUpdate { time }));
        }

        fn set_muted(&mut self, _muted: bool) {}

        fn release(&mut self) {
            *self.released.lock().unwrap() = true;
        }
    }

    struct Harness {
        handle: PlayerHandle,
        task: JoinHandle<()>,
        loads: Arc<StdMutex<Vec<LoadId>>>,
        released: Arc<StdMutex<bool>>,
    }

    fn start(outcomes: Vec<Option<f64>>, retry_delay: Duration) -> Harness {
        let (tx, rx) = mpsc::unbounded_channel();
        let loads = Arc::new(StdMutex::new(Vec::new()));
        let released = Arc::new(StdMutex::new(false));
        let engine = EchoEngine {
            events: tx,
            outcomes: Arc::new(StdMutex::new(outcomes)),
            loads: Arc::clone(&loads),
            released: Arc::clone(&released),
            load: LoadId::default(),
        };
        let fragments = FragmentSet::new(vec![Fragment::new("a.wav"), Fragment::new("b.wav")]);
        let controller = TransportController::new(
            engine,
            fragments,
            RetryPolicy {
                delay: retry_delay,
                max_attempts: None,
            },
        );
        let (handle, task) = spawn(controller, rx);
        Harness {
            handle,
            task,
            loads,
            released,
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_player_publishes_status() {
        let harness = start(vec![Some(10.0)], Duration::from_secs(2));
        settle().await;

        let status = harness.handle.status().await;
        assert_eq!(status.phase, TransportPhase::Ready);
        assert_eq!(status.total_virtual_duration, 10.0);
        assert_eq!(status.fragment_count, 2);
    }

    #[tokio::test]
    async fn test_player_seek_across_fragments() {
        let harness = start(vec![Some(10.0), Some(20.0)], Duration::from_secs(2));
        settle().await;

        harness.handle.toggle_play().await.unwrap();
        harness.handle.seek_to_virtual_time(15.0).await.unwrap();
        settle().await;

        let status = harness.handle.status().await;
        assert_eq!(status.current_fragment_index, 1);
        assert_eq!(status.virtual_current_time, 15.0);
        assert_eq!(status.total_virtual_duration, 30.0);
        assert_eq!(status.phase, TransportPhase::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_player_reloads_once_after_delay() {
        let harness = start(vec![None, Some(10.0)], Duration::from_secs(3));
        settle().await;

        let status = harness.handle.status().await;
        assert_eq!(status.phase, TransportPhase::Error);
        assert!(status.is_preparing);
        assert_eq!(harness.loads.lock().unwrap().len(), 1);

        tokio::time::advance(Duration::from_millis(2900)).await;
        settle().await;
        assert_eq!(harness.loads.lock().unwrap().len(), 1);

        tokio::time::advance(Duration::from_millis(200)).await;
        settle().await;
        assert_eq!(harness.loads.lock().unwrap().len(), 2);

        let status = harness.handle.status().await;
        assert_eq!(status.error_streak, 0);
        assert!(!status.is_preparing);
        assert_eq!(status.phase, TransportPhase::Ready);

        tokio::time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(harness.loads.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_retry_and_releases() {
        let harness = start(vec![None], Duration::from_secs(3));
        settle().await;

        harness.handle.shutdown().await.unwrap();
        harness.task.await.unwrap();
        assert!(*harness.released.lock().unwrap());

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(harness.loads.lock().unwrap().len(), 1);
        assert!(harness.handle.toggle_play().await.is_err());
    }

    #[tokio::test]
    async fn test_replace_fragments_resets_position() {
        let harness = start(vec![Some(10.0), Some(20.0), Some(5.0)], Duration::from_secs(2));
        settle().await;
        harness.handle.seek_to_fragment(1, 4.0).await.unwrap();
        settle().await;

        harness
            .handle
            .replace_fragments(FragmentSet::single("c.wav"))
            .await
            .unwrap();
        settle().await;

        let status = harness.handle.status().await;
        assert_eq!(status.fragment_count, 1);
        assert_eq!(status.current_fragment_index, 0);
        assert_eq!(status.virtual_current_time, 0.0);
        assert_eq!(status.total_virtual_duration, 5.0);
    }
}
