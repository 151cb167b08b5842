//! End to end: WAV fragments on disk, the clock engine, the player task.

use segue::fragment::{Fragment, FragmentSet};
use segue::media::{ClockEngine, WavProbe};
use segue::playback::{PlaybackSnapshot, RetryPolicy, TransportController, TransportPhase};
use segue::player::{self, PlayerHandle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const SAMPLE_RATE: u32 = 8000;

fn write_wav(path: &Path, seconds: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..SAMPLE_RATE * seconds {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn start(fragments: FragmentSet) -> (PlayerHandle, tokio::task::JoinHandle<()>) {
    let probe = Arc::new(WavProbe::new(Duration::from_secs(5)).unwrap());
    let (tx, rx) = mpsc::unbounded_channel();
    let engine = ClockEngine::spawn(probe, Duration::from_millis(10), tx);
    let controller = TransportController::new(engine, fragments, RetryPolicy::default());
    player::spawn(controller, rx)
}

async fn wait_for(
    player: &PlayerHandle,
    what: &str,
    done: impl Fn(&PlaybackSnapshot) -> bool,
) -> PlaybackSnapshot {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let status = player.status().await;
        if done(&status) {
            return status;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}: {:?}", what, status);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_seek_into_second_fragment_and_play_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("0.wav");
    let second = dir.path().join("1.wav");
    write_wav(&first, 2);
    write_wav(&second, 3);

    let fragments = FragmentSet::new(vec![
        Fragment::new(first.to_string_lossy()),
        Fragment::new(second.to_string_lossy()),
    ]);
    let (player, task) = start(fragments);

    let status = wait_for(&player, "first fragment", |s| s.phase == TransportPhase::Ready).await;
    assert_eq!(status.total_virtual_duration, 2.0);

    // Second fragment's length is unknown until it loads.
    player.seek_to_virtual_time(3.0).await.unwrap();
    let status = wait_for(&player, "second fragment", |s| {
        s.current_fragment_index == 1 && s.pending_seek.is_none() && s.phase == TransportPhase::Ready
    })
    .await;
    assert_eq!(status.total_virtual_duration, 5.0);
    assert_eq!(status.fragment_boundaries, vec![2.0]);
    assert!((status.virtual_current_time - 3.0).abs() < 1e-9);

    player.toggle_play().await.unwrap();
    let status = wait_for(&player, "end", |s| s.phase == TransportPhase::Ended).await;
    assert_eq!(status.virtual_current_time, 5.0);
    assert!(!status.is_playing);

    player.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_boundary_seek_plays_into_next_fragment() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("0.wav");
    let second = dir.path().join("1.wav");
    write_wav(&first, 1);
    write_wav(&second, 1);

    let fragments = FragmentSet::new(vec![
        Fragment::new(first.to_string_lossy()),
        Fragment::new(second.to_string_lossy()),
    ]);
    let (player, task) = start(fragments);
    wait_for(&player, "first fragment", |s| s.phase == TransportPhase::Ready).await;

    // 1.0 is the end of fragment 0; playing from there must not replay it.
    player.seek_to_virtual_time(1.0).await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    let mut last_time = 0.0;
    let mut reached_second = false;
    loop {
        let status = player.status().await;
        assert!(
            status.virtual_current_time >= last_time - 1e-9,
            "went back from {} to {}: {:?}",
            last_time,
            status.virtual_current_time,
            status
        );
        last_time = status.virtual_current_time;
        reached_second |= status.current_fragment_index == 1;

        if status.phase == TransportPhase::Ended {
            break;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for the end: {:?}", status);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert!(reached_second);
    let status = player.status().await;
    assert_eq!(status.current_fragment_index, 1);
    assert_eq!(status.virtual_current_time, 2.0);

    player.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_missing_fragment_reports_preparing() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("not-yet.wav");

    let (player, task) = start(FragmentSet::single(missing.to_string_lossy()));

    let status = wait_for(&player, "failure", |s| s.phase == TransportPhase::Error).await;
    assert!(status.is_preparing);
    assert!(status.is_loading);
    assert_eq!(status.error_streak, 1);

    player.shutdown().await.unwrap();
    task.await.unwrap();
}
