//! Narrow interfaces between the transport and whoever embeds it.

use serde::{Deserialize, Serialize};

/// Where a caller wants playback to be.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeekTarget {
    /// A position on the stitched timeline.
    Virtual { time: f64 },
    /// A position inside one fragment.
    Fragment { index: usize, time: f64 },
}

/// Command surface exposed to the owner of a player (scrub bar, transcript
/// click-to-seek) without handing out the transport itself.
pub trait SeekCommands {
    fn seek_to_fragment(&mut self, index: usize, time: f64);

    fn seek_to_virtual_time(&mut self, time: f64);

    fn seek(&mut self, target: SeekTarget) {
        match target {
            SeekTarget::Virtual { time } => self.seek_to_virtual_time(time),
            SeekTarget::Fragment { index, time } => self.seek_to_fragment(index, time),
        }
    }
}

/// Listener for position and fragment changes.
///
/// Times are always on the virtual timeline.
pub trait PlaybackObserver: Send {
    fn on_virtual_time_update(&self, _time: f64) {}

    fn on_fragment_change(&self, _index: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl SeekCommands for Recorder {
        fn seek_to_fragment(&mut self, index: usize, time: f64) {
            self.calls.push(format!("fragment {index} {time}"));
        }

        fn seek_to_virtual_time(&mut self, time: f64) {
            self.calls.push(format!("virtual {time}"));
        }
    }

    #[test]
    fn test_seek_dispatches_by_target() {
        let mut recorder = Recorder::default();
        recorder.seek(SeekTarget::Virtual { time: 12.5 });
        recorder.seek(SeekTarget::Fragment { index: 2, time: 3.0 });
        assert_eq!(recorder.calls, vec!["virtual 12.5", "fragment 2 3"]);
    }

    #[test]
    fn test_seek_target_serialization() {
        let json = serde_json::to_string(&SeekTarget::Fragment { index: 1, time: 4.5 }).unwrap();
        assert_eq!(json, r#"{"kind":"fragment","index":1,"time":4.5}"#);

        let parsed: SeekTarget = serde_json::from_str(r#"{"kind":"virtual","time":7}"#).unwrap();
        assert_eq!(parsed, SeekTarget::Virtual { time: 7.0 });
    }
}
