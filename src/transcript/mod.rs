//! Transcript click-to-seek.
//!
//! Transcript segments carry times on the stitched timeline. When the
//! transcription service also knows which fragment a segment came from, the
//! seek goes straight to that fragment instead of through the ledger, which
//! may still hold provisional durations.

use serde::{Deserialize, Serialize};

use crate::playback::SeekTarget;

/// A timed transcript line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub text: String,
    /// Fragment the segment was recorded in, when known.
    #[serde(default)]
    pub fragment_index: Option<usize>,
    /// Start of the segment relative to its fragment, when known.
    #[serde(default)]
    pub fragment_start: Option<f64>,
}

/// Where clicking a transcript line should move playback.
pub fn seek_target(segment: &TranscriptSegment) -> SeekTarget {
    match (segment.fragment_index, segment.fragment_start) {
        (Some(index), Some(time)) => SeekTarget::Fragment { index, time },
        _ => SeekTarget::Virtual {
            time: segment.start,
        },
    }
}

/// Index of the segment being spoken at `virtual_time`.
///
/// Segments are expected in start order. Where two segments touch, the later
/// one wins so the highlight moves as soon as the next line begins.
pub fn active_segment(segments: &[TranscriptSegment], virtual_time: f64) -> Option<usize> {
    let upcoming = segments.partition_point(|segment| segment.start <= virtual_time);
    let candidate = upcoming.checked_sub(1)?;
    (virtual_time < segments[candidate].end).then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64) -> TranscriptSegment {
        TranscriptSegment {
            start,
            end,
            text: format!("{start}-{end}"),
            fragment_index: None,
            fragment_start: None,
        }
    }

    #[test]
    fn test_seek_target_virtual() {
        assert_eq!(
            seek_target(&segment(42.0, 45.0)),
            SeekTarget::Virtual { time: 42.0 }
        );
    }

    #[test]
    fn test_seek_target_fragment_relative() {
        let segment = TranscriptSegment {
            fragment_index: Some(2),
            fragment_start: Some(3.5),
            ..segment(73.5, 80.0)
        };
        assert_eq!(
            seek_target(&segment),
            SeekTarget::Fragment { index: 2, time: 3.5 }
        );
    }

    #[test]
    fn test_seek_target_needs_both_fragment_fields() {
        let segment = TranscriptSegment {
            fragment_index: Some(2),
            ..segment(73.5, 80.0)
        };
        assert_eq!(seek_target(&segment), SeekTarget::Virtual { time: 73.5 });
    }

    #[test]
    fn test_active_segment() {
        let segments = vec![segment(0.0, 4.0), segment(4.0, 9.0), segment(12.0, 15.0)];
        assert_eq!(active_segment(&segments, 0.0), Some(0));
        assert_eq!(active_segment(&segments, 3.9), Some(0));
        assert_eq!(active_segment(&segments, 4.0), Some(1));
        assert_eq!(active_segment(&segments, 10.0), None);
        assert_eq!(active_segment(&segments, 13.0), Some(2));
        assert_eq!(active_segment(&segments, 20.0), None);
        assert_eq!(active_segment(&[], 1.0), None);
    }

    #[test]
    fn test_segment_deserialization_defaults() {
        let segment: TranscriptSegment =
            serde_json::from_str(r#"{"start": 1.0, "end": 2.5}"#).unwrap();
        assert_eq!(segment.text, "");
        assert!(segment.fragment_index.is_none());
        assert_eq!(seek_target(&segment), SeekTarget::Virtual { time: 1.0 });
    }
}
