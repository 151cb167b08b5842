//! Multi-fragment playback.
//!
//! Presents one continuous timeline over a recording stored as several
//! files, driving a single media engine:
//! seek → resolve fragment → (switch + wait for metadata) → apply → resume

pub mod commands;
pub mod controller;
pub mod cursor;
pub mod status;


pub use commands::{PlaybackObserver, SeekCommands, SeekTarget};
pub use controller::{RetryPolicy, TransportController};
pub use cursor::PlaybackCursor;
pub use status::{PendingSeek, PlaybackSnapshot, TransportPhase};
