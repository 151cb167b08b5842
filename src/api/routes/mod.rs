//! API route modules.

pub mod playback;
