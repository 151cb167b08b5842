pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod fragment;
pub mod global;
pub mod media;
pub mod playback;
pub mod player;
pub mod timeline;
pub mod transcript;
