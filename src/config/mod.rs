use crate::global;
use crate::playback::RetryPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub playback: PlaybackConfig,
    pub api: ApiConfig,
    pub source: SourceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Delay before reloading a fragment whose stream failed.
    /// Fresh recordings are often not streamable for a few seconds.
    pub retry_delay_ms: u64,
    /// Stop reloading after this many consecutive failures.
    /// Unset means keep trying.
    pub max_retry_attempts: Option<u32>,
    /// How often the engine reports the playback position.
    pub tick_interval_ms: u64,
    pub start_muted: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: 2000,
            max_retry_attempts: None,
            tick_interval_ms: 250,
            start_muted: false,
        }
    }
}

impl PlaybackConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            delay: Duration::from_millis(self.retry_delay_ms),
            max_attempts: self.max_retry_attempts,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3838,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Timeout for fetching remote recordings.
    pub request_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}

impl SourceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from `config_path`, writing the defaults there if it is missing.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.playback.retry_delay_ms, 2000);
        assert!(config.playback.max_retry_attempts.is_none());
        assert_eq!(config.api.port, 3838);
        assert_eq!(config.source.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let playback = PlaybackConfig {
            retry_delay_ms: 500,
            max_retry_attempts: Some(4),
            ..PlaybackConfig::default()
        };
        let policy = playback.retry_policy();
        assert_eq!(policy.delay, Duration::from_millis(500));
        assert_eq!(policy.max_attempts, Some(4));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [playback]
            retry_delay_ms = 750

            [api]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.playback.retry_delay_ms, 750);
        assert_eq!(config.playback.tick_interval_ms, 250);
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.api.host, "127.0.0.1");
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.api.port, 3838);

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.playback.retry_delay_ms, config.playback.retry_delay_ms);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "playback = 12").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_tick_interval_never_zero() {
        let playback = PlaybackConfig {
            tick_interval_ms: 0,
            ..PlaybackConfig::default()
        };
        assert_eq!(playback.tick_interval(), Duration::from_millis(1));
    }
}
