//! Source duration probing.
//!
//! Recordings are WAV files served either from disk or over HTTP. A file
//! that was finalized moments ago may still 404 or be truncated; both come
//! back as errors the transport treats as transient.

use anyhow::{Context, Result};
use async_trait::async_trait;
use hound::WavReader;
use reqwest::{Client, StatusCode};
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use super::MediaError;

/// Resolves a source locator to its duration in seconds.
#[async_trait]
pub trait SourceProbe: Send + Sync {
    async fn probe(&self, locator: &str) -> Result<f64, MediaError>;
}

/// Reads WAV headers from local paths, `file://` and `http(s)://` URLs.
pub struct WavProbe {
    client: Client,
}

impl WavProbe {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    async fn probe_remote(&self, url: &str) -> Result<f64, MediaError> {
        let fetch_error = |reason: String| MediaError::Fetch {
            locator: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(MediaError::NotFound(url.to_string()));
        }
        let response = response
            .error_for_status()
            .map_err(|e| fetch_error(e.to_string()))?;
        let body = response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        debug!("Fetched {} bytes from {}", body.len(), url);
        wav_duration(Cursor::new(body), url)
    }

    async fn probe_local(&self, path: PathBuf) -> Result<f64, MediaError> {
        let locator = path.to_string_lossy().to_string();
        if !path.exists() {
            return Err(MediaError::NotFound(locator));
        }

        tokio::task::spawn_blocking(move || {
            let file = std::fs::File::open(&path).map_err(|e| MediaError::Fetch {
                locator: locator.clone(),
                reason: e.to_string(),
            })?;
            wav_duration(std::io::BufReader::new(file), &locator)
        })
        .await
        .map_err(|_| MediaError::EngineClosed)?
    }
}

#[async_trait]
impl SourceProbe for WavProbe {
    async fn probe(&self, locator: &str) -> Result<f64, MediaError> {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            self.probe_remote(locator).await
        } else {
            let path = locator.strip_prefix("file://").unwrap_or(locator);
            self.probe_local(PathBuf::from(path)).await
        }
    }
}

fn wav_duration<R: Read>(reader: R, locator: &str) -> Result<f64, MediaError> {
    let reader = WavReader::new(reader).map_err(|e| MediaError::Decode {
        locator: locator.to_string(),
        reason: e.to_string(),
    })?;

    let sample_rate = reader.spec().sample_rate;
    if sample_rate == 0 {
        return Err(MediaError::Decode {
            locator: locator.to_string(),
            reason: "sample rate is zero".to_string(),
        });
    }

    Ok(f64::from(reader.duration()) / f64::from(sample_rate))
}
