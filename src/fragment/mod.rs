//! Fragment descriptors for a stitched recording.
//!
//! A recording session may be stored as several physical files. The
//! recording-lookup service hands them over as an ordered manifest; the
//! order is the playback order and is never changed here.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::slice;

/// One physically stored recording segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Stream URL or local path of the recording file.
    #[serde(alias = "url", alias = "stream_url")]
    pub source: String,
    /// Duration reported by the lookup service, if any.
    #[serde(default, alias = "duration", alias = "duration_seconds")]
    pub declared_duration: Option<f64>,
    #[serde(default, alias = "session_uid")]
    pub sequence_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Fragment {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            declared_duration: None,
            sequence_id: String::new(),
            created_at: None,
        }
    }

    pub fn with_declared_duration(mut self, seconds: f64) -> Self {
        self.declared_duration = Some(seconds);
        self
    }

    /// The declared duration when it is usable for offset arithmetic.
    ///
    /// Lookup services report `0`, negative or missing values for recordings
    /// that are still being finalized; all of those count as unknown.
    pub fn known_declared_duration(&self) -> Option<f64> {
        self.declared_duration
            .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
    }
}

/// Manifest file layout: either `{"fragments": [...]}` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestFile {
    Wrapped { fragments: Vec<Fragment> },
    Bare(Vec<Fragment>),
}

/// Ordered, immutable set of fragments handed to the playback engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FragmentSet {
    fragments: Vec<Fragment>,
}

impl FragmentSet {
    pub fn new(fragments: Vec<Fragment>) -> Self {
        Self { fragments }
    }

    /// Legacy mode: a single source URL with no fragment list.
    pub fn single(source: impl Into<String>) -> Self {
        Self::new(vec![Fragment::new(source)])
    }

    pub fn from_manifest_str(content: &str) -> Result<Self> {
        let manifest: ManifestFile =
            serde_json::from_str(content).context("Failed to parse fragment manifest")?;
        let fragments = match manifest {
            ManifestFile::Wrapped { fragments } | ManifestFile::Bare(fragments) => fragments,
        };
        Self::validated(fragments)
    }

    /// Build a set, rejecting fragments without a source.
    pub fn validated(fragments: Vec<Fragment>) -> Result<Self> {
        if let Some(position) = fragments.iter().position(|f| f.source.trim().is_empty()) {
            bail!("Fragment {} has an empty source", position);
        }
        Ok(Self::new(fragments))
    }

    pub fn load_manifest(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fragment manifest {:?}", path))?;
        Self::from_manifest_str(&content)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Fragment> {
        self.fragments.get(index)
    }

    pub fn source(&self, index: usize) -> Option<&str> {
        self.get(index).map(|f| f.source.as_str())
    }

    pub fn iter(&self) -> slice::Iter<'_, Fragment> {
        self.fragments.iter()
    }
}

impl<'a> IntoIterator for &'a FragmentSet {
    type Item = &'a Fragment;
    type IntoIter = slice::Iter<'a, Fragment>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
