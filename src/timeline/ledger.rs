//! Per-fragment duration table.

use tracing::debug;

use crate::fragment::FragmentSet;

/// What the ledger knows about one fragment's length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DurationEntry {
    Unknown,
    /// Taken from the fragment descriptor; provisional until observed.
    Declared(f64),
    /// Reported by the media engine once the fragment's metadata loaded.
    Observed(f64),
}

impl DurationEntry {
    /// Seconds used for offset arithmetic. Unknown counts as zero.
    pub fn seconds(&self) -> f64 {
        self.known_seconds().unwrap_or(0.0)
    }

    pub fn known_seconds(&self) -> Option<f64> {
        match *self {
            Self::Unknown => None,
            Self::Declared(seconds) | Self::Observed(seconds) => Some(seconds),
        }
    }

    pub fn is_observed(&self) -> bool {
        matches!(self, Self::Observed(_))
    }
}

/// Durations of every fragment, indexed like the fragment set.
///
/// Offsets and the total are always summed from the current entries, so a
/// fragment whose real length arrives late shifts every later offset in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DurationLedger {
    entries: Vec<DurationEntry>,
}

impl DurationLedger {
    pub fn seeded(fragments: &FragmentSet) -> Self {
        let mut ledger = Self::default();
        ledger.seed(fragments);
        ledger
    }

    /// Reset the ledger from the fragments' declared durations.
    pub fn seed(&mut self, fragments: &FragmentSet) {
        self.entries = fragments
            .iter()
            .map(|fragment| {
                fragment
                    .known_declared_duration()
                    .map_or(DurationEntry::Unknown, DurationEntry::Declared)
            })
            .collect();
    }

    /// Record a duration observed from the media engine.
    ///
    /// Non-finite or non-positive values are placeholders (a stream that has
    /// not reported its length yet) and never replace what the ledger holds.
    /// Returns whether the entry changed.
    pub fn record(&mut self, index: usize, observed: f64) -> bool {
        let Some(entry) = self.entries.get_mut(index) else {
            debug!("Ignoring duration for unknown fragment index {}", index);
            return false;
        };

        if !observed.is_finite() || observed <= 0.0 {
            debug!(
                "Ignoring placeholder duration {} for fragment {}",
                observed, index
            );
            return false;
        }

        let next = DurationEntry::Observed(observed);
        if *entry == next {
            return false;
        }
        *entry = next;
        true
    }

    pub fn entry(&self, index: usize) -> Option<DurationEntry> {
        self.entries.get(index).copied()
    }

    pub fn entries(&self) -> &[DurationEntry] {
        &self.entries
    }

    /// Duration used for fragment `index`, zero while unknown.
    pub fn duration_of(&self, index: usize) -> f64 {
        self.entries.get(index).map_or(0.0, DurationEntry::seconds)
    }

    /// Start of fragment `index` on the virtual timeline.
    pub fn offset_of(&self, index: usize) -> f64 {
        self.entries
            .iter()
            .take(index)
            .map(DurationEntry::seconds)
            .sum()
    }

    pub fn total_duration(&self) -> f64 {
        self.entries.iter().map(DurationEntry::seconds).sum()
    }

    /// Virtual positions where one fragment ends and the next begins.
    pub fn boundaries(&self) -> Vec<f64> {
        let mut offset = 0.0;
        let mut boundaries = Vec::with_capacity(self.entries.len().saturating_sub(1));
        for entry in self.entries.iter().take(self.entries.len().saturating_sub(1)) {
            offset += entry.seconds();
            boundaries.push(offset);
        }
        boundaries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
