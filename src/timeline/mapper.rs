//! Conversions between the virtual timeline and fragment-local positions.
//!
//! Both directions read the same ledger snapshot, and the scrub bar and the
//! seek commands go through the same functions so a boundary always resolves
//! the same way.

use serde::{Deserialize, Serialize};

use super::ledger::DurationLedger;

/// A position inside one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FragmentPosition {
    pub index: usize,
    pub local_time: f64,
}

/// Negative and NaN times clamp to the start of the timeline.
pub(crate) fn clamp_time(time: f64) -> f64 {
    if time.is_nan() || time < 0.0 {
        0.0
    } else {
        time
    }
}

/// Resolve a virtual time to the fragment that contains it.
///
/// A time exactly on a boundary belongs to the earlier fragment
/// (`remaining <= duration` selects it), at its very end.
///
/// A fragment whose length is still unknown absorbs whatever remains, since
/// nothing is known about where it ends. Past the end of the timeline the
/// last fragment receives the remainder measured from its own offset. In both
/// cases the local offset may exceed the fragment's real length; the cursor
/// clamps it once the fragment is loaded.
///
/// Returns `None` only for an empty ledger.
pub fn to_fragment_local(ledger: &DurationLedger, virtual_time: f64) -> Option<FragmentPosition> {
    let last = ledger.len().checked_sub(1)?;
    let mut remaining = clamp_time(virtual_time);

    for (index, entry) in ledger.entries().iter().enumerate() {
        match entry.known_seconds() {
            None => {
                return Some(FragmentPosition {
                    index,
                    local_time: remaining,
                })
            }
            Some(duration) if remaining <= duration => {
                return Some(FragmentPosition {
                    index,
                    local_time: remaining,
                })
            }
            Some(duration) => remaining -= duration,
        }
    }

    Some(FragmentPosition {
        index: last,
        local_time: remaining + ledger.duration_of(last),
    })
}

/// Position on the virtual timeline of `local_time` inside fragment `index`.
pub fn to_virtual(ledger: &DurationLedger, index: usize, local_time: f64) -> f64 {
    ledger.offset_of(index) + local_time
}
