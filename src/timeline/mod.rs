//! The stitched virtual timeline over a fragment set.
//!
//! Nothing here is cached: offsets, totals and boundaries are summed from the
//! ledger each time they are asked for.

pub mod ledger;
pub mod mapper;

pub use ledger::{DurationEntry, DurationLedger};
pub use mapper::{to_fragment_local, to_virtual, FragmentPosition};
