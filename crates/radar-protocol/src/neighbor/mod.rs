/// Neighbor module for the radar.
///
/// Holds the bounded live neighbor set, the IP → ID translation and the
/// per-cycle reconciliation that turns a candidate table into change
/// events.

pub mod table;
pub mod types;

pub use table::{truncate, NeighborTable};
pub use types::{
    CandidateTable, DeviceName, EventKind, NeighborEvent, NeighborId, NeighborRecord, PathRtt,
};
