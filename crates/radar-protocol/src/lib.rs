//! Radar protocol layer.
//!
//! Local neighbor discovery for a mesh node: probe bouquets are broadcast
//! every cycle, replies are turned into per-peer latency estimates, and a
//! bounded neighbor table with stable IDs is reconciled against them.
//! Changes are published as typed events for the routing layer.

pub mod bus;
pub mod config;
pub mod error;
pub mod neighbor;
pub mod radar;
pub mod runtime;
pub mod stats;
pub mod transport;

pub use bus::{EventSubscription, NotificationBus};
pub use config::RadarConfig;
pub use error::RadarError;
pub use neighbor::{
    CandidateTable, DeviceName, EventKind, NeighborEvent, NeighborId, NeighborRecord,
    NeighborTable, PathRtt,
};
pub use radar::{aggregate, NeighborSnapshot, Radar, SampleBuffer, SampleRecorder};
pub use runtime::{RadarCommand, RadarHandle, RadarRuntime};
pub use stats::{RadarStats, StatsSnapshot};
pub use transport::{BroadcastTransport, Probe};
