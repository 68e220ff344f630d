//! Radar prober: drives discovery cycles end to end.
//!
//! A cycle opens a sample window, scatters a bouquet of probes through the
//! [`BroadcastTransport`](crate::BroadcastTransport), waits `max_wait_time`,
//! aggregates what came back and reconciles the neighbor table.

pub mod prober;
pub mod samples;

pub use prober::{NeighborSnapshot, Radar};
pub use samples::{aggregate, SampleBuffer, SampleRecorder};
