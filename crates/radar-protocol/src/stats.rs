//! Radar counters.
//!
//! [`RadarStats`] is shared between the discovery loop, the reply
//! collector and any reader holding a [`crate::RadarHandle`]. Every field
//! is an atomic bumped with [`Ordering::Relaxed`]; readers take a
//! [`StatsSnapshot`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Monotonic radar counters.
#[derive(Default)]
pub struct RadarStats {
    cycles: AtomicU64,
    probes_sent: AtomicU64,
    probe_failures: AtomicU64,
    samples_recorded: AtomicU64,
    samples_dropped: AtomicU64,
    allocation_failures: AtomicU64,
}

impl RadarStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn cycle_completed(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn probe_sent(&self) {
        self.probes_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn probe_failed(&self) {
        self.probe_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn sample_recorded(&self) {
        self.samples_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn sample_dropped(&self) {
        self.samples_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn allocation_failed(&self, n: u64) {
        self.allocation_failures.fetch_add(n, Ordering::Relaxed);
    }

    /// Read every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            probes_sent: self.probes_sent.load(Ordering::Relaxed),
            probe_failures: self.probe_failures.load(Ordering::Relaxed),
            samples_recorded: self.samples_recorded.load(Ordering::Relaxed),
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
            allocation_failures: self.allocation_failures.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for RadarStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.snapshot().fmt(f)
    }
}

/// Point-in-time copy of [`RadarStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Completed discovery cycles.
    pub cycles: u64,
    /// Probe broadcasts handed to the transport successfully.
    pub probes_sent: u64,
    /// Probe broadcasts the transport rejected.
    pub probe_failures: u64,
    /// Replies accepted into a cycle's sample buffer.
    pub samples_recorded: u64,
    /// Replies that arrived while no collection window was open.
    pub samples_dropped: u64,
    /// Candidates dropped because the ID space was exhausted.
    pub allocation_failures: u64,
}
