use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::bus::NotificationBus;
use crate::config::RadarConfig;
use crate::error::RadarError;
use crate::neighbor::{CandidateTable, NeighborEvent, NeighborRecord, NeighborTable};
use crate::radar::samples::{aggregate, SampleRecorder};
use crate::stats::RadarStats;
use crate::transport::{BroadcastTransport, Probe};

/// Latest neighbor list, ordered by IP.
pub type NeighborSnapshot = Arc<Vec<NeighborRecord>>;

/// Discovery driver for one node.
///
/// Owns the neighbor table; the only way to change it is a cycle (or a
/// direct [`reconcile`](Self::reconcile)), which takes `&mut self`, so
/// readers only ever see whole snapshots.
pub struct Radar<T: BroadcastTransport> {
    transport: Arc<T>,
    config: RadarConfig,
    table: NeighborTable,
    recorder: SampleRecorder,
    bus: NotificationBus,
    snapshot_tx: watch::Sender<NeighborSnapshot>,
    stats: Arc<RadarStats>,
    cycle: u64,
}

impl<T: BroadcastTransport> Radar<T> {
    /// Build a radar around `transport`.
    ///
    /// `recorder` must be the one the transport feeds replies into.
    pub fn new(
        transport: Arc<T>,
        recorder: SampleRecorder,
        config: RadarConfig,
    ) -> Result<Self, RadarError> {
        config.validate()?;
        let (snapshot_tx, _) = watch::channel(Arc::new(Vec::new()));
        Ok(Self {
            transport,
            table: NeighborTable::from_config(&config),
            bus: NotificationBus::new(config.event_buffer),
            stats: recorder.stats(),
            recorder,
            config,
            snapshot_tx,
            cycle: 0,
        })
    }

    pub fn config(&self) -> &RadarConfig {
        &self.config
    }

    pub fn recorder(&self) -> &SampleRecorder {
        &self.recorder
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    pub fn table(&self) -> &NeighborTable {
        &self.table
    }

    pub fn stats(&self) -> Arc<RadarStats> {
        self.stats.clone()
    }

    /// Number of the last cycle started.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Live neighbors, ordered by IP.
    pub fn neighbor_list(&self) -> Vec<NeighborRecord> {
        self.table.snapshot()
    }

    /// Receiver that sees a new snapshot after every reconciliation.
    pub fn snapshots(&self) -> watch::Receiver<NeighborSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Run one full discovery cycle and return its events.
    ///
    /// Probe sends are fire-and-forget; the cycle ends `max_wait_time`
    /// after it started whether or not anything answered.
    pub async fn run_cycle(&mut self) -> Vec<NeighborEvent> {
        self.cycle += 1;
        let cycle = self.cycle;
        let started = self.recorder.begin_cycle(cycle);
        tracing::debug!(cycle, probes = self.config.bouquet_size, "radar: cycle started");

        for seq in 0..self.config.bouquet_size {
            let transport = self.transport.clone();
            let stats = self.stats.clone();
            tokio::spawn(async move {
                match transport.send_probe(Probe { cycle, seq }).await {
                    Ok(()) => stats.probe_sent(),
                    Err(e) => {
                        stats.probe_failed();
                        tracing::warn!(cycle, seq, "radar: probe send failed: {e}");
                    }
                }
            });
        }

        tokio::time::sleep_until(started + self.config.max_wait_time).await;

        let candidates = self.aggregate();
        let events = self.reconcile(candidates);
        self.stats.cycle_completed();
        tracing::debug!(
            cycle,
            neighbors = self.table.len(),
            events = events.len(),
            "radar: cycle complete"
        );
        events
    }

    /// Feed one reply to the current cycle.
    pub fn record_sample(&self, ip: IpAddr, device: &str, arrival: Instant) -> bool {
        self.recorder.record_sample(ip, device, arrival)
    }

    /// Close the collection window and aggregate its samples.
    pub fn aggregate(&self) -> CandidateTable {
        let buffer = self.recorder.close();
        aggregate(&buffer, self.config.multipath)
    }

    /// Apply a candidate table: update the neighbor table, then publish
    /// the events and the new snapshot.
    pub fn reconcile(&mut self, candidates: CandidateTable) -> Vec<NeighborEvent> {
        let failures = self.table.allocation_failures();
        let events = self.table.reconcile(candidates);
        let new_failures = self.table.allocation_failures() - failures;
        if new_failures > 0 {
            self.stats.allocation_failed(new_failures);
        }

        self.snapshot_tx.send_replace(Arc::new(self.table.snapshot()));
        for event in &events {
            self.bus.publish(event.clone());
        }
        events
    }
}
