//! Cycle-scoped sample collection and RTT aggregation.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::neighbor::{CandidateTable, DeviceName, PathRtt};
use crate::stats::RadarStats;

/// Latency samples of one cycle: peer IP → device → one-way latencies.
pub type SampleBuffer = HashMap<IpAddr, BTreeMap<DeviceName, Vec<Duration>>>;

#[derive(Debug, Default)]
struct Window {
    /// Cycle start; `None` while no window is open.
    start: Option<Instant>,
    /// Number of the cycle the window belongs to.
    cycle: u64,
    buffer: SampleBuffer,
}

/// Shared handle the transport side calls `record_sample` on.
///
/// Cheap to clone. A window opens with [`begin_cycle`](Self::begin_cycle)
/// and closes with [`close`](Self::close); samples outside a window are
/// counted and discarded.
#[derive(Debug, Clone)]
pub struct SampleRecorder {
    window: Arc<Mutex<Window>>,
    stats: Arc<RadarStats>,
}

impl SampleRecorder {
    pub fn new() -> Self {
        Self::with_stats(Arc::new(RadarStats::new()))
    }

    pub fn with_stats(stats: Arc<RadarStats>) -> Self {
        Self {
            window: Arc::new(Mutex::new(Window::default())),
            stats,
        }
    }

    pub fn stats(&self) -> Arc<RadarStats> {
        self.stats.clone()
    }

    /// Open a fresh window for `cycle` starting now and return its start time.
    pub fn begin_cycle(&self, cycle: u64) -> Instant {
        let start = Instant::now();
        let mut window = self.lock();
        window.start = Some(start);
        window.cycle = cycle;
        window.buffer.clear();
        start
    }

    /// Cycle of the open window, `None` while closed.
    pub fn current_cycle(&self) -> Option<u64> {
        let window = self.lock();
        window.start.map(|_| window.cycle)
    }

    /// Record one attributed reply.
    ///
    /// The one-way latency is half the time since the cycle started.
    /// Returns `false` if no window was open or `arrival` predates it.
    pub fn record_sample(&self, ip: IpAddr, device: &str, arrival: Instant) -> bool {
        self.record(ip, device, arrival, None)
    }

    /// Record a reply tagged with the cycle it answers.
    ///
    /// Like [`record_sample`](Self::record_sample), but a reply to any
    /// other cycle than the open one is dropped.
    pub fn record_reply(&self, ip: IpAddr, device: &str, arrival: Instant, cycle: u64) -> bool {
        self.record(ip, device, arrival, Some(cycle))
    }

    fn record(&self, ip: IpAddr, device: &str, arrival: Instant, cycle: Option<u64>) -> bool {
        let mut window = self.lock();
        let Some(start) = window.start else {
            drop(window);
            return self.drop_sample(ip, device, "outside collection window");
        };
        if cycle.is_some_and(|c| c != window.cycle) {
            drop(window);
            return self.drop_sample(ip, device, "reply to another cycle");
        }
        let Some(round_trip) = arrival.checked_duration_since(start) else {
            drop(window);
            return self.drop_sample(ip, device, "arrival before cycle start");
        };
        let latency = round_trip / 2;
        window
            .buffer
            .entry(ip)
            .or_default()
            .entry(device.to_string())
            .or_default()
            .push(latency);
        drop(window);

        self.stats.sample_recorded();
        tracing::trace!(%ip, device, ?latency, "radar: sample recorded");
        true
    }

    /// Close the window and take its samples.
    pub fn close(&self) -> SampleBuffer {
        let mut window = self.lock();
        window.start = None;
        std::mem::take(&mut window.buffer)
    }

    pub fn is_open(&self) -> bool {
        self.lock().start.is_some()
    }

    fn drop_sample(&self, ip: IpAddr, device: &str, reason: &'static str) -> bool {
        self.stats.sample_dropped();
        tracing::debug!(%ip, device, reason, "radar: sample dropped");
        false
    }

    fn lock(&self) -> MutexGuard<'_, Window> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SampleRecorder {
    fn default() -> Self {
        Self::new()
    }
}

fn mean(samples: &[Duration]) -> Option<Duration> {
    let n = u32::try_from(samples.len()).ok().filter(|n| *n > 0)?;
    Some(samples.iter().sum::<Duration>() / n)
}

/// Turn a cycle's samples into one latency per peer.
///
/// Single-path: the device with the lowest mean wins (ties go to the
/// lowest device name). Multipath: the mean over every sample, with no
/// device. Peers without samples are left out.
pub fn aggregate(buffer: &SampleBuffer, multipath: bool) -> CandidateTable {
    let mut candidates = CandidateTable::new();
    for (ip, devices) in buffer {
        let path = if multipath {
            let all: Vec<Duration> = devices.values().flatten().copied().collect();
            mean(&all).map(PathRtt::multipath)
        } else {
            let mut best: Option<(&DeviceName, Duration)> = None;
            for (device, samples) in devices {
                let Some(rtt) = mean(samples) else { continue };
                match best {
                    Some((_, best_rtt)) if best_rtt <= rtt => {}
                    _ => best = Some((device, rtt)),
                }
            }
            best.map(|(device, rtt)| PathRtt::via(device.clone(), rtt))
        };
        if let Some(path) = path {
            candidates.insert(*ip, path);
        }
    }
    candidates
}
