use std::io::Write;

use chrono::{SecondsFormat, Utc};
use radar_protocol::{NeighborEvent, NeighborRecord, StatsSnapshot};
use serde::Serialize;

/// Emit a JSONL event to stdout (flushed immediately for piped output).
pub fn emit<T: Serialize>(event: &T) {
    if let Ok(json) = serde_json::to_string(event) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        let _ = writeln!(lock, "{json}");
        let _ = lock.flush();
    }
}

/// RFC 3339 timestamp for JSONL events.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ── Session events ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct EventStarted {
    pub event: &'static str,
    pub mode: &'static str,
    pub port: u16,
    pub devices: Vec<String>,
    pub timestamp: String,
}

impl EventStarted {
    pub fn new<'a>(
        mode: &'static str,
        port: u16,
        devices: impl IntoIterator<Item = &'a radar_transport::Device>,
    ) -> Self {
        Self {
            event: "started",
            mode,
            port,
            devices: devices.into_iter().map(|d| d.to_string()).collect(),
            timestamp: now_iso(),
        }
    }
}

#[derive(Serialize)]
pub struct EventStopped {
    pub event: &'static str,
    #[serde(flatten)]
    pub stats: StatsSnapshot,
    pub timestamp: String,
}

impl EventStopped {
    pub fn new(stats: StatsSnapshot) -> Self {
        Self {
            event: "stopped",
            stats,
            timestamp: now_iso(),
        }
    }
}

// ── Neighbor events ─────────────────────────────────────────────

/// One neighbor change; `event` is `new`, `removed` or `rtt_changed`.
#[derive(Serialize)]
pub struct EventNeighbor<'a> {
    #[serde(flatten)]
    pub change: &'a NeighborEvent,
    pub timestamp: String,
}

impl<'a> EventNeighbor<'a> {
    pub fn new(change: &'a NeighborEvent) -> Self {
        Self {
            change,
            timestamp: now_iso(),
        }
    }
}

/// The whole neighbor table, emitted when it differs from the last one.
#[derive(Serialize)]
pub struct EventNeighbors<'a> {
    pub event: &'static str,
    pub count: usize,
    pub neighbors: &'a [NeighborRecord],
    pub timestamp: String,
}

impl<'a> EventNeighbors<'a> {
    pub fn new(neighbors: &'a [NeighborRecord]) -> Self {
        Self {
            event: "neighbors",
            count: neighbors.len(),
            neighbors,
            timestamp: now_iso(),
        }
    }
}
