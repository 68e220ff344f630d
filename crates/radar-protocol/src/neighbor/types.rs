/// Neighbor types for the radar.
///
/// Identifiers, immutable neighbor snapshots and the three change events
/// the routing layer consumes.
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Name of the local interface a neighbor is reached through.
pub type DeviceName = String;

/// Stable neighbor identifier in `[0, max_neigh)`.
///
/// Unique among live neighbors; released and reused once a neighbor leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NeighborId(usize);

impl NeighborId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NeighborId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Aggregated latency toward one peer.
///
/// Single-path mode pins the best device; multipath leaves `device` empty
/// since the routing layer spreads traffic over all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRtt {
    pub device: Option<DeviceName>,
    #[serde(with = "humantime_serde")]
    pub rtt: Duration,
}

impl PathRtt {
    /// Latency pinned to one device.
    pub fn via(device: impl Into<DeviceName>, rtt: Duration) -> Self {
        Self {
            device: Some(device.into()),
            rtt,
        }
    }

    /// Latency aggregated over every device.
    pub fn multipath(rtt: Duration) -> Self {
        Self { device: None, rtt }
    }
}

/// One cycle's aggregated result: peer IP → latency.
pub type CandidateTable = BTreeMap<IpAddr, PathRtt>;

/// Immutable snapshot of one neighbor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborRecord {
    pub ip: IpAddr,
    pub id: NeighborId,
    pub device: Option<DeviceName>,
    #[serde(with = "humantime_serde")]
    pub rtt: Duration,
}

impl NeighborRecord {
    pub fn new(ip: IpAddr, id: NeighborId, path: &PathRtt) -> Self {
        Self {
            ip,
            id,
            device: path.device.clone(),
            rtt: path.rtt,
        }
    }
}

impl fmt::Display for NeighborRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:?}", self.id, self.ip, self.rtt)?;
        if let Some(device) = &self.device {
            write!(f, " via {device}")?;
        }
        Ok(())
    }
}

/// Kinds of neighbor change, used to pick a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    New,
    Removed,
    RttChanged,
}

/// A change to the neighbor table, emitted once per reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NeighborEvent {
    /// A peer entered the table and got an ID.
    New(NeighborRecord),

    /// A peer left the table; carries its last known record.
    Removed(NeighborRecord),

    /// A live peer's latency moved past the variation threshold.
    RttChanged {
        record: NeighborRecord,
        #[serde(with = "humantime_serde")]
        previous_rtt: Duration,
    },
}

impl NeighborEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            NeighborEvent::New(_) => EventKind::New,
            NeighborEvent::Removed(_) => EventKind::Removed,
            NeighborEvent::RttChanged { .. } => EventKind::RttChanged,
        }
    }

    pub fn record(&self) -> &NeighborRecord {
        match self {
            NeighborEvent::New(record)
            | NeighborEvent::Removed(record)
            | NeighborEvent::RttChanged { record, .. } => record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn record() -> NeighborRecord {
        NeighborRecord::new(
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            NeighborId::new(3),
            &PathRtt::via("eth0", Duration::from_millis(5)),
        )
    }

    #[test]
    fn event_kind_and_record() {
        let new = NeighborEvent::New(record());
        let changed = NeighborEvent::RttChanged {
            record: record(),
            previous_rtt: Duration::from_millis(1),
        };
        assert_eq!(new.kind(), EventKind::New);
        assert_eq!(NeighborEvent::Removed(record()).kind(), EventKind::Removed);
        assert_eq!(changed.kind(), EventKind::RttChanged);
        assert_eq!(changed.record().id, NeighborId::new(3));
    }

    #[test]
    fn record_display() {
        assert_eq!(record().to_string(), "#3 10.0.0.1 5ms via eth0");

        let mut multipath = record();
        multipath.device = None;
        assert_eq!(multipath.to_string(), "#3 10.0.0.1 5ms");
    }

    #[test]
    fn event_json_shape() {
        let event = NeighborEvent::RttChanged {
            record: record(),
            previous_rtt: Duration::from_millis(20),
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["event"], "rtt_changed");
        assert_eq!(json["record"]["ip"], "10.0.0.1");
        assert_eq!(json["record"]["id"], 3);
        assert_eq!(json["record"]["rtt"], "5ms");
        assert_eq!(json["previous_rtt"], "20ms");

        let json = serde_json::to_value(NeighborEvent::New(record())).expect("serialize");
        assert_eq!(json["event"], "new");
        assert_eq!(json["device"], "eth0");
    }
}
