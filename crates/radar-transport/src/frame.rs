use serde::{Deserialize, Serialize};

use crate::TransportError;

/// Largest frame we expect on the wire; anything bigger is not ours.
pub const MAX_FRAME_SIZE: usize = 512;

/// A radar datagram.
///
/// `origin` is the random tag of the node that sent the probe. A reply
/// echoes the probe's origin, cycle and sequence number unchanged so the
/// prober can tell its own replies from everyone else's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeFrame {
    Probe { origin: u64, cycle: u64, seq: u32 },
    Reply { origin: u64, cycle: u64, seq: u32 },
}

impl ProbeFrame {
    /// The reply a responder sends back for this frame, if it is a probe.
    pub fn reply(&self) -> Option<ProbeFrame> {
        match *self {
            ProbeFrame::Probe { origin, cycle, seq } => {
                Some(ProbeFrame::Reply { origin, cycle, seq })
            }
            ProbeFrame::Reply { .. } => None,
        }
    }

    pub fn origin(&self) -> u64 {
        match *self {
            ProbeFrame::Probe { origin, .. } | ProbeFrame::Reply { origin, .. } => origin,
        }
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TransportError> {
        rmp_serde::to_vec(self).map_err(Into::into)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TransportError> {
        rmp_serde::from_slice(data).map_err(Into::into)
    }
}
