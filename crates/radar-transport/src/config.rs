use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::TransportError;

/// Default UDP port radar probes are broadcast to.
pub const DEFAULT_PORT: u16 = 269;

/// A local network interface probes are sent on.
///
/// Replies received on the interface's socket are attributed to `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Device {
    /// Interface name (e.g. `eth0`), used to tag samples.
    pub name: String,
    /// Local address the probe socket binds to.
    pub addr: Ipv4Addr,
    /// Broadcast address of the interface's subnet.
    pub broadcast: Ipv4Addr,
}

impl Device {
    pub fn new(name: impl Into<String>, addr: Ipv4Addr, broadcast: Ipv4Addr) -> Self {
        Self {
            name: name.into(),
            addr,
            broadcast,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}/{}", self.name, self.addr, self.broadcast)
    }
}

/// Parses `NAME=ADDR/BROADCAST`, e.g. `eth0=192.168.1.10/192.168.1.255`.
impl FromStr for Device {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TransportError::InvalidDevice {
            spec: s.to_string(),
            reason: reason.to_string(),
        };

        let (name, addrs) = s
            .split_once('=')
            .ok_or_else(|| invalid("expected NAME=ADDR/BROADCAST"))?;
        if name.is_empty() {
            return Err(invalid("empty device name"));
        }
        let (addr, broadcast) = addrs
            .split_once('/')
            .ok_or_else(|| invalid("expected NAME=ADDR/BROADCAST"))?;

        let addr = addr
            .parse::<Ipv4Addr>()
            .map_err(|e| invalid(&format!("bad address: {e}")))?;
        let broadcast = broadcast
            .parse::<Ipv4Addr>()
            .map_err(|e| invalid(&format!("bad broadcast address: {e}")))?;

        Ok(Self::new(name, addr, broadcast))
    }
}

/// Configuration for a [`RadarSocket`](crate::RadarSocket).
///
/// ```rust
/// use radar_transport::{Device, RadarSocketConfig};
/// use std::net::Ipv4Addr;
///
/// let config = RadarSocketConfig::new()
///     .port(2690)
///     .device(Device::new("eth0", Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 255)))
///     .respond(false);
/// ```
#[derive(Debug, Clone)]
pub struct RadarSocketConfig {
    /// Port probes are broadcast to and the responder listens on.
    pub(crate) port: u16,
    /// Interfaces probes go out on.
    pub(crate) devices: Vec<Device>,
    /// Answer probes sent by other nodes.
    pub(crate) respond: bool,
    /// Capacity of the reply channel handed to the caller.
    pub(crate) reply_buffer: usize,
}

impl Default for RadarSocketConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RadarSocketConfig {
    pub fn new() -> Self {
        Self {
            port: DEFAULT_PORT,
            devices: Vec::new(),
            respond: true,
            reply_buffer: 1024,
        }
    }

    /// Set the radar port (default: 269). Port 0 lets the responder pick one.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Add one interface.
    pub fn device(mut self, device: Device) -> Self {
        self.devices.push(device);
        self
    }

    /// Replace the interface list.
    pub fn devices(mut self, devices: impl IntoIterator<Item = Device>) -> Self {
        self.devices = devices.into_iter().collect();
        self
    }

    /// Enable or disable answering foreign probes (default: enabled).
    pub fn respond(mut self, enabled: bool) -> Self {
        self.respond = enabled;
        self
    }

    /// Set the reply channel capacity (default: 1024).
    pub fn reply_buffer(mut self, capacity: usize) -> Self {
        self.reply_buffer = capacity.max(1);
        self
    }
}
