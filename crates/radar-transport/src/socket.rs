use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::{Device, RadarSocketConfig};
use crate::frame::{ProbeFrame, MAX_FRAME_SIZE};
use crate::TransportError;

/// A reply attributed to a peer, the interface it arrived on and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyEvent {
    pub ip: IpAddr,
    pub device: String,
    pub arrival: Instant,
    pub cycle: u64,
}

struct DeviceSocket {
    device: Device,
    socket: Arc<UdpSocket>,
}

/// UDP broadcast transport for the radar.
///
/// One socket per configured device sends probes and receives the
/// unicast replies to them; an optional responder socket listens on the
/// radar port and answers other nodes' probes. Replies belonging to an
/// older cycle than the last probe sent are dropped here, so consumers
/// only ever see replies for the cycle in progress.
pub struct RadarSocket {
    origin: u64,
    port: u16,
    devices: Vec<DeviceSocket>,
    responder_addr: Option<SocketAddr>,
    current_cycle: Arc<AtomicU64>,
    tasks: Vec<JoinHandle<()>>,
}

impl RadarSocket {
    /// Bind all device sockets (and the responder) and start receiving.
    ///
    /// Returns the socket and the channel replies are delivered on.
    pub async fn bind(
        config: RadarSocketConfig,
    ) -> Result<(Self, mpsc::Receiver<ReplyEvent>), TransportError> {
        if config.devices.is_empty() && !config.respond {
            return Err(TransportError::NoDevices);
        }

        let origin = rand::random::<u64>();
        let current_cycle = Arc::new(AtomicU64::new(0));
        let (reply_tx, reply_rx) = mpsc::channel(config.reply_buffer);
        let mut tasks = Vec::new();

        let mut responder_addr = None;
        let mut port = config.port;
        if config.respond {
            let socket = bind_udp(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)).await?;
            let local = socket.local_addr().map_err(|source| TransportError::Bind {
                addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
                source,
            })?;
            port = local.port();
            responder_addr = Some(local);
            tracing::info!(%local, "radar: responder listening");
            tasks.push(tokio::spawn(respond_loop(socket, origin)));
        }

        let mut devices = Vec::with_capacity(config.devices.len());
        for device in config.devices {
            let socket = Arc::new(bind_udp(SocketAddr::new(IpAddr::V4(device.addr), 0)).await?);
            tracing::info!(device = %device.name, addr = %device.addr, "radar: device bound");
            tasks.push(tokio::spawn(recv_loop(
                Arc::clone(&socket),
                device.name.clone(),
                origin,
                Arc::clone(&current_cycle),
                reply_tx.clone(),
            )));
            devices.push(DeviceSocket { device, socket });
        }

        Ok((
            Self {
                origin,
                port,
                devices,
                responder_addr,
                current_cycle,
                tasks,
            },
            reply_rx,
        ))
    }

    /// Random tag identifying this node's probes.
    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Port probes are sent to (the responder's port when it picked one).
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter().map(|d| &d.device)
    }

    /// Local address of each device socket, keyed by device name.
    pub fn device_addrs(&self) -> Vec<(String, SocketAddr)> {
        self.devices
            .iter()
            .filter_map(|d| Some((d.device.name.clone(), d.socket.local_addr().ok()?)))
            .collect()
    }

    /// Address the responder listens on, if responding is enabled.
    pub fn responder_addr(&self) -> Option<SocketAddr> {
        self.responder_addr
    }

    /// Latest cycle a probe was sent for.
    pub fn current_cycle(&self) -> u64 {
        self.current_cycle.load(Ordering::Acquire)
    }

    /// Broadcast one probe for `cycle` on every device.
    ///
    /// A failing device does not stop the others; the first error is
    /// returned once all devices have been tried.
    pub async fn send_probe(&self, cycle: u64, seq: u32) -> Result<(), TransportError> {
        self.current_cycle.fetch_max(cycle, Ordering::AcqRel);

        let bytes = ProbeFrame::Probe {
            origin: self.origin,
            cycle,
            seq,
        }
        .to_bytes()?;

        let mut first_err = None;
        for d in &self.devices {
            let target = SocketAddr::new(IpAddr::V4(d.device.broadcast), self.port);
            if let Err(source) = d.socket.send_to(&bytes, target).await {
                tracing::warn!(device = %d.device.name, %target, "radar: probe send failed: {source}");
                first_err.get_or_insert(TransportError::Send {
                    device: d.device.name.clone(),
                    source,
                });
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Stop all background tasks.
    pub fn shutdown(mut self) {
        self.abort_tasks();
    }

    fn abort_tasks(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for RadarSocket {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

async fn bind_udp(addr: SocketAddr) -> Result<UdpSocket, TransportError> {
    let socket = UdpSocket::bind(addr)
        .await
        .map_err(|source| TransportError::Bind { addr, source })?;
    socket
        .set_broadcast(true)
        .map_err(|source| TransportError::Bind { addr, source })?;
    Ok(socket)
}

const RECV_BACKOFF_MIN: Duration = Duration::from_millis(10);
const RECV_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Delay between retries after consecutive `recv_from` errors.
///
/// Doubles per failure up to [`RECV_BACKOFF_MAX`]; a successful receive
/// resets it.
#[derive(Debug, Default)]
struct RecvBackoff {
    failures: u32,
}

impl RecvBackoff {
    fn failed(&mut self) -> Duration {
        let delay = RECV_BACKOFF_MIN
            .saturating_mul(1u32 << self.failures.min(16))
            .min(RECV_BACKOFF_MAX);
        self.failures = self.failures.saturating_add(1);
        delay
    }

    fn succeeded(&mut self) {
        self.failures = 0;
    }

    fn failures(&self) -> u32 {
        self.failures
    }
}

/// Receive replies on one device socket and forward the current cycle's.
async fn recv_loop(
    socket: Arc<UdpSocket>,
    device: String,
    origin: u64,
    current_cycle: Arc<AtomicU64>,
    reply_tx: mpsc::Sender<ReplyEvent>,
) {
    let mut buf = [0u8; MAX_FRAME_SIZE];
    let mut backoff = RecvBackoff::default();
    loop {
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                let delay = backoff.failed();
                tracing::warn!(%device, failures = backoff.failures(), ?delay, "radar: recv failed: {e}");
                tokio::time::sleep(delay).await;
                continue;
            }
        };
        backoff.succeeded();
        let arrival = Instant::now();

        let frame = match ProbeFrame::from_bytes(&buf[..len]) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(%device, %from, "radar: dropping malformed frame: {e}");
                continue;
            }
        };

        let cycle = match frame {
            ProbeFrame::Reply { origin: o, cycle, .. } if o == origin => cycle,
            _ => continue,
        };
        if cycle != current_cycle.load(Ordering::Acquire) {
            tracing::trace!(%device, %from, cycle, "radar: dropping stale reply");
            continue;
        }

        let reply = ReplyEvent {
            ip: from.ip(),
            device: device.clone(),
            arrival,
            cycle,
        };
        if reply_tx.send(reply).await.is_err() {
            break;
        }
    }
}

/// Answer every foreign probe with a unicast reply to its sender.
async fn respond_loop(socket: UdpSocket, origin: u64) {
    let mut buf = [0u8; MAX_FRAME_SIZE];
    let mut backoff = RecvBackoff::default();
    loop {
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                let delay = backoff.failed();
                tracing::warn!(failures = backoff.failures(), ?delay, "radar: responder recv failed: {e}");
                tokio::time::sleep(delay).await;
                continue;
            }
        };
        backoff.succeeded();

        let reply = match ProbeFrame::from_bytes(&buf[..len]) {
            Ok(frame) if frame.origin() != origin => frame.reply(),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(%from, "radar: responder dropping malformed frame: {e}");
                None
            }
        };
        let Some(reply) = reply else { continue };

        match reply.to_bytes() {
            Ok(bytes) => {
                if let Err(e) = socket.send_to(&bytes, from).await {
                    tracing::debug!(%from, "radar: reply send failed: {e}");
                }
            }
            Err(e) => tracing::warn!("radar: reply encoding failed: {e}"),
        }
    }
}
