/// Radar runtime: runs discovery cycles in a background task.
///
/// The runtime owns the [`Radar`] (and through it the neighbor table).
/// The application only holds a [`RadarHandle`]: it reads snapshots,
/// subscribes to events and sends commands, never touching the table.
mod r#loop;

use std::sync::Arc;

use radar_transport::{RadarSocket, RadarSocketConfig, ReplyEvent};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::bus::{EventSubscription, NotificationBus};
use crate::config::RadarConfig;
use crate::error::RadarError;
use crate::neighbor::{EventKind, NeighborRecord};
use crate::radar::{NeighborSnapshot, Radar, SampleRecorder};
use crate::stats::{RadarStats, StatsSnapshot};
use crate::transport::BroadcastTransport;

// ── Commands (app → runtime) ──────────────────────────────────────────

/// Commands the application sends to the radar loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadarCommand {
    /// Cut the current pause short and start the next cycle now.
    ProbeNow,
    /// Stop after the running cycle completes.
    Shutdown,
}

// ── RadarHandle (app-facing API) ─────────────────────────────────────

/// Handle to a running radar.
///
/// Cheap to clone. Event streams stay open as long as a handle exists.
#[derive(Clone)]
pub struct RadarHandle {
    cmd_tx: mpsc::Sender<RadarCommand>,
    neighbors: watch::Receiver<NeighborSnapshot>,
    bus: NotificationBus,
    stats: Arc<RadarStats>,
}

impl RadarHandle {
    /// Live neighbors as of the last completed cycle, ordered by IP.
    pub fn neighbor_list(&self) -> Vec<NeighborRecord> {
        self.neighbors.borrow().to_vec()
    }

    /// Watch the neighbor list; changes once per completed cycle.
    pub fn neighbors(&self) -> watch::Receiver<NeighborSnapshot> {
        self.neighbors.clone()
    }

    /// Stream of one kind of neighbor event.
    pub fn subscribe(&self, kind: EventKind) -> EventSubscription {
        self.bus.subscribe(kind)
    }

    /// Stream of every neighbor event.
    pub fn subscribe_all(&self) -> EventSubscription {
        self.bus.subscribe_all()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Start the next cycle without waiting out the pause.
    pub async fn probe_now(&self) -> Result<(), RadarError> {
        self.cmd_tx
            .send(RadarCommand::ProbeNow)
            .await
            .map_err(|_| RadarError::Shutdown)
    }

    /// Ask the radar to stop once its current cycle completes.
    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(RadarCommand::Shutdown).await;
    }
}

// ── RadarRuntime ─────────────────────────────────────────────────────

/// Entry point: builds the radar and spawns its loop.
pub struct RadarRuntime;

impl RadarRuntime {
    /// Start the radar over any transport.
    ///
    /// `recorder` must be the one the transport feeds replies into. The
    /// returned task ends after a shutdown, or once every handle is gone.
    pub fn spawn<T: BroadcastTransport>(
        transport: Arc<T>,
        recorder: SampleRecorder,
        config: RadarConfig,
    ) -> Result<(RadarHandle, JoinHandle<()>), RadarError> {
        let radar = Radar::new(transport, recorder, config)?;

        let (cmd_tx, cmd_rx) = mpsc::channel::<RadarCommand>(16);
        let handle = RadarHandle {
            cmd_tx,
            neighbors: radar.snapshots(),
            bus: radar.bus().clone(),
            stats: radar.stats(),
        };

        let task = tokio::spawn(r#loop::radar_loop(radar, cmd_rx));
        Ok((handle, task))
    }

    /// Bind a [`RadarSocket`] and start the radar over it.
    ///
    /// The config is checked before any socket is opened.
    pub async fn bind(
        socket_config: RadarSocketConfig,
        config: RadarConfig,
    ) -> Result<(RadarHandle, JoinHandle<()>), RadarError> {
        config.validate()?;
        let (socket, replies) = RadarSocket::bind(socket_config).await?;
        tracing::info!(
            origin = socket.origin(),
            port = socket.port(),
            devices = socket.devices().count(),
            "radar: socket bound"
        );
        Self::spawn_with_replies(socket, replies, config)
    }

    /// Start the radar over a bound [`RadarSocket`].
    ///
    /// Spawns a collector that feeds the socket's replies to the cycle's
    /// sample buffer.
    pub fn spawn_with_replies(
        socket: RadarSocket,
        replies: mpsc::Receiver<ReplyEvent>,
        config: RadarConfig,
    ) -> Result<(RadarHandle, JoinHandle<()>), RadarError> {
        let recorder = SampleRecorder::new();
        let spawned = Self::spawn(Arc::new(socket), recorder.clone(), config)?;
        tokio::spawn(collect_replies(recorder, replies));
        Ok(spawned)
    }
}

/// Feed socket replies into the recorder until the socket closes.
///
/// Each reply is matched against the cycle it answers; the recorder drops
/// anything meant for another cycle.
async fn collect_replies(recorder: SampleRecorder, mut replies: mpsc::Receiver<ReplyEvent>) {
    while let Some(reply) = replies.recv().await {
        recorder.record_reply(reply.ip, &reply.device, reply.arrival, reply.cycle);
    }
    tracing::debug!("radar: reply stream closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use radar_transport::TransportError;

    fn reply(last: u8, cycle: u64, arrival: tokio::time::Instant) -> ReplyEvent {
        ReplyEvent {
            ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, last)),
            device: "eth0".to_string(),
            arrival,
            cycle,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn collector_keeps_only_the_open_cycle() {
        let recorder = SampleRecorder::new();
        let (tx, rx) = mpsc::channel(8);
        let start = recorder.begin_cycle(2);

        tx.send(reply(1, 1, start + Duration::from_millis(3))).await.unwrap();
        tx.send(reply(2, 2, start + Duration::from_millis(6))).await.unwrap();
        tx.send(reply(3, 3, start + Duration::from_millis(6))).await.unwrap();
        drop(tx);
        collect_replies(recorder.clone(), rx).await;

        let buffer = recorder.close();
        assert_eq!(buffer.len(), 1);
        assert_eq!(
            buffer[&IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2))]["eth0"],
            vec![Duration::from_millis(3)]
        );
        let stats = recorder.stats().snapshot();
        assert_eq!(stats.samples_recorded, 1);
        assert_eq!(stats.samples_dropped, 2);
    }

    #[tokio::test]
    async fn bind_without_devices_is_a_transport_error() {
        let socket_config = RadarSocketConfig::new().port(0).respond(false);
        let result = RadarRuntime::bind(socket_config, RadarConfig::default()).await;
        assert!(matches!(
            result,
            Err(RadarError::Transport(TransportError::NoDevices))
        ));
    }

    #[tokio::test]
    async fn bind_checks_config_first() {
        let socket_config = RadarSocketConfig::new().port(0).respond(false);
        let config = RadarConfig::default().max_neigh(0);
        let result = RadarRuntime::bind(socket_config, config).await;
        assert!(matches!(result, Err(RadarError::Config(_))));
    }
}
