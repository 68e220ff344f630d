/// Runtime tests: the radar loop over an in-memory transport, in paused
/// tokio time.
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use radar_protocol::{
    BroadcastTransport, EventKind, Probe, RadarConfig, RadarError, RadarRuntime, SampleRecorder,
};
use tokio::time::Instant;

/// Answers every send once per peer after the peer's round trip.
struct LoopTransport {
    recorder: SampleRecorder,
    peers: Mutex<Vec<(IpAddr, &'static str, Duration)>>,
}

impl LoopTransport {
    fn new(recorder: SampleRecorder) -> Arc<Self> {
        Arc::new(Self {
            recorder,
            peers: Mutex::new(Vec::new()),
        })
    }

    fn set_peers(&self, peers: Vec<(IpAddr, &'static str, Duration)>) {
        *self.peers.lock().unwrap() = peers;
    }
}

#[async_trait::async_trait]
impl BroadcastTransport for LoopTransport {
    async fn send_probe(&self, probe: Probe) -> Result<(), String> {
        let peers = self.peers.lock().unwrap().clone();
        for (ip, device, round_trip) in peers {
            let recorder = self.recorder.clone();
            tokio::spawn(async move {
                tokio::time::sleep(round_trip).await;
                recorder.record_reply(ip, device, Instant::now(), probe.cycle);
            });
        }
        Ok(())
    }
}

fn ip(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 9, 0, last))
}

fn config() -> RadarConfig {
    RadarConfig::new()
        .bouquet_size(4)
        .max_neigh(4)
        .max_wait_time(Duration::from_millis(100))
        .cycle_interval(Duration::from_secs(3600))
}

#[tokio::test(start_paused = true)]
async fn runtime_publishes_discoveries() {
    let recorder = SampleRecorder::new();
    let transport = LoopTransport::new(recorder.clone());
    transport.set_peers(vec![(ip(1), "eth0", Duration::from_millis(8))]);

    let (handle, _task) = RadarRuntime::spawn(transport, recorder, config()).unwrap();
    let mut new = handle.subscribe(EventKind::New);

    let event = new.recv().await.expect("event");
    assert_eq!(event.record().ip, ip(1));
    assert_eq!(event.record().rtt, Duration::from_millis(4));
    assert_eq!(event.record().device.as_deref(), Some("eth0"));

    let neighbors = handle.neighbor_list();
    assert_eq!(neighbors.len(), 1);
    assert_eq!(neighbors[0].ip, ip(1));

    let stats = handle.stats();
    assert_eq!(stats.cycles, 1);
    assert_eq!(stats.probes_sent, 4);
    assert_eq!(stats.samples_recorded, 4);
}

#[tokio::test(start_paused = true)]
async fn probe_now_skips_the_pause() {
    let recorder = SampleRecorder::new();
    let transport = LoopTransport::new(recorder.clone());
    transport.set_peers(vec![(ip(1), "eth0", Duration::from_millis(8))]);

    let start = Instant::now();
    let (handle, _task) = RadarRuntime::spawn(transport.clone(), recorder, config()).unwrap();
    let mut all = handle.subscribe_all();
    assert_eq!(all.recv().await.map(|e| e.kind()), Some(EventKind::New));

    transport.set_peers(Vec::new());
    handle.probe_now().await.unwrap();

    let removed = all.recv().await.expect("event");
    assert_eq!(removed.kind(), EventKind::Removed);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(handle.neighbor_list().is_empty());
}

#[tokio::test(start_paused = true)]
async fn shutdown_lets_the_running_cycle_finish() {
    let recorder = SampleRecorder::new();
    let transport = LoopTransport::new(recorder.clone());
    transport.set_peers(vec![(ip(2), "eth0", Duration::from_millis(20))]);

    let start = Instant::now();
    let (handle, task) = RadarRuntime::spawn(transport, recorder, config()).unwrap();
    handle.shutdown().await;
    task.await.unwrap();

    assert_eq!(start.elapsed(), Duration::from_millis(100));
    assert_eq!(handle.stats().cycles, 1);
    assert_eq!(handle.neighbor_list().len(), 1);
    assert!(matches!(handle.probe_now().await, Err(RadarError::Shutdown)));
}

#[tokio::test(start_paused = true)]
async fn back_to_back_cycles_without_pause() {
    let recorder = SampleRecorder::new();
    let transport = LoopTransport::new(recorder.clone());
    transport.set_peers(vec![(ip(3), "eth0", Duration::from_millis(2))]);

    let config = config().cycle_interval(Duration::ZERO);
    let (handle, _task) = RadarRuntime::spawn(transport, recorder, config).unwrap();

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(handle.stats().cycles, 3);
    assert_eq!(handle.neighbor_list().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_peer_is_never_credited_to_the_next_cycle() {
    let recorder = SampleRecorder::new();
    let transport = LoopTransport::new(recorder.clone());
    // Answers after 150ms; every cycle gives up at 100ms.
    transport.set_peers(vec![(ip(4), "eth0", Duration::from_millis(150))]);

    let config = config().bouquet_size(1).cycle_interval(Duration::ZERO);
    let (handle, _task) = RadarRuntime::spawn(transport, recorder, config).unwrap();

    tokio::time::sleep(Duration::from_millis(320)).await;
    let stats = handle.stats();
    assert_eq!(stats.cycles, 3);
    assert_eq!(stats.samples_recorded, 0);
    assert_eq!(stats.samples_dropped, 2);
    assert!(handle.neighbor_list().is_empty());
}

#[tokio::test]
async fn spawn_rejects_invalid_config() {
    let recorder = SampleRecorder::new();
    let transport = LoopTransport::new(recorder.clone());
    let result = RadarRuntime::spawn(transport, recorder, config().bouquet_size(0));
    assert!(matches!(result, Err(RadarError::Config(_))));
}
