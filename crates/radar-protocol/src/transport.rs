use serde::{Deserialize, Serialize};

/// One probe of a bouquet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    /// Discovery cycle the probe belongs to.
    pub cycle: u64,
    /// Position within the bouquet.
    pub seq: u32,
}

/// Broadcast abstraction for the radar.
///
/// In production: impl by `RadarSocket` (UDP broadcast on every device).
/// In tests: a scripted transport that answers probes in virtual time.
///
/// Replies do not come back through this trait: the transport feeds them
/// to the cycle's [`crate::SampleRecorder`].
#[async_trait::async_trait]
pub trait BroadcastTransport: Send + Sync + 'static {
    /// Fire one probe across all configured devices.
    async fn send_probe(&self, probe: Probe) -> Result<(), String>;
}

// ── Impl for RadarSocket (production) ───────────────────────────────

#[async_trait::async_trait]
impl BroadcastTransport for radar_transport::RadarSocket {
    async fn send_probe(&self, probe: Probe) -> Result<(), String> {
        radar_transport::RadarSocket::send_probe(self, probe.cycle, probe.seq)
            .await
            .map_err(|e| e.to_string())
    }
}

// ── ScriptedTransport (tests) ───────────────────────────────────────

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::net::IpAddr;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::radar::SampleRecorder;

    /// A peer that answers every probe after a fixed round trip.
    #[derive(Debug, Clone)]
    pub struct ScriptedPeer {
        pub ip: IpAddr,
        pub device: String,
        pub round_trip: Duration,
    }

    /// Fake transport: records probes and, for each one, schedules a
    /// reply per scripted peer after its round trip. Replies carry the
    /// cycle they answer, so the recorder drops late ones.
    #[derive(Clone)]
    pub struct ScriptedTransport {
        recorder: SampleRecorder,
        peers: Arc<Mutex<Vec<ScriptedPeer>>>,
        sent: Arc<Mutex<Vec<Probe>>>,
        fail_sends: Arc<Mutex<bool>>,
    }

    impl ScriptedTransport {
        pub fn new(recorder: SampleRecorder) -> Self {
            Self {
                recorder,
                peers: Arc::new(Mutex::new(Vec::new())),
                sent: Arc::new(Mutex::new(Vec::new())),
                fail_sends: Arc::new(Mutex::new(false)),
            }
        }

        pub fn add_peer(&self, ip: IpAddr, device: &str, round_trip: Duration) {
            self.peers.lock().unwrap().push(ScriptedPeer {
                ip,
                device: device.to_string(),
                round_trip,
            });
        }

        pub fn clear_peers(&self) {
            self.peers.lock().unwrap().clear();
        }

        pub fn sent(&self) -> Vec<Probe> {
            self.sent.lock().unwrap().clone()
        }

        pub fn set_fail_sends(&self, fail: bool) {
            *self.fail_sends.lock().unwrap() = fail;
        }
    }

    #[async_trait::async_trait]
    impl BroadcastTransport for ScriptedTransport {
        async fn send_probe(&self, probe: Probe) -> Result<(), String> {
            if *self.fail_sends.lock().unwrap() {
                return Err("mock send failure".into());
            }
            self.sent.lock().unwrap().push(probe);

            let peers = self.peers.lock().unwrap().clone();
            for peer in peers {
                let recorder = self.recorder.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(peer.round_trip).await;
                    let arrival = tokio::time::Instant::now();
                    recorder.record_reply(peer.ip, &peer.device, arrival, probe.cycle);
                });
            }
            Ok(())
        }
    }
}
