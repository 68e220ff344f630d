/// Loopback tests: two radar sockets on 127.0.0.1, one probing,
/// one responding.
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use radar_transport::{Device, ProbeFrame, RadarSocket, RadarSocketConfig};
use tokio::net::UdpSocket;

fn loopback() -> Device {
    Device::new("lo", Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
}

async fn responder() -> RadarSocket {
    let (socket, _replies) = RadarSocket::bind(RadarSocketConfig::new().port(0))
        .await
        .expect("bind responder");
    socket
}

#[tokio::test]
async fn probe_is_answered_and_attributed() {
    let responder = responder().await;
    let (prober, mut replies) = RadarSocket::bind(
        RadarSocketConfig::new()
            .port(responder.port())
            .device(loopback())
            .respond(false),
    )
    .await
    .expect("bind prober");

    prober.send_probe(1, 0).await.expect("send");

    let reply = tokio::time::timeout(Duration::from_secs(2), replies.recv())
        .await
        .expect("reply in time")
        .expect("channel open");
    assert_eq!(reply.ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
    assert_eq!(reply.device, "lo");
    assert_eq!(reply.cycle, 1);
}

#[tokio::test]
async fn own_probes_are_not_answered() {
    let (socket, mut replies) =
        RadarSocket::bind(RadarSocketConfig::new().port(0).device(loopback()))
            .await
            .expect("bind");

    socket.send_probe(1, 0).await.expect("send");

    let outcome = tokio::time::timeout(Duration::from_millis(300), replies.recv()).await;
    assert!(outcome.is_err(), "a node must not discover itself");
}

#[tokio::test]
async fn stale_and_foreign_replies_are_dropped() {
    let responder = responder().await;
    let (prober, mut replies) = RadarSocket::bind(
        RadarSocketConfig::new()
            .port(responder.port())
            .device(loopback())
            .respond(false),
    )
    .await
    .expect("bind prober");

    // Advance to cycle 2 without letting the responder's answers matter.
    prober.send_probe(2, 0).await.expect("send");
    let first = tokio::time::timeout(Duration::from_secs(2), replies.recv())
        .await
        .expect("reply in time")
        .expect("channel open");
    assert_eq!(first.cycle, 2);

    let (_, device_addr) = prober.device_addrs().pop().expect("device socket");
    let raw = UdpSocket::bind("127.0.0.1:0").await.expect("bind raw");

    let frames = [
        // Reply to an older cycle.
        ProbeFrame::Reply {
            origin: prober.origin(),
            cycle: 1,
            seq: 0,
        },
        // Reply to somebody else's probe.
        ProbeFrame::Reply {
            origin: prober.origin().wrapping_add(1),
            cycle: 2,
            seq: 0,
        },
        // A probe is never a reply.
        ProbeFrame::Probe {
            origin: prober.origin(),
            cycle: 2,
            seq: 0,
        },
    ];
    for frame in frames {
        let bytes = frame.to_bytes().expect("serialize");
        raw.send_to(&bytes, device_addr).await.expect("send raw");
    }
    raw.send_to(b"garbage", device_addr).await.expect("send raw");

    let valid = ProbeFrame::Reply {
        origin: prober.origin(),
        cycle: 2,
        seq: 9,
    };
    raw.send_to(&valid.to_bytes().expect("serialize"), device_addr)
        .await
        .expect("send raw");

    let next = tokio::time::timeout(Duration::from_secs(2), replies.recv())
        .await
        .expect("reply in time")
        .expect("channel open");
    assert_eq!(next.cycle, 2);
    assert_eq!(next.ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
}

#[tokio::test]
async fn bind_requires_a_device_or_responder() {
    let result = RadarSocket::bind(RadarSocketConfig::new().respond(false)).await;
    assert!(matches!(
        result,
        Err(radar_transport::TransportError::NoDevices)
    ));
}
