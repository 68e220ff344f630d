use radar_transport::{RadarSocket, RadarSocketConfig};

use crate::events::{emit, EventStarted};

/// Answer other nodes' probes until Ctrl+C.
pub async fn run(port: u16) -> anyhow::Result<()> {
    let (socket, _replies) = RadarSocket::bind(RadarSocketConfig::new().port(port)).await?;
    emit(&EventStarted::new("respond", socket.port(), socket.devices()));
    if let Some(addr) = socket.responder_addr() {
        eprintln!("Answering probes on {addr}");
    }

    tokio::signal::ctrl_c().await?;
    eprintln!("\nCtrl+C received, shutting down...");
    socket.shutdown();
    Ok(())
}
