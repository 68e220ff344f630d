use radar_protocol::{RadarConfig, RadarRuntime};
use radar_transport::{Device, RadarSocketConfig};

use crate::events::{emit, EventNeighbor, EventNeighbors, EventStarted, EventStopped};

/// Run discovery until Ctrl+C, printing every change as JSONL.
pub async fn run(
    devices: Vec<Device>,
    port: u16,
    respond: bool,
    config: RadarConfig,
) -> anyhow::Result<()> {
    let socket_config = RadarSocketConfig::new()
        .port(port)
        .devices(devices.clone())
        .respond(respond);
    let (handle, task) = RadarRuntime::bind(socket_config, config).await?;
    emit(&EventStarted::new("run", port, &devices));
    for device in &devices {
        eprintln!("Probing on {device}");
    }

    let mut events = handle.subscribe_all();
    let mut neighbors = handle.neighbors();
    let mut last = Vec::new();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                eprintln!("\nCtrl+C received, finishing the current cycle...");
                break;
            }
            Some(event) = events.recv() => {
                emit(&EventNeighbor::new(&event));
            }
            Ok(()) = neighbors.changed() => {
                let list = neighbors.borrow_and_update().to_vec();
                if list != last {
                    emit(&EventNeighbors::new(&list));
                    last = list;
                }
            }
        }
    }

    handle.shutdown().await;
    task.await?;
    // Events published by the final cycle.
    while let Some(event) = events.try_recv() {
        emit(&EventNeighbor::new(&event));
    }
    emit(&EventStopped::new(handle.stats()));
    Ok(())
}
