/// The radar event loop.
///
/// A single task that owns the radar and alternates between a discovery
/// cycle and the configured pause, listening for commands throughout.
use tokio::sync::mpsc;

use crate::radar::Radar;
use crate::transport::BroadcastTransport;

use super::RadarCommand;

/// Main loop: cycles run strictly one after another.
pub(super) async fn radar_loop<T: BroadcastTransport>(
    mut radar: Radar<T>,
    mut cmd_rx: mpsc::Receiver<RadarCommand>,
) {
    let interval = radar.config().cycle_interval;
    tracing::info!(
        max_neigh = radar.config().max_neigh,
        bouquet_size = radar.config().bouquet_size,
        multipath = radar.config().multipath,
        "radar: started"
    );

    'cycles: loop {
        // ── 1. One cycle; a shutdown waits for it to finish ─────────
        let mut stop = false;
        {
            let cycle = radar.run_cycle();
            tokio::pin!(cycle);
            loop {
                tokio::select! {
                    _ = &mut cycle => break,
                    cmd = cmd_rx.recv(), if !stop => match cmd {
                        Some(RadarCommand::ProbeNow) => {
                            tracing::debug!("radar: probe requested during a cycle, ignored");
                        }
                        Some(RadarCommand::Shutdown) | None => stop = true,
                    },
                }
            }
        }
        if stop {
            break;
        }

        // ── 2. Pause until the next cycle ───────────────────────────
        let pause = tokio::time::sleep(interval);
        tokio::pin!(pause);
        tokio::select! {
            _ = &mut pause => {}
            cmd = cmd_rx.recv() => match cmd {
                Some(RadarCommand::ProbeNow) => {}
                Some(RadarCommand::Shutdown) | None => break 'cycles,
            },
        }
    }

    tracing::info!(cycles = radar.cycle(), "radar: stopped");
}
