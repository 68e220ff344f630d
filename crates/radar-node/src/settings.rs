use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use radar_protocol::RadarConfig;

/// Radar options given on the command line; each one overrides the
/// config file.
#[derive(Debug, Default, Clone, clap::Args)]
pub struct Overrides {
    /// Aggregate latency over every device instead of pinning the best.
    #[arg(long)]
    pub multipath: bool,
    /// Probes per cycle.
    #[arg(long)]
    pub bouquet_size: Option<u32>,
    /// Neighbor table capacity.
    #[arg(long)]
    pub max_neigh: Option<usize>,
    /// Reply collection window per cycle, in ms.
    #[arg(long)]
    pub max_wait_ms: Option<u64>,
    /// Relative RTT change that triggers an rtt_changed event.
    #[arg(long)]
    pub threshold: Option<f64>,
    /// Pause between cycles, in ms.
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

impl Overrides {
    pub fn apply(&self, mut config: RadarConfig) -> RadarConfig {
        if self.multipath {
            config.multipath = true;
        }
        if let Some(n) = self.bouquet_size {
            config.bouquet_size = n;
        }
        if let Some(n) = self.max_neigh {
            config.max_neigh = n;
        }
        if let Some(ms) = self.max_wait_ms {
            config.max_wait_time = Duration::from_millis(ms);
        }
        if let Some(t) = self.threshold {
            config.rtt_variation_threshold = t;
        }
        if let Some(ms) = self.interval_ms {
            config.cycle_interval = Duration::from_millis(ms);
        }
        config
    }
}

/// Read a JSON config file; fields it omits keep their defaults.
pub fn load(path: Option<&Path>) -> anyhow::Result<RadarConfig> {
    let Some(path) = path else {
        return Ok(RadarConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

/// Config file, then flags, then validation.
pub fn resolve(path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<RadarConfig> {
    let config = overrides.apply(load(path)?);
    config.validate()?;
    Ok(config)
}
